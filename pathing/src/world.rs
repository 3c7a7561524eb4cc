//! Minimal entity store owned by the route planner actor.
//!
//! Only the components the planner reads or writes exist here: position,
//! the navigation-agent capability, the player-unit exclusion marker, route
//! progress and the movable marker. Insertions and removals of the
//! navigation agent are journaled so the planner can detect edges once per
//! frame.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shared_types::{RouteProgress, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity_{}", self.0)
    }
}

/// Navigation capability. Acquiring it requests a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavAgent {
    /// Destination override; the planner's default goal is used when absent.
    pub goal: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub position: Option<Vec3>,
    pub nav_agent: Option<NavAgent>,
    pub player_unit: bool,
    pub route: Option<RouteProgress>,
    pub movable: bool,
    pub route_generation: u64,
}

/// One coalesced change to an entity's [`NavAgent`] within a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct NavAgentChange {
    pub entity: EntityId,
    pub old: Option<NavAgent>,
    pub new: Option<NavAgent>,
}

impl NavAgentChange {
    /// Absent before the frame, present after it.
    pub fn is_acquired(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }
}

#[derive(Debug, Clone, Default)]
struct EntityRecord {
    position: Option<Vec3>,
    nav_agent: Option<NavAgent>,
    player_unit: bool,
    route: Option<RouteProgress>,
    movable: bool,
    route_generation: u64,
}

#[derive(Debug, Default)]
pub struct World {
    next_id: u64,
    entities: HashMap<EntityId, EntityRecord>,
    nav_agent_changes: Vec<NavAgentChange>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, position: Option<Vec3>) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        self.entities.insert(
            id,
            EntityRecord {
                position,
                ..EntityRecord::default()
            },
        );
        id
    }

    pub fn despawn(&mut self, entity: EntityId) -> bool {
        self.entities.remove(&entity).is_some()
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    pub fn position(&self, entity: EntityId) -> Option<Vec3> {
        self.entities.get(&entity).and_then(|record| record.position)
    }

    pub fn set_position(&mut self, entity: EntityId, position: Vec3) -> bool {
        match self.entities.get_mut(&entity) {
            Some(record) => {
                record.position = Some(position);
                true
            }
            None => false,
        }
    }

    pub fn nav_agent(&self, entity: EntityId) -> Option<&NavAgent> {
        self.entities
            .get(&entity)
            .and_then(|record| record.nav_agent.as_ref())
    }

    /// Insert or replace the entity's navigation agent, journaling the change.
    pub fn insert_nav_agent(&mut self, entity: EntityId, agent: NavAgent) -> bool {
        let Some(record) = self.entities.get_mut(&entity) else {
            return false;
        };
        let old = record.nav_agent.replace(agent.clone());
        self.nav_agent_changes.push(NavAgentChange {
            entity,
            old,
            new: Some(agent),
        });
        true
    }

    /// Remove the navigation agent. Returns false when there was none.
    pub fn remove_nav_agent(&mut self, entity: EntityId) -> bool {
        let Some(record) = self.entities.get_mut(&entity) else {
            return false;
        };
        let Some(old) = record.nav_agent.take() else {
            return false;
        };
        self.nav_agent_changes.push(NavAgentChange {
            entity,
            old: Some(old),
            new: None,
        });
        true
    }

    /// Changes since the last drain, one per entity: the value before the
    /// first change against the value after the last. Ordered by first change.
    pub fn drain_nav_agent_changes(&mut self) -> Vec<NavAgentChange> {
        let mut coalesced: Vec<NavAgentChange> = Vec::new();
        let mut index_of: HashMap<EntityId, usize> = HashMap::new();

        for change in self.nav_agent_changes.drain(..) {
            match index_of.get(&change.entity) {
                Some(&i) => coalesced[i].new = change.new,
                None => {
                    index_of.insert(change.entity, coalesced.len());
                    coalesced.push(change);
                }
            }
        }

        coalesced
    }

    pub fn is_player_unit(&self, entity: EntityId) -> bool {
        self.entities
            .get(&entity)
            .map(|record| record.player_unit)
            .unwrap_or(false)
    }

    pub fn mark_player_unit(&mut self, entity: EntityId) -> bool {
        match self.entities.get_mut(&entity) {
            Some(record) => {
                record.player_unit = true;
                true
            }
            None => false,
        }
    }

    pub fn route_generation(&self, entity: EntityId) -> Option<u64> {
        self.entities
            .get(&entity)
            .map(|record| record.route_generation)
    }

    /// Advance the entity's request generation, invalidating pending results.
    pub fn bump_route_generation(&mut self, entity: EntityId) -> Option<u64> {
        let record = self.entities.get_mut(&entity)?;
        record.route_generation += 1;
        Some(record.route_generation)
    }

    /// Attach route progress and the movable marker.
    pub fn attach_route(&mut self, entity: EntityId, route: RouteProgress) -> bool {
        match self.entities.get_mut(&entity) {
            Some(record) => {
                record.route = Some(route);
                record.movable = true;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, entity: EntityId) -> Option<EntitySnapshot> {
        self.entities.get(&entity).map(|record| EntitySnapshot {
            id: entity,
            position: record.position,
            nav_agent: record.nav_agent.clone(),
            player_unit: record.player_unit,
            route: record.route.clone(),
            movable: record.movable,
            route_generation: record.route_generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_on_absent_agent_is_acquisition() {
        let mut world = World::new();
        let entity = world.spawn(Some(Vec3::ZERO));

        assert!(world.insert_nav_agent(entity, NavAgent::default()));
        let changes = world.drain_nav_agent_changes();

        assert_eq!(changes.len(), 1);
        assert!(changes[0].is_acquired());
        assert!(world.drain_nav_agent_changes().is_empty());
    }

    #[test]
    fn test_reinsert_of_present_agent_is_not_acquisition() {
        let mut world = World::new();
        let entity = world.spawn(Some(Vec3::ZERO));
        world.insert_nav_agent(entity, NavAgent::default());
        world.drain_nav_agent_changes();

        world.insert_nav_agent(entity, NavAgent::default());
        let changes = world.drain_nav_agent_changes();

        assert_eq!(changes.len(), 1);
        assert!(!changes[0].is_acquired());
    }

    #[test]
    fn test_changes_coalesce_within_a_frame() {
        let mut world = World::new();
        let a = world.spawn(None);
        let b = world.spawn(None);

        // Added then removed in the same frame: no edge.
        world.insert_nav_agent(a, NavAgent::default());
        world.remove_nav_agent(a);
        // Added, removed, added again: one edge.
        world.insert_nav_agent(b, NavAgent::default());
        world.remove_nav_agent(b);
        world.insert_nav_agent(b, NavAgent::default());

        let changes = world.drain_nav_agent_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].entity, a);
        assert!(!changes[0].is_acquired());
        assert_eq!(changes[1].entity, b);
        assert!(changes[1].is_acquired());
    }

    #[test]
    fn test_operations_on_despawned_entity_are_noops() {
        let mut world = World::new();
        let entity = world.spawn(Some(Vec3::ZERO));
        assert!(world.despawn(entity));

        assert!(!world.contains(entity));
        assert!(!world.insert_nav_agent(entity, NavAgent::default()));
        assert!(!world.remove_nav_agent(entity));
        assert!(!world.mark_player_unit(entity));
        assert_eq!(world.bump_route_generation(entity), None);
        assert!(world.snapshot(entity).is_none());
        assert!(world.drain_nav_agent_changes().is_empty());
    }

    #[test]
    fn test_attach_route_sets_movable() {
        let mut world = World::new();
        let entity = world.spawn(Some(Vec3::ZERO));
        let generation = world.bump_route_generation(entity).unwrap();

        let route = RouteProgress::start(Vec::new(), Vec3::ZERO, generation);
        assert!(world.attach_route(entity, route));

        let snapshot = world.snapshot(entity).unwrap();
        assert!(snapshot.movable);
        assert_eq!(snapshot.route.map(|r| r.generation), Some(1));
        assert_eq!(snapshot.route_generation, 1);
    }
}
