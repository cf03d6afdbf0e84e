//! World context
//!
//! The [`World`] is the single owner of all mutable simulation state. It lives on the game
//! thread; behaviors and the combat engine reach entities through it by id.

use crate::behavior::{BehaviorConfig, BehaviorRegistry};
use crate::combat;
use crate::damage::{Damage, DamageEvaluator, StandardEvaluator};
use crate::entity::{Entity, EntityKind};
use crate::error::{CombatResolutionError, CombatResult, ConfigResult, ConfigurationError};
use crate::event::{Event, EventKind};
use hearth_core::{AreaId, Attributes, EntityId, IdGenerator};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Simulation tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Points restored to each attribute per regeneration tick when the entity has no
    /// `regen` attribute of its own
    pub regen_per_tick: u32,
    /// Seed for critical rolls. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            regen_per_tick: 1,
            rng_seed: None,
        }
    }
}

/// A location-holding aggregate of entities
#[derive(Debug, Clone)]
pub struct Area {
    id: AreaId,
    name: String,
    members: Vec<EntityId>,
    live: bool,
}

impl Area {
    pub fn id(&self) -> AreaId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member entities in placement order
    pub fn members(&self) -> &[EntityId] {
        &self.members
    }

    /// Whether the area takes part in world ticks
    pub fn is_live(&self) -> bool {
        self.live
    }
}

/// Entity and area storage
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, Entity>,
    areas: BTreeMap<AreaId, Area>,
    ids: IdGenerator,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh entity id
    pub fn next_entity_id(&self) -> EntityId {
        self.ids.next_entity()
    }

    /// Insert a fully built entity
    pub fn insert(&mut self, entity: Entity) -> ConfigResult<EntityId> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(ConfigurationError::DuplicateEntity(id));
        }
        self.ids.reserve_through(id.raw());
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Remove an entity, unlinking it from its area
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        if let Some(area) = entity.area().and_then(|a| self.areas.get_mut(&a)) {
            area.members.retain(|m| *m != id);
        }
        Some(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Exists and is alive
    pub fn is_live(&self, id: EntityId) -> bool {
        self.get(id).map_or(false, Entity::is_live)
    }

    /// Snapshot of live entities of one kind, in id order
    pub fn list_live(&self, kind: EntityKind) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.kind() == kind && e.is_live())
            .map(Entity::id)
            .collect()
    }

    /// Entities whose opponent list mentions `id`
    pub fn engaged_with(&self, id: EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.combat().has_opponent(id))
            .map(Entity::id)
            .collect()
    }

    /// Iterate all entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Create a live area
    pub fn add_area(&mut self, name: impl Into<String>) -> AreaId {
        let id = self.ids.next_area();
        self.areas.insert(
            id,
            Area {
                id,
                name: name.into(),
                members: Vec::new(),
                live: true,
            },
        );
        id
    }

    pub fn area(&self, id: AreaId) -> Option<&Area> {
        self.areas.get(&id)
    }

    /// Find an area by name
    pub fn area_named(&self, name: &str) -> Option<AreaId> {
        self.areas.values().find(|a| a.name == name).map(Area::id)
    }

    /// Take an area in or out of world ticks
    pub fn set_area_live(&mut self, id: AreaId, live: bool) -> ConfigResult<()> {
        let area = self
            .areas
            .get_mut(&id)
            .ok_or(ConfigurationError::UnknownArea(id))?;
        area.live = live;
        Ok(())
    }

    /// Snapshot of live areas, in id order
    pub fn list_live_areas(&self) -> Vec<AreaId> {
        self.areas.values().filter(|a| a.live).map(Area::id).collect()
    }

    /// Snapshot of an area's members
    pub fn area_members(&self, id: AreaId) -> Vec<EntityId> {
        self.areas
            .get(&id)
            .map(|a| a.members.clone())
            .unwrap_or_default()
    }

    /// Move an entity into an area, leaving its previous one
    pub fn place(&mut self, entity: EntityId, area: AreaId) -> ConfigResult<()> {
        if !self.areas.contains_key(&area) {
            return Err(ConfigurationError::UnknownArea(area));
        }
        let previous = self
            .entities
            .get(&entity)
            .ok_or(ConfigurationError::UnknownEntity(entity))?
            .area();
        if previous == Some(area) {
            return Ok(());
        }
        if let Some(old) = previous.and_then(|a| self.areas.get_mut(&a)) {
            old.members.retain(|m| *m != entity);
        }
        if let Some(new) = self.areas.get_mut(&area) {
            new.members.push(entity);
        }
        if let Some(e) = self.entities.get_mut(&entity) {
            e.set_area(Some(area));
        }
        Ok(())
    }
}

/// The simulation context passed to every behavior handler
pub struct World {
    registry: EntityRegistry,
    behaviors: Arc<BehaviorRegistry>,
    evaluator: Arc<dyn DamageEvaluator>,
    settings: WorldSettings,
    rng: StdRng,
    tick: u64,
    pass: Option<EntityKind>,
    pub(crate) in_flight: HashSet<(EntityId, EventKind)>,
}

impl World {
    /// Create an empty world using the stock damage evaluator
    pub fn new(behaviors: Arc<BehaviorRegistry>, settings: WorldSettings) -> Self {
        let rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            registry: EntityRegistry::new(),
            behaviors,
            evaluator: Arc::new(StandardEvaluator),
            settings,
            rng,
            tick: 0,
            pass: None,
            in_flight: HashSet::new(),
        }
    }

    /// Replace the damage evaluator
    pub fn with_evaluator(mut self, evaluator: Arc<dyn DamageEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Update tunables. The rng is left alone.
    pub fn set_settings(&mut self, settings: WorldSettings) {
        self.settings = settings;
    }

    pub fn behaviors(&self) -> &Arc<BehaviorRegistry> {
        &self.behaviors
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.registry.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.registry.get_mut(id)
    }

    pub(crate) fn live_entity_mut(&mut self, id: EntityId) -> CombatResult<&mut Entity> {
        let entity = self
            .registry
            .get_mut(id)
            .ok_or(CombatResolutionError::UnknownEntity(id))?;
        if !entity.is_live() {
            return Err(CombatResolutionError::NotLive(id));
        }
        Ok(entity)
    }

    pub fn is_live(&self, id: EntityId) -> bool {
        self.registry.is_live(id)
    }

    /// Number of ticks processed so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Start a new tick that updates entities of `pass` (all kinds when `None`)
    pub(crate) fn begin_tick(&mut self, pass: Option<EntityKind>) -> u64 {
        self.tick += 1;
        self.pass = pass;
        self.tick
    }

    /// Whether `entity` still has its combat round coming in the current tick
    pub(crate) fn round_pending(&self, entity: &Entity) -> bool {
        entity.combat().last_round != Some(self.tick)
            && self.pass.map_or(true, |kind| kind == entity.kind())
    }

    /// Create a live entity and return its id
    pub fn spawn(&mut self, name: &str, kind: EntityKind, attributes: Attributes) -> EntityId {
        let id = self.registry.next_entity_id();
        self.registry.entities.insert(id, Entity::new(id, name, kind, attributes));
        log::debug!("Spawned {} '{}'", id, name);
        id
    }

    /// Add a prebuilt entity (restored from a save, loaded from a roster)
    pub fn insert(&mut self, entity: Entity) -> ConfigResult<EntityId> {
        self.registry.insert(entity)
    }

    /// Remove an entity. Anyone fighting it loses it as an opponent first.
    pub fn despawn(&mut self, id: EntityId) -> CombatResult<Option<Entity>> {
        if !self.registry.contains(id) {
            return Ok(None);
        }
        combat::remove_from_combat(self, id)?;
        log::debug!("Despawned {}", id);
        Ok(self.registry.remove(id))
    }

    /// Create a live area
    pub fn add_area(&mut self, name: &str) -> AreaId {
        self.registry.add_area(name)
    }

    /// Put an entity in an area
    pub fn place(&mut self, entity: EntityId, area: AreaId) -> ConfigResult<()> {
        self.registry.place(entity, area)
    }

    /// Instantiate a behavior from the registry and attach it.
    ///
    /// Fails for unknown kinds, rejected configs and kinds already on the entity.
    pub fn attach_behavior(
        &mut self,
        entity: EntityId,
        kind: &str,
        config: BehaviorConfig,
    ) -> ConfigResult<()> {
        if !self.registry.contains(entity) {
            return Err(ConfigurationError::UnknownEntity(entity));
        }
        let attachment = self.behaviors.instantiate(kind, config)?;
        let target = self
            .registry
            .get_mut(entity)
            .ok_or(ConfigurationError::UnknownEntity(entity))?;
        target.attach(attachment)?;
        log::trace!("Attached '{}' to {}", kind, entity);
        Ok(())
    }

    /// Deliver an event to one entity's behaviors
    pub fn dispatch(&mut self, entity: EntityId, event: Event) -> ConfigResult<()> {
        crate::dispatch::dispatch(self, entity, event)
    }

    /// Run the damage evaluator for `damage` and return the amount to apply
    pub(crate) fn evaluate_damage(&mut self, damage: &mut Damage) -> CombatResult<u32> {
        let Self {
            registry,
            evaluator,
            rng,
            ..
        } = self;
        let target = registry
            .get(damage.target)
            .ok_or(CombatResolutionError::UnknownEntity(damage.target))?;
        let attacker = damage.attacker.and_then(|a| registry.get(a));
        Ok(evaluator.evaluate(damage, attacker, target, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::HEALTH;

    fn world() -> World {
        World::new(Arc::new(BehaviorRegistry::new()), WorldSettings::default())
    }

    fn health(amount: i32) -> Attributes {
        Attributes::new().with(HEALTH, amount).unwrap()
    }

    #[test]
    fn test_spawn_and_list() {
        let mut world = world();
        let wolf = world.spawn("wolf", EntityKind::Npc, health(10));
        let hero = world.spawn("hero", EntityKind::Player, health(20));

        assert_eq!(world.registry().list_live(EntityKind::Npc), vec![wolf]);
        assert_eq!(world.registry().list_live(EntityKind::Player), vec![hero]);
        assert_eq!(world.entity(wolf).unwrap().name(), "wolf");
    }

    #[test]
    fn test_insert_rejects_duplicate_and_reserves_id() {
        let mut world = world();
        let id = EntityId::from_raw(40);
        world
            .insert(Entity::new(id, "saved", EntityKind::Player, health(5)))
            .unwrap();
        assert_eq!(
            world.insert(Entity::new(id, "again", EntityKind::Player, health(5))),
            Err(ConfigurationError::DuplicateEntity(id))
        );

        let next = world.spawn("fresh", EntityKind::Npc, health(5));
        assert!(next.raw() > 40);
    }

    #[test]
    fn test_area_membership() {
        let mut world = world();
        let cave = world.add_area("cave");
        let field = world.add_area("field");
        let rat = world.spawn("rat", EntityKind::Npc, health(3));

        world.place(rat, cave).unwrap();
        assert_eq!(world.registry().area_members(cave), vec![rat]);

        world.place(rat, field).unwrap();
        assert!(world.registry().area_members(cave).is_empty());
        assert_eq!(world.entity(rat).unwrap().area(), Some(field));

        world.despawn(rat).unwrap();
        assert!(world.registry().area_members(field).is_empty());
    }

    #[test]
    fn test_dead_areas_are_skipped() {
        let mut world = world();
        let cave = world.add_area("cave");
        let field = world.add_area("field");
        world.registry_mut().set_area_live(cave, false).unwrap();
        assert_eq!(world.registry().list_live_areas(), vec![field]);
        assert_eq!(world.registry().area_named("cave"), Some(cave));
    }

    #[test]
    fn test_attach_unknown_behavior() {
        let mut world = world();
        let rat = world.spawn("rat", EntityKind::Npc, health(3));
        assert_eq!(
            world.attach_behavior(rat, "ghost", BehaviorConfig::empty()),
            Err(ConfigurationError::UnknownBehavior("ghost".into()))
        );
        assert_eq!(
            world.attach_behavior(EntityId::from_raw(999), "ghost", BehaviorConfig::empty()),
            Err(ConfigurationError::UnknownEntity(EntityId::from_raw(999)))
        );
    }
}
