//! Entities and their combat bookkeeping

use crate::behavior::BehaviorAttachment;
use crate::damage::{DamageHooks, PassthroughHooks, DEFAULT_CRITICAL_MULTIPLIER};
use crate::error::{ConfigResult, ConfigurationError};
use core::fmt;
use hearth_core::{AreaId, Attributes, EntityId, HEALTH};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Player or autonomous NPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Player,
    Npc,
}

/// Combat state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombatState {
    #[default]
    Idle,
    Engaged,
    Regenerating,
}

/// How an entity attacks each combat round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// Base damage per hit
    pub amount: u32,
    /// Attribute the attack lowers
    #[serde(default = "default_attribute")]
    pub attribute: String,
    /// Critical damage multiplier
    #[serde(default = "default_multiplier")]
    pub critical_multiplier: f64,
    /// Rounds between attacks (1 = every round)
    #[serde(default = "default_interval")]
    pub interval_ticks: u32,
    /// Weapon or attack name, reported as the damage source
    #[serde(default)]
    pub name: Option<String>,
}

fn default_attribute() -> String {
    HEALTH.to_string()
}

fn default_multiplier() -> f64 {
    DEFAULT_CRITICAL_MULTIPLIER
}

fn default_interval() -> u32 {
    1
}

impl AttackProfile {
    /// Attack every round for `amount` health damage
    pub fn new(amount: u32) -> Self {
        Self {
            amount,
            attribute: default_attribute(),
            critical_multiplier: default_multiplier(),
            interval_ticks: default_interval(),
            name: None,
        }
    }

    /// Set rounds between attacks
    pub fn with_interval(mut self, ticks: u32) -> Self {
        self.interval_ticks = ticks.max(1);
        self
    }

    /// Set the critical multiplier
    pub fn with_critical_multiplier(mut self, multiplier: f64) -> Self {
        self.critical_multiplier = multiplier;
        self
    }

    /// Name the attack
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Active regeneration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegenState {
    /// Points restored to each attribute per tick
    pub per_tick: u32,
}

/// Per-entity combat record. Opponents and killers are ids, never owning references.
#[derive(Debug, Clone, Default)]
pub struct CombatData {
    opponents: Vec<EntityId>,
    state: CombatState,
    regen: Option<RegenState>,
    /// Last entity that damaged this one
    pub last_damaged_by: Option<EntityId>,
    /// Entity that dealt the killing blow
    pub killed_by: Option<EntityId>,
    pub(crate) lag: u32,
    pub(crate) last_round: Option<u64>,
}

impl CombatData {
    /// Current opponents, in engagement order
    pub fn opponents(&self) -> &[EntityId] {
        &self.opponents
    }

    /// Whether `id` is an opponent
    pub fn has_opponent(&self, id: EntityId) -> bool {
        self.opponents.contains(&id)
    }

    /// Combat state
    pub fn state(&self) -> CombatState {
        self.state
    }

    /// Regeneration parameters while regenerating
    pub fn regen(&self) -> Option<RegenState> {
        self.regen
    }

    /// Rounds left before the next attack
    pub fn lag(&self) -> u32 {
        self.lag
    }

    pub(crate) fn add_opponent(&mut self, id: EntityId) -> bool {
        if self.has_opponent(id) {
            return false;
        }
        self.opponents.push(id);
        true
    }

    pub(crate) fn remove_opponent(&mut self, id: EntityId) -> bool {
        let before = self.opponents.len();
        self.opponents.retain(|o| *o != id);
        before != self.opponents.len()
    }

    pub(crate) fn clear_opponents(&mut self) {
        self.opponents.clear();
    }

    pub(crate) fn set_state(&mut self, state: CombatState) {
        self.state = state;
        if state != CombatState::Regenerating {
            self.regen = None;
        }
    }

    pub(crate) fn start_regen(&mut self, regen: RegenState) {
        self.state = CombatState::Regenerating;
        self.regen = Some(regen);
    }
}

/// A player or NPC
pub struct Entity {
    id: EntityId,
    name: String,
    kind: EntityKind,
    attributes: Attributes,
    behaviors: Vec<BehaviorAttachment>,
    combat: CombatData,
    live: bool,
    area: Option<AreaId>,
    attack: Option<AttackProfile>,
    hooks: Arc<dyn DamageHooks>,
}

impl Entity {
    /// Create a live entity with no behaviors
    pub fn new(id: EntityId, name: impl Into<String>, kind: EntityKind, attributes: Attributes) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            attributes,
            behaviors: Vec::new(),
            combat: CombatData::default(),
            live: true,
            area: None,
            attack: None,
            hooks: Arc::new(PassthroughHooks),
        }
    }

    /// Set the attack profile
    pub fn with_attack(mut self, attack: AttackProfile) -> Self {
        self.attack = Some(attack);
        self
    }

    /// Set the damage hooks
    pub fn with_hooks(mut self, hooks: Arc<dyn DamageHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    /// Alive and taking part in the world
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Attached behaviors in attachment order
    pub fn behaviors(&self) -> &[BehaviorAttachment] {
        &self.behaviors
    }

    /// Whether a behavior kind is attached
    pub fn has_behavior(&self, kind: &str) -> bool {
        self.behaviors.iter().any(|b| b.kind.name() == kind)
    }

    pub fn combat(&self) -> &CombatData {
        &self.combat
    }

    pub(crate) fn combat_mut(&mut self) -> &mut CombatData {
        &mut self.combat
    }

    /// Has at least one opponent
    pub fn is_in_combat(&self) -> bool {
        self.combat.state == CombatState::Engaged
    }

    pub fn area(&self) -> Option<AreaId> {
        self.area
    }

    pub fn attack(&self) -> Option<&AttackProfile> {
        self.attack.as_ref()
    }

    /// Replace the attack profile
    pub fn set_attack(&mut self, attack: Option<AttackProfile>) {
        self.attack = attack;
    }

    pub fn hooks(&self) -> &Arc<dyn DamageHooks> {
        &self.hooks
    }

    /// Replace the damage hooks
    pub fn set_hooks(&mut self, hooks: Arc<dyn DamageHooks>) {
        self.hooks = hooks;
    }

    pub(crate) fn set_live(&mut self, live: bool) {
        self.live = live;
    }

    pub(crate) fn set_area(&mut self, area: Option<AreaId>) {
        self.area = area;
    }

    pub(crate) fn attach(&mut self, attachment: BehaviorAttachment) -> ConfigResult<()> {
        if self.has_behavior(attachment.kind.name()) {
            return Err(ConfigurationError::DuplicateAttachment {
                entity: self.id,
                behavior: attachment.kind.name().to_string(),
            });
        }
        self.behaviors.push(attachment);
        Ok(())
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("live", &self.live)
            .field("attributes", &self.attributes)
            .field("behaviors", &self.behaviors.iter().map(|b| b.kind.name()).collect::<Vec<_>>())
            .field("combat", &self.combat)
            .finish_non_exhaustive()
    }
}
