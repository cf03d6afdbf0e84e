//! Damage model and evaluation pipeline
//!
//! A [`Damage`] is created per hit and discarded after it is applied. The amount that reaches
//! the target's attribute is decided by a [`DamageEvaluator`]: attacker side first (critical
//! roll, outgoing hook), then target side (incoming hook).

use crate::entity::Entity;
use hearth_core::{EntityId, CRITICAL, HEALTH};
use rand::{Rng, RngCore};

/// Multiplier applied to critical hits unless the attack says otherwise
pub const DEFAULT_CRITICAL_MULTIPLIER: f64 = 1.5;

/// A single damage instance
#[derive(Debug, Clone, PartialEq)]
pub struct Damage {
    /// Entity that caused the damage. `None` for environmental damage.
    pub attacker: Option<EntityId>,
    /// Entity receiving the damage
    pub target: EntityId,
    /// Attribute lowered by this damage
    pub attribute: String,
    /// Base damage amount
    pub amount: u32,
    /// Set by evaluation when the critical roll succeeds
    pub critical: bool,
    /// Critical damage multiplier
    pub critical_multiplier: f64,
    /// What dealt the damage (weapon, trap, spell name)
    pub source: Option<String>,
    /// Amount actually applied, filled in once evaluated
    pub applied: Option<u32>,
}

impl Damage {
    /// Create new damage against `target`'s health
    pub fn new(target: EntityId, amount: u32) -> Self {
        Self {
            attacker: None,
            target,
            attribute: HEALTH.to_string(),
            amount,
            critical: false,
            critical_multiplier: DEFAULT_CRITICAL_MULTIPLIER,
            source: None,
            applied: None,
        }
    }

    /// Set the attacker
    pub fn with_attacker(mut self, attacker: EntityId) -> Self {
        self.attacker = Some(attacker);
        self
    }

    /// Target a different attribute
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    /// Set the critical multiplier
    pub fn with_critical_multiplier(mut self, multiplier: f64) -> Self {
        self.critical_multiplier = multiplier;
        self
    }

    /// Set the damage source label
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Scale `amount` for a critical hit. Rounds up so a critical never deals less than
/// `amount × multiplier`.
pub fn critical_amount(amount: u32, multiplier: f64) -> u32 {
    let scaled = (f64::from(amount) * multiplier).ceil();
    if scaled <= 0.0 {
        0
    } else if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Probability in `[0, 1]` that `attacker` lands a critical hit.
///
/// Read from the maximum of the `critical` attribute, a percentage floored at zero.
pub fn critical_chance(attacker: &Entity) -> f64 {
    let percent = attacker.attributes().max(CRITICAL).unwrap_or(0).max(0);
    (f64::from(percent) / 100.0).min(1.0)
}

/// Per-entity damage modification points (armor, resistances, reflection, ...)
pub trait DamageHooks: Send + Sync {
    /// Adjust damage `this` is about to deal
    fn outgoing(&self, this: &Entity, damage: &Damage, amount: u32) -> u32 {
        let _ = (this, damage);
        amount
    }

    /// Adjust damage `this` is about to take
    fn incoming(&self, this: &Entity, damage: &Damage, amount: u32) -> u32 {
        let _ = (this, damage);
        amount
    }
}

/// Hooks that leave the amount untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughHooks;

impl DamageHooks for PassthroughHooks {}

/// Replaceable evaluation step. Returns the integer amount to apply.
pub trait DamageEvaluator: Send + Sync {
    fn evaluate(
        &self,
        damage: &mut Damage,
        attacker: Option<&Entity>,
        target: &Entity,
        rng: &mut dyn RngCore,
    ) -> u32;
}

/// The stock pipeline: critical roll, attacker's outgoing hook, target's incoming hook
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEvaluator;

impl DamageEvaluator for StandardEvaluator {
    fn evaluate(
        &self,
        damage: &mut Damage,
        attacker: Option<&Entity>,
        target: &Entity,
        rng: &mut dyn RngCore,
    ) -> u32 {
        let mut amount = damage.amount;

        if let Some(attacker) = attacker {
            damage.critical = rng.gen_bool(critical_chance(attacker));
            if damage.critical {
                amount = critical_amount(amount, damage.critical_multiplier);
            }
            amount = attacker.hooks().outgoing(attacker, damage, amount);
        }

        target.hooks().incoming(target, damage, amount)
    }
}
