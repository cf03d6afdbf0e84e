//! Attribute store
//!
//! An attribute keeps its `base`, a non-positive `delta` (damage taken) and a list of active
//! modifiers. `max = base + Σ modifiers` and `current = max + delta`.
//!
//! After every mutation `current` lies in `[0, max]`, unless an active modifier permits
//! negative values. A negative current is the death signal; the combat engine settles it back
//! to zero in the same round.

use crate::error::{AttributeError, AttributeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the attribute combat damages by default
pub const HEALTH: &str = "health";

/// Name of the attribute holding critical hit chance (percent)
pub const CRITICAL: &str = "critical";

/// A modifier applied to an attribute's maximum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeModifier {
    /// Who applied the modifier (effect name, item id, ...). Used for removal.
    pub source: String,
    /// Amount added to the maximum (may be negative)
    pub amount: i32,
    /// Allow `current` to drop below zero while this modifier is active
    #[serde(default)]
    pub permits_negative: bool,
}

impl AttributeModifier {
    /// Create a new modifier
    pub fn new(source: impl Into<String>, amount: i32) -> Self {
        Self {
            source: source.into(),
            amount,
            permits_negative: false,
        }
    }

    /// Let the attribute go negative while this modifier is active
    pub fn permitting_negative(mut self) -> Self {
        self.permits_negative = true;
        self
    }
}

/// A single named stat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    base: i32,
    #[serde(default)]
    delta: i32,
    #[serde(default)]
    modifiers: Vec<AttributeModifier>,
}

impl Attribute {
    /// Create a new attribute at full value
    pub fn new(name: impl Into<String>, base: i32) -> AttributeResult<Self> {
        let name = name.into();
        if base < 0 {
            return Err(AttributeError::NegativeBase { name, base });
        }
        Ok(Self {
            name,
            base,
            delta: 0,
            modifiers: Vec::new(),
        })
    }

    /// Attribute name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base value (without modifiers)
    pub fn base(&self) -> i32 {
        self.base
    }

    /// Maximum value: base plus modifiers, never below zero
    pub fn max(&self) -> i32 {
        let modified: i32 = self.modifiers.iter().map(|m| m.amount).sum();
        self.base.saturating_add(modified).max(0)
    }

    /// Current value
    pub fn current(&self) -> i32 {
        self.max().saturating_add(self.delta)
    }

    /// Whether any active modifier allows negative values
    pub fn permits_negative(&self) -> bool {
        self.modifiers.iter().any(|m| m.permits_negative)
    }

    /// Current value is at or below zero
    pub fn is_depleted(&self) -> bool {
        self.current() <= 0
    }

    /// Current value equals the maximum
    pub fn is_full(&self) -> bool {
        self.delta >= 0
    }

    /// Active modifiers
    pub fn modifiers(&self) -> &[AttributeModifier] {
        &self.modifiers
    }

    /// Lower the current value. Returns the new current value.
    pub fn lower(&mut self, amount: u32) -> i32 {
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        self.delta = self.delta.saturating_sub(amount);
        self.normalize();
        self.current()
    }

    /// Raise the current value, never past the maximum. Returns the amount actually restored.
    pub fn raise(&mut self, amount: u32) -> u32 {
        let before = self.current();
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        self.delta = self.delta.saturating_add(amount).min(0);
        self.normalize();
        u32::try_from(self.current() - before).unwrap_or(0)
    }

    /// Restore to maximum
    pub fn set_to_max(&mut self) {
        self.delta = 0;
    }

    /// Change the base value, keeping damage taken
    pub fn set_base(&mut self, base: i32) -> AttributeResult<()> {
        if base < 0 {
            return Err(AttributeError::NegativeBase {
                name: self.name.clone(),
                base,
            });
        }
        self.base = base;
        self.normalize();
        Ok(())
    }

    /// Add a modifier
    pub fn add_modifier(&mut self, modifier: AttributeModifier) {
        self.modifiers.push(modifier);
        self.normalize();
    }

    /// Remove all modifiers from `source`. Returns how many were removed.
    pub fn remove_modifier(&mut self, source: &str) -> usize {
        let before = self.modifiers.len();
        self.modifiers.retain(|m| m.source != source);
        self.normalize();
        before - self.modifiers.len()
    }

    /// Pull a negative current value back to zero, whatever the modifiers say
    pub fn settle(&mut self) {
        self.delta = self.delta.max(-self.max());
    }

    fn normalize(&mut self) {
        if self.permits_negative() {
            self.delta = self.delta.min(0);
        } else {
            self.delta = self.delta.clamp(-self.max(), 0);
        }
    }
}

/// Per-entity collection of attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    attributes: BTreeMap<String, Attribute>,
}

impl Attributes {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a full attribute
    pub fn with(mut self, name: &str, base: i32) -> AttributeResult<Self> {
        self.add(name, base)?;
        Ok(self)
    }

    /// Add an attribute at full value
    pub fn add(&mut self, name: &str, base: i32) -> AttributeResult<()> {
        if self.attributes.contains_key(name) {
            return Err(AttributeError::AlreadyExists(name.to_string()));
        }
        self.attributes
            .insert(name.to_string(), Attribute::new(name, base)?);
        Ok(())
    }

    /// Whether the attribute exists
    pub fn has(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Get an attribute
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Get an attribute mutably
    pub fn get_mut(&mut self, name: &str) -> AttributeResult<&mut Attribute> {
        self.attributes
            .get_mut(name)
            .ok_or_else(|| AttributeError::Unknown(name.to_string()))
    }

    /// Current value of an attribute
    pub fn current(&self, name: &str) -> Option<i32> {
        self.get(name).map(Attribute::current)
    }

    /// Maximum value of an attribute
    pub fn max(&self, name: &str) -> Option<i32> {
        self.get(name).map(Attribute::max)
    }

    /// Lower an attribute, returning the new current value
    pub fn lower(&mut self, name: &str, amount: u32) -> AttributeResult<i32> {
        Ok(self.get_mut(name)?.lower(amount))
    }

    /// Raise an attribute, returning the amount restored
    pub fn raise(&mut self, name: &str, amount: u32) -> AttributeResult<u32> {
        Ok(self.get_mut(name)?.raise(amount))
    }

    /// Every attribute is at its maximum
    pub fn all_full(&self) -> bool {
        self.attributes.values().all(Attribute::is_full)
    }

    /// Restore every attribute to its maximum
    pub fn restore_all(&mut self) {
        for attribute in self.attributes.values_mut() {
            attribute.set_to_max();
        }
    }

    /// Iterate attributes in name order
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Iterate attributes mutably in name order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attribute> {
        self.attributes.values_mut()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
