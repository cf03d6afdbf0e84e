//! Game events
//!
//! The event set is closed: every event name has one fixed argument list, so a listener
//! registered for `hit` is statically guaranteed to receive a damage and a target.

use crate::damage::Damage;
use core::fmt;
use hearth_core::EntityId;
use serde::{Deserialize, Serialize};

/// Discriminant of an [`Event`], used as the listener key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    UpdateTick,
    Hit,
    Damaged,
    Killed,
    Deathblow,
    CombatStart,
    CombatEnd,
    RegenStart,
    RegenEnd,
}

impl EventKind {
    /// Wire name of the event
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UpdateTick => "updateTick",
            Self::Hit => "hit",
            Self::Damaged => "damaged",
            Self::Killed => "killed",
            Self::Deathblow => "deathblow",
            Self::CombatStart => "combatStart",
            Self::CombatEnd => "combatEnd",
            Self::RegenStart => "regenStart",
            Self::RegenEnd => "regenEnd",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event delivered to one entity's behaviors
#[derive(Debug, Clone)]
pub enum Event {
    /// Periodic update from the world or player tick
    UpdateTick,
    /// The receiver dealt `damage` to `target`
    Hit { damage: Damage, target: EntityId },
    /// The receiver took `damage`
    Damaged { damage: Damage },
    /// The receiver died; `killer` is absent for environmental deaths
    Killed { killer: Option<EntityId> },
    /// The receiver dealt the killing blow to `target`
    Deathblow { target: EntityId },
    /// The receiver went from idle to fighting
    CombatStart,
    /// The receiver has no opponents left
    CombatEnd,
    /// The receiver began regenerating
    RegenStart,
    /// The receiver finished or stopped regenerating
    RegenEnd,
}

impl Event {
    /// Kind of this event
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::UpdateTick => EventKind::UpdateTick,
            Self::Hit { .. } => EventKind::Hit,
            Self::Damaged { .. } => EventKind::Damaged,
            Self::Killed { .. } => EventKind::Killed,
            Self::Deathblow { .. } => EventKind::Deathblow,
            Self::CombatStart => EventKind::CombatStart,
            Self::CombatEnd => EventKind::CombatEnd,
            Self::RegenStart => EventKind::RegenStart,
            Self::RegenEnd => EventKind::RegenEnd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(Event::UpdateTick.kind().to_string(), "updateTick");
        assert_eq!(
            Event::Deathblow { target: EntityId::from_raw(1) }.kind(),
            EventKind::Deathblow
        );
        assert_eq!(
            serde_json::to_string(&EventKind::CombatStart).unwrap(),
            "\"combatStart\""
        );
    }
}
