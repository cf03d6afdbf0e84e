//! Typed identifiers for world objects

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create an id from its raw value
            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Get the raw value
            #[inline]
            pub const fn raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a player or NPC. Holding one never keeps the entity alive.
    EntityId,
    "entity"
);

define_id!(
    /// Identifier of an area (a location-holding aggregate of entities)
    AreaId,
    "area"
);

/// Thread-safe id generator.
///
/// Ids are never reused, so a stale id simply fails to resolve.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator starting at 1
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    fn next_raw(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Allocate the next entity id
    pub fn next_entity(&self) -> EntityId {
        EntityId(self.next_raw())
    }

    /// Allocate the next area id
    pub fn next_area(&self) -> AreaId {
        AreaId(self.next_raw())
    }

    /// Make sure future ids are greater than `raw` (used when restoring saved ids)
    pub fn reserve_through(&self, raw: u64) {
        self.next.fetch_max(raw.saturating_add(1), Ordering::Relaxed);
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generator() {
        let gen = IdGenerator::new();
        let a = gen.next_entity();
        let b = gen.next_entity();
        let area = gen.next_area();
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(area.raw(), 3);
    }

    #[test]
    fn test_reserve_through() {
        let gen = IdGenerator::new();
        gen.reserve_through(41);
        assert_eq!(gen.next_entity().raw(), 42);

        // Never moves backwards
        gen.reserve_through(5);
        assert_eq!(gen.next_entity().raw(), 43);
    }

    #[test]
    fn test_display() {
        assert_eq!(EntityId::from_raw(7).to_string(), "entity#7");
        assert_eq!(format!("{:?}", AreaId::from_raw(2)), "AreaId(2)");
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&EntityId::from_raw(9)).unwrap();
        assert_eq!(json, "9");
    }
}
