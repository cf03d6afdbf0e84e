//! # hearth_core - Hearth Core
//!
//! Leaf primitives shared by every other Hearth crate:
//! - **Identifiers**: typed ids for entities and areas, handed out by a thread-safe generator
//! - **Attributes**: the per-entity stat store (base, delta, modifiers) with clamping rules
//!
//! Nothing in here knows about behaviors, combat or ticks.

pub mod attribute;
pub mod error;
pub mod id;

pub use attribute::*;
pub use error::*;
pub use id::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::attribute::{Attribute, AttributeModifier, Attributes};
    pub use crate::error::{AttributeError, AttributeResult};
    pub use crate::id::{AreaId, EntityId, IdGenerator};
}
