//! # hearth_sim - Simulation Core
//!
//! Everything that runs on the game thread:
//!
//! - **Behaviors**: named bundles of event handlers, created per entity from a frozen config
//! - **Dispatch**: ordered, panic-isolated event delivery with re-entrancy protection
//! - **Damage**: per-hit evaluation with critical rolls and per-entity hooks
//! - **Combat**: rounds, death resolution and regeneration
//! - **Ticks**: the world pass (areas) and the player pass
//!
//! ## Example
//!
//! ```ignore
//! use hearth_sim::prelude::*;
//!
//! let mut registry = BehaviorRegistry::new();
//! hearth_sim::behaviors::register_builtin(&mut registry)?;
//!
//! let mut world = World::new(Arc::new(registry), WorldSettings::default());
//! let wolf = world.spawn("wolf", EntityKind::Npc, Attributes::new().with(HEALTH, 20)?);
//! world.attach_behavior(wolf, "combat", BehaviorConfig::empty())?;
//!
//! tick::world_tick(&mut world);
//! ```

pub mod behavior;
pub mod behaviors;
pub mod combat;
pub mod damage;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod event;
pub mod snapshot;
pub mod tick;
pub mod world;

pub use behavior::{
    BehaviorAttachment, BehaviorConfig, BehaviorFactory, BehaviorKind, BehaviorRegistry, Handler,
    Listeners,
};
pub use damage::{Damage, DamageEvaluator, DamageHooks, PassthroughHooks, StandardEvaluator};
pub use dispatch::BehaviorContext;
pub use entity::{AttackProfile, CombatData, CombatState, Entity, EntityKind};
pub use error::*;
pub use event::{Event, EventKind};
pub use snapshot::{snapshot_players, BehaviorRecord, PlayerRecord};
pub use tick::TickReport;
pub use world::{Area, EntityRegistry, World, WorldSettings};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::behavior::{BehaviorConfig, BehaviorRegistry, Listeners};
    pub use crate::combat;
    pub use crate::damage::{Damage, DamageHooks};
    pub use crate::dispatch::BehaviorContext;
    pub use crate::entity::{AttackProfile, CombatState, Entity, EntityKind};
    pub use crate::error::{
        CombatResolutionError, ConfigResult, ConfigurationError, HandlerError, HandlerResult,
    };
    pub use crate::event::{Event, EventKind};
    pub use crate::tick;
    pub use crate::world::{World, WorldSettings};
    pub use hearth_core::prelude::*;
    pub use hearth_core::{CRITICAL, HEALTH};
}
