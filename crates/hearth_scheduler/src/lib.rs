//! # hearth_scheduler - Tick Scheduler
//!
//! Drives the simulation from the outside:
//! - **Timers**: one named thread per cycle, stopped and joined before any restart
//! - **Ticks**: world, player and save cycles posted to a bounded channel
//!
//! The game loop owns the world and consumes [`TickKind`] messages; nothing here touches
//! simulation state.

pub mod error;
pub mod scheduler;
pub mod timer;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{
    TickConfig, TickKind, TickScheduler, DEFAULT_CAPACITY, DEFAULT_SAVE_INTERVAL, DEFAULT_TICK,
};
pub use timer::{CycleStats, PeriodicTask};
