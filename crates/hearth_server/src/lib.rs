//! # hearth_server - Hearth Server
//!
//! The process around the simulation:
//! - **Config**: TOML file, `HEARTH_*` environment overrides, reload on change
//! - **Roster**: the areas and NPCs a world starts with
//! - **Persistence**: per-player save files written off the game thread
//! - **Game loop**: one thread owning the world, fed by the tick scheduler
//!
//! ## Example
//!
//! ```ignore
//! let config = hearth_server::config::resolve(None, &ConfigOverrides::default())?;
//! let mut behaviors = BehaviorRegistry::new();
//! hearth_sim::behaviors::register_builtin(&mut behaviors)?;
//!
//! let store = Arc::new(FileStore::new(config.player_dir(), config.save_format));
//! let mut server = GameServer::new(config, behaviors, store)?;
//! server.restore_players()?;
//! server.run()?;
//! ```

pub mod config;
pub mod error;
pub mod persistence;
pub mod roster;
pub mod server;

pub use config::{ConfigOverrides, ServerConfig};
pub use error::*;
pub use persistence::{FileStore, PlayerStore, SaveFormat, SaveStats, SaveWorker};
pub use roster::{Roster, RosterSummary};
pub use server::{GameServer, LoopStats};
