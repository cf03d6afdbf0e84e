//! Hearth world server
//!
//! Loads the config and roster, restores saved players, then ticks the world until Ctrl+C.
//! The config file is re-read when it changes, restarting only the timers whose period moved.
//!
//! Run with: cargo run -p hearth_server -- --config hearth.toml

use clap::Parser;
use hearth_server::{ConfigOverrides, FileStore, GameServer, Roster, ServerResult};
use hearth_sim::BehaviorRegistry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// A tick-driven text-game world server
#[derive(Parser, Debug)]
#[command(name = "hearth", author, version, about, long_about = None)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Autosave interval in seconds, 0 disables
    #[arg(short, long)]
    save: Option<u64>,

    /// World tick period in milliseconds
    #[arg(long)]
    entity_tick: Option<u64>,

    /// Player tick period in milliseconds
    #[arg(long)]
    player_tick: Option<u64>,

    /// Roster of areas and entities to load (TOML)
    #[arg(short, long)]
    roster: Option<PathBuf>,

    /// Seed for combat rolls
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            entity_tick_ms: self.entity_tick,
            player_tick_ms: self.player_tick,
            save_secs: self.save,
            roster: self.roster.clone(),
            seed: self.seed,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    // Handler panics are caught by dispatch; make sure they reach the log
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("PANIC: {}", panic_info);
    }));

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> ServerResult<()> {
    let overrides = args.overrides();
    let config = hearth_server::config::resolve(args.config.as_deref(), &overrides)?;

    let mut behaviors = BehaviorRegistry::new();
    hearth_sim::behaviors::register_builtin(&mut behaviors)?;

    let store = Arc::new(FileStore::new(config.player_dir(), config.save_format));
    let roster = config.roster.clone();
    let mut server = GameServer::new(config, behaviors, store)?;

    if let Some(path) = roster {
        Roster::load(&path)?.populate(server.world_mut())?;
    }
    server.restore_players()?;
    if let Some(path) = args.config {
        server.watch_config(path, overrides);
    }

    let running = server.running_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, shutting down...");
        running.store(false, Ordering::SeqCst);
    }) {
        log::warn!("Failed to set Ctrl+C handler: {}", e);
    }

    server.run()
}
