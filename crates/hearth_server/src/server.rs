//! Game loop
//!
//! The [`GameServer`] owns the [`World`] and is the only code that touches it. Timer threads
//! post [`TickKind`] messages; the loop runs one pass per message, checks its shutdown flag
//! between messages, and on exit stops the timers and writes a final save.

use crate::config::{ConfigOverrides, ServerConfig};
use crate::error::ServerResult;
use crate::persistence::{PlayerStore, SaveStats, SaveWorker};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use hearth_scheduler::{TickKind, TickScheduler};
use hearth_sim::{snapshot_players, tick, BehaviorRegistry, TickReport, World};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// How long the loop waits for a tick before re-checking the shutdown flag
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Batches the save worker may hold before autosaves are skipped
const SAVE_QUEUE: usize = 2;

/// Running totals for the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub world_ticks: u64,
    pub player_ticks: u64,
    pub saves: u64,
    /// Dispatches aborted by configuration errors, across all passes
    pub failed_dispatches: u64,
}

/// Config file the server re-reads when it changes on disk
struct ConfigSource {
    path: PathBuf,
    overrides: ConfigOverrides,
    modified: Option<SystemTime>,
}

impl ConfigSource {
    fn modified(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
    }
}

/// Owns the world, the timers and the save worker
pub struct GameServer {
    world: World,
    config: ServerConfig,
    scheduler: TickScheduler,
    ticks: Receiver<TickKind>,
    store: Arc<dyn PlayerStore>,
    saver: SaveWorker,
    source: Option<ConfigSource>,
    running: Arc<AtomicBool>,
    stats: LoopStats,
}

impl GameServer {
    /// Build a server. Nothing ticks until [`GameServer::start`] or [`GameServer::run`].
    pub fn new(
        config: ServerConfig,
        behaviors: BehaviorRegistry,
        store: Arc<dyn PlayerStore>,
    ) -> ServerResult<Self> {
        config.validate()?;
        let world = World::new(Arc::new(behaviors), config.world.clone());
        let (scheduler, ticks) = TickScheduler::new(config.tick_capacity);
        let saver = SaveWorker::start(store.clone(), SAVE_QUEUE)?;

        Ok(Self {
            world,
            config,
            scheduler,
            ticks,
            store,
            saver,
            source: None,
            running: Arc::new(AtomicBool::new(true)),
            stats: LoopStats::default(),
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn save_stats(&self) -> SaveStats {
        self.saver.stats()
    }

    /// Flag the loop polls; clearing it ends [`GameServer::run`]
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Re-read `path` whenever its modification time changes, re-applying `overrides`
    pub fn watch_config(&mut self, path: PathBuf, overrides: ConfigOverrides) {
        let mut source = ConfigSource {
            path,
            overrides,
            modified: None,
        };
        source.modified = source.modified();
        self.source = Some(source);
    }

    /// Bring every saved player back into the world
    pub fn restore_players(&mut self) -> ServerResult<usize> {
        let records = self.store.load_all()?;
        let mut restored = 0;
        for record in &records {
            match record.restore(&mut self.world) {
                Ok(id) => {
                    restored += 1;
                    log::debug!("Restored player {} as {}", record.name, id);
                }
                Err(e) => log::error!("Could not restore player {}: {}", record.name, e),
            }
        }
        log::info!("Restored {} of {} players", restored, records.len());
        Ok(restored)
    }

    /// Start every timer
    pub fn start(&mut self) -> ServerResult<()> {
        self.scheduler.start_all(&self.config.tick_config())?;
        log::info!(
            "Ticking world every {}ms, players every {}ms",
            self.config.entity_tick_ms,
            self.config.player_tick_ms
        );
        Ok(())
    }

    /// Handle one tick message
    pub fn handle(&mut self, kind: TickKind) {
        match kind {
            TickKind::World => {
                let report = tick::world_tick(&mut self.world);
                self.stats.world_ticks += 1;
                self.record(report);
            }
            TickKind::Player => {
                let report = tick::player_tick(&mut self.world);
                self.stats.player_ticks += 1;
                self.record(report);
            }
            TickKind::Save => {
                self.save();
                self.reload_if_changed();
            }
        }
    }

    fn record(&mut self, report: TickReport) {
        if report.failed > 0 {
            self.stats.failed_dispatches += report.failed as u64;
            log::warn!("Tick {}: {} dispatches failed", report.tick, report.failed);
        }
    }

    /// Snapshot every player and queue the batch for writing. Skipped if the worker is
    /// still busy with earlier batches.
    pub fn save(&mut self) -> bool {
        self.queue_save(false)
    }

    fn queue_save(&mut self, wait: bool) -> bool {
        let batch = snapshot_players(&self.world);
        if batch.is_empty() {
            return true;
        }
        let count = batch.len();
        let queued = if wait {
            self.saver.submit_final(batch)
        } else {
            self.saver.submit(batch)
        };
        if queued {
            self.stats.saves += 1;
            log::debug!("Queued save of {} players", count);
        }
        queued
    }

    /// Switch to a new config. Only timers whose period changed are restarted.
    pub fn apply_config(&mut self, config: ServerConfig) -> ServerResult<Vec<TickKind>> {
        config.validate()?;
        if config.data_dir != self.config.data_dir || config.save_format != self.config.save_format {
            log::warn!("Save location and format changes take effect after a restart");
        }

        let restarted = if self.scheduler.is_running(TickKind::World)
            || self.scheduler.is_running(TickKind::Player)
        {
            self.scheduler.reconfigure(&config.tick_config())?
        } else {
            Vec::new()
        };
        self.world.set_settings(config.world.clone());
        self.config = config;
        Ok(restarted)
    }

    fn reload_if_changed(&mut self) {
        let Some(source) = &mut self.source else {
            return;
        };
        let modified = source.modified();
        if modified == source.modified {
            return;
        }
        source.modified = modified;

        let result = crate::config::resolve(Some(&source.path), &source.overrides);
        let path = source.path.display().to_string();
        match result {
            Ok(config) => match self.apply_config(config) {
                Ok(restarted) => log::info!("Reloaded {} (restarted: {:?})", path, restarted),
                Err(e) => log::error!("Could not apply {}: {}", path, e),
            },
            Err(e) => log::error!("Could not reload {}: {}", path, e),
        }
    }

    /// Run until the running flag is cleared, then shut down
    pub fn run(&mut self) -> ServerResult<()> {
        self.start()?;
        while self.running.load(Ordering::SeqCst) {
            match self.ticks.recv_timeout(POLL_INTERVAL) {
                Ok(kind) => self.handle(kind),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Stop the timers, write a final save and wait for it to land. Safe to call twice.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.scheduler.stop_all();
        while self.ticks.try_recv().is_ok() {}

        self.queue_save(true);
        self.saver.finish();
        let stats = self.saver.stats();
        log::info!(
            "Shut down after {} world ticks ({} players saved, {} failed)",
            self.stats.world_ticks,
            stats.saved,
            stats.failures
        );
    }
}
