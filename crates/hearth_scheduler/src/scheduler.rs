//! Tick scheduler
//!
//! Three independent cycles feed one channel: the world tick, the player tick and autosave.
//! Timer threads never touch game state; they only post a [`TickKind`] for the game loop to
//! act on. If the loop falls behind and the channel is full, the tick is dropped rather than
//! queued, so a slow loop never faces a burst of stale ticks.

use crate::error::{SchedulerError, SchedulerResult};
use crate::timer::{note_dropped, CycleStats, PeriodicTask};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default world and player tick period
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Default autosave period
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(10);

/// Default capacity of the tick channel
pub const DEFAULT_CAPACITY: usize = 64;

/// The scheduled cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TickKind {
    /// Update every live area
    World,
    /// Update every connected player
    Player,
    /// Persist player state
    Save,
}

impl TickKind {
    /// All cycles
    pub const ALL: [TickKind; 3] = [TickKind::World, TickKind::Player, TickKind::Save];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Player => "player",
            Self::Save => "save",
        }
    }
}

impl fmt::Display for TickKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Periods for each cycle. A zero save interval disables autosave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConfig {
    pub entity_tick: Duration,
    pub player_tick: Duration,
    pub save_interval: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            entity_tick: DEFAULT_TICK,
            player_tick: DEFAULT_TICK,
            save_interval: DEFAULT_SAVE_INTERVAL,
        }
    }
}

impl TickConfig {
    /// Period for one cycle
    pub fn interval(&self, kind: TickKind) -> Duration {
        match kind {
            TickKind::World => self.entity_tick,
            TickKind::Player => self.player_tick,
            TickKind::Save => self.save_interval,
        }
    }
}

/// Owns at most one timer per cycle
pub struct TickScheduler {
    sender: Sender<TickKind>,
    timers: BTreeMap<TickKind, PeriodicTask>,
    stats: BTreeMap<TickKind, Arc<CycleStats>>,
}

impl TickScheduler {
    /// Create a scheduler and the receiving end the game loop reads from
    pub fn new(capacity: usize) -> (Self, Receiver<TickKind>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        let stats = TickKind::ALL
            .iter()
            .map(|kind| (*kind, Arc::new(CycleStats::default())))
            .collect();
        let scheduler = Self {
            sender,
            timers: BTreeMap::new(),
            stats,
        };
        (scheduler, receiver)
    }

    /// Start (or restart) one cycle. Any running timer for it is stopped first; a zero
    /// interval is rejected before that, leaving the old timer in place.
    pub fn start(&mut self, kind: TickKind, interval: Duration) -> SchedulerResult<()> {
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval(kind.name().to_string()));
        }
        self.stop(kind);

        let stats = self.stats_for(kind);
        let counters = stats.clone();
        let sender = self.sender.clone();
        let task = PeriodicTask::start(kind.name(), interval, stats, move || {
            match sender.try_send(kind) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    note_dropped(&counters);
                    log::trace!("Game loop behind, dropped {} tick", kind);
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            }
        })?;
        self.timers.insert(kind, task);
        Ok(())
    }

    /// Stop one cycle. Returns whether a timer was running. Safe to call repeatedly.
    pub fn stop(&mut self, kind: TickKind) -> bool {
        match self.timers.remove(&kind) {
            Some(mut task) => {
                task.stop();
                true
            }
            None => false,
        }
    }

    /// Start every cycle from `config`. Autosave is skipped when its interval is zero.
    pub fn start_all(&mut self, config: &TickConfig) -> SchedulerResult<()> {
        for kind in TickKind::ALL {
            let interval = config.interval(kind);
            if kind == TickKind::Save && interval.is_zero() {
                log::info!("Autosave disabled");
                self.stop(kind);
                continue;
            }
            self.start(kind, interval)?;
        }
        Ok(())
    }

    /// Apply a new config, restarting only cycles whose period changed. Returns those cycles.
    pub fn reconfigure(&mut self, config: &TickConfig) -> SchedulerResult<Vec<TickKind>> {
        let mut changed = Vec::new();
        for kind in TickKind::ALL {
            let interval = config.interval(kind);
            if self.interval(kind) == Some(interval) {
                continue;
            }
            if kind == TickKind::Save && interval.is_zero() {
                if self.stop(kind) {
                    log::info!("Autosave disabled");
                    changed.push(kind);
                }
                continue;
            }
            log::info!("Restarting {} tick every {:?}", kind, interval);
            self.start(kind, interval)?;
            changed.push(kind);
        }
        Ok(changed)
    }

    /// Stop every cycle
    pub fn stop_all(&mut self) {
        for kind in TickKind::ALL {
            self.stop(kind);
        }
    }

    /// Whether a cycle has a running timer
    pub fn is_running(&self, kind: TickKind) -> bool {
        self.timers.contains_key(&kind)
    }

    /// Period of a running cycle
    pub fn interval(&self, kind: TickKind) -> Option<Duration> {
        self.timers.get(&kind).map(PeriodicTask::interval)
    }

    /// Counters for a cycle
    pub fn stats(&self, kind: TickKind) -> Arc<CycleStats> {
        self.stats_for(kind)
    }

    fn stats_for(&self, kind: TickKind) -> Arc<CycleStats> {
        self.stats
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}
