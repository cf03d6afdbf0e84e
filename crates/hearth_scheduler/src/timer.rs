//! Periodic timer threads

use crate::error::{SchedulerError, SchedulerResult};
use crossbeam_channel::{select, Sender};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Counters shared by every timer ever started for one cycle
#[derive(Debug, Default)]
pub struct CycleStats {
    active: AtomicUsize,
    max_active: AtomicUsize,
    starts: AtomicU64,
    fired: AtomicU64,
    dropped: AtomicU64,
}

impl CycleStats {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.starts.fetch_add(1, Ordering::Relaxed);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Timer threads currently running
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Most timer threads ever running at once
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Timer threads started so far
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    /// Times a timer went off
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Ticks dropped because the consumer was behind
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// A named thread that runs a callback every `interval` until stopped.
///
/// Stopping wakes the thread at once and joins it, so after [`PeriodicTask::stop`] returns the
/// callback will never run again.
pub struct PeriodicTask {
    name: String,
    interval: Duration,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn the timer thread. `fire` runs once per period; returning `false` ends the timer.
    pub fn start<F>(
        name: &str,
        interval: Duration,
        stats: Arc<CycleStats>,
        mut fire: F,
    ) -> SchedulerResult<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval(name.to_string()));
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let thread_name = format!("tick-{}", name);
        stats.enter();
        let thread_stats = stats.clone();
        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let stats = thread_stats;
                let ticker = crossbeam_channel::tick(interval);
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            stats.fired.fetch_add(1, Ordering::Relaxed);
                            if !fire() {
                                break;
                            }
                        }
                    }
                }
                stats.leave();
            })
            .map_err(|source| {
                stats.leave();
                SchedulerError::Spawn {
                    name: thread_name,
                    source,
                }
            })?;

        log::debug!("Timer '{}' started every {:?}", name, interval);
        Ok(Self {
            name: name.to_string(),
            interval,
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the thread has not been stopped yet
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop and join the thread. Safe to call more than once.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the stop channel, which wakes the select
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Timer '{}' panicked", self.name);
            }
            log::debug!("Timer '{}' stopped", self.name);
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Report a dropped tick on `stats`
pub(crate) fn note_dropped(stats: &CycleStats) {
    stats.dropped.fetch_add(1, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_fires_until_stopped() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let stats = Arc::new(CycleStats::default());
        let mut task = PeriodicTask::start("test", Duration::from_millis(5), stats.clone(), move || {
            tx.send(()).is_ok()
        })
        .unwrap();

        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        task.stop();
        assert!(!task.is_running());
        assert_eq!(stats.active(), 0);

        // Drain whatever was in flight, then nothing else arrives
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(30));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_is_immediate_and_idempotent() {
        let stats = Arc::new(CycleStats::default());
        let mut task =
            PeriodicTask::start("slow", Duration::from_secs(3600), stats.clone(), || true).unwrap();

        let started = Instant::now();
        task.stop();
        task.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(stats.active(), 0);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let stats = Arc::new(CycleStats::default());
        assert!(matches!(
            PeriodicTask::start("bad", Duration::ZERO, stats, || true),
            Err(SchedulerError::ZeroInterval(name)) if name == "bad"
        ));
    }
}
