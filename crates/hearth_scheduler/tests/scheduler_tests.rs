//! Integration tests for hearth_scheduler

use hearth_scheduler::*;
use std::thread;
use std::time::Duration;

const FAST: Duration = Duration::from_millis(2);

#[test]
fn test_ticks_reach_the_loop() {
    let (mut scheduler, rx) = TickScheduler::new(DEFAULT_CAPACITY);
    scheduler.start(TickKind::Player, FAST).unwrap();

    assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), TickKind::Player);
    assert!(scheduler.stats(TickKind::Player).fired() >= 1);
}

#[test]
fn test_restart_never_overlaps_timers() {
    let (mut scheduler, rx) = TickScheduler::new(DEFAULT_CAPACITY);
    for _ in 0..100 {
        scheduler.start(TickKind::World, Duration::from_millis(1)).unwrap();
        while rx.try_recv().is_ok() {}
    }

    let stats = scheduler.stats(TickKind::World);
    assert_eq!(stats.starts(), 100);
    assert_eq!(stats.max_active(), 1);
    assert_eq!(stats.active(), 1);

    scheduler.stop(TickKind::World);
    assert_eq!(stats.active(), 0);
}

#[test]
fn test_stopped_cycle_goes_quiet() {
    let (mut scheduler, rx) = TickScheduler::new(DEFAULT_CAPACITY);
    scheduler.start(TickKind::World, FAST).unwrap();
    scheduler.start(TickKind::Player, FAST).unwrap();
    rx.recv_timeout(Duration::from_secs(2)).unwrap();

    assert!(scheduler.stop(TickKind::World));
    assert!(!scheduler.stop(TickKind::World));
    while rx.try_recv().is_ok() {}

    thread::sleep(Duration::from_millis(40));
    let late: Vec<TickKind> = rx.try_iter().collect();
    assert!(!late.contains(&TickKind::World));
    assert!(late.contains(&TickKind::Player));
}

#[test]
fn test_full_channel_drops_ticks() {
    let (mut scheduler, rx) = TickScheduler::new(1);
    scheduler.start(TickKind::World, Duration::from_millis(1)).unwrap();

    thread::sleep(Duration::from_millis(50));
    scheduler.stop(TickKind::World);

    assert_eq!(rx.try_iter().count(), 1);
    assert!(scheduler.stats(TickKind::World).dropped() > 0);
}

#[test]
fn test_reconfigure_restarts_only_changed_cycles() {
    let (mut scheduler, _rx) = TickScheduler::new(DEFAULT_CAPACITY);
    let config = TickConfig::default();
    scheduler.start_all(&config).unwrap();
    for kind in TickKind::ALL {
        assert!(scheduler.is_running(kind));
    }

    let faster = TickConfig {
        player_tick: Duration::from_millis(50),
        ..config
    };
    assert_eq!(scheduler.reconfigure(&faster).unwrap(), vec![TickKind::Player]);
    assert_eq!(scheduler.stats(TickKind::World).starts(), 1);
    assert_eq!(scheduler.stats(TickKind::Player).starts(), 2);
    assert_eq!(
        scheduler.interval(TickKind::Player),
        Some(Duration::from_millis(50))
    );

    assert!(scheduler.reconfigure(&faster).unwrap().is_empty());
}

#[test]
fn test_zero_save_interval_disables_autosave() {
    let (mut scheduler, _rx) = TickScheduler::new(DEFAULT_CAPACITY);
    scheduler.start_all(&TickConfig::default()).unwrap();

    let no_save = TickConfig {
        save_interval: Duration::ZERO,
        ..TickConfig::default()
    };
    assert_eq!(scheduler.reconfigure(&no_save).unwrap(), vec![TickKind::Save]);
    assert!(!scheduler.is_running(TickKind::Save));
    assert!(scheduler.is_running(TickKind::World));

    scheduler.stop_all();
    scheduler.start_all(&no_save).unwrap();
    assert!(!scheduler.is_running(TickKind::Save));
}

#[test]
fn test_zero_tick_interval_rejected() {
    let (mut scheduler, _rx) = TickScheduler::new(DEFAULT_CAPACITY);
    assert!(matches!(
        scheduler.start(TickKind::World, Duration::ZERO),
        Err(SchedulerError::ZeroInterval(_))
    ));
    assert!(!scheduler.is_running(TickKind::World));
}

#[test]
fn test_zero_interval_keeps_running_timer() {
    let (mut scheduler, _rx) = TickScheduler::new(DEFAULT_CAPACITY);
    scheduler.start(TickKind::World, FAST).unwrap();

    assert!(matches!(
        scheduler.start(TickKind::World, Duration::ZERO),
        Err(SchedulerError::ZeroInterval(name)) if name == "world"
    ));
    assert!(scheduler.is_running(TickKind::World));
    assert_eq!(scheduler.interval(TickKind::World), Some(FAST));
    assert_eq!(scheduler.stats(TickKind::World).starts(), 1);
    scheduler.stop_all();
}
