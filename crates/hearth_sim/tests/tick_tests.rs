//! Integration tests for the tick passes and player snapshots

mod common;

use common::*;
use hearth_sim::prelude::*;
use hearth_sim::{snapshot_players, BehaviorRecord, PlayerRecord};
use serde_json::json;

fn ticked(log: &EventLog) -> Vec<EntityId> {
    log.lock()
        .iter()
        .filter(|(_, kind)| *kind == EventKind::UpdateTick)
        .map(|(id, _)| *id)
        .collect()
}

#[test]
fn test_world_tick_updates_area_members_in_order() {
    let log = event_log();
    let mut world = world(registry(&log));
    let cave = world.add_area("cave");
    let field = world.add_area("field");
    let rat = fighter(&mut world, "rat", EntityKind::Npc, 5, None);
    let bat = fighter(&mut world, "bat", EntityKind::Npc, 5, None);
    let cow = fighter(&mut world, "cow", EntityKind::Npc, 5, None);
    let loner = fighter(&mut world, "loner", EntityKind::Npc, 5, None);
    world.place(bat, cave).unwrap();
    world.place(rat, cave).unwrap();
    world.place(cow, field).unwrap();

    let report = tick::world_tick(&mut world);
    assert_eq!(report.tick, 1);
    assert_eq!(report.updated, 3);
    assert_eq!(ticked(&log), vec![bat, rat, cow]);
    assert!(!ticked(&log).contains(&loner));
}

#[test]
fn test_entity_killed_mid_tick_is_skipped() {
    let log = event_log();
    let mut registry = registry(&log);
    registry
        .register("smite", |config| {
            let victim = EntityId::from_raw(config.get_or("victim", 0u64));
            Ok(Listeners::new().on_update_tick(move |ctx, _| {
                combat::apply_damage(ctx.world_mut(), Damage::new(victim, 1000))?;
                Ok(())
            }))
        })
        .unwrap();
    let mut world = world(registry);
    let cave = world.add_area("cave");
    let priest = fighter(&mut world, "priest", EntityKind::Npc, 5, None);
    let rat = fighter(&mut world, "rat", EntityKind::Npc, 5, None);
    let bat = fighter(&mut world, "bat", EntityKind::Npc, 5, None);
    for id in [priest, rat, bat] {
        world.place(id, cave).unwrap();
    }
    world
        .attach_behavior(priest, "smite", BehaviorConfig::new(json!({ "victim": bat.raw() })))
        .unwrap();

    let report = tick::world_tick(&mut world);
    assert_eq!(ticked(&log), vec![priest, rat]);
    assert_eq!(report.updated, 2);
    assert!(!world.is_live(bat));
}

#[test]
fn test_entity_removed_mid_tick_is_skipped() {
    let log = event_log();
    let mut registry = registry(&log);
    registry
        .register("banish", |config| {
            let victim = EntityId::from_raw(config.get_or("victim", 0u64));
            Ok(Listeners::new().on_update_tick(move |ctx, _| {
                ctx.world_mut().despawn(victim)?;
                Ok(())
            }))
        })
        .unwrap();
    let mut world = world(registry);
    let cave = world.add_area("cave");
    let mage = fighter(&mut world, "mage", EntityKind::Npc, 5, None);
    let imp = fighter(&mut world, "imp", EntityKind::Npc, 5, None);
    let rat = fighter(&mut world, "rat", EntityKind::Npc, 5, None);
    for id in [mage, imp, rat] {
        world.place(id, cave).unwrap();
    }
    world
        .attach_behavior(mage, "banish", BehaviorConfig::new(json!({ "victim": imp.raw() })))
        .unwrap();

    tick::world_tick(&mut world);
    assert_eq!(ticked(&log), vec![mage, rat]);
    assert!(world.entity(imp).is_none());
}

#[test]
fn test_cycle_in_one_entity_does_not_stop_the_pass() {
    let log = event_log();
    let mut registry = registry(&log);
    registry
        .register("echo", |_| {
            Ok(Listeners::new().on_update_tick(|ctx, _| {
                let this = ctx.this();
                ctx.dispatch(this, Event::UpdateTick)?;
                Ok(())
            }))
        })
        .unwrap();
    let mut world = world(registry);
    let cave = world.add_area("cave");
    let echo = fighter(&mut world, "echo", EntityKind::Npc, 5, None);
    let rat = fighter(&mut world, "rat", EntityKind::Npc, 5, None);
    world.place(echo, cave).unwrap();
    world.place(rat, cave).unwrap();
    world.attach_behavior(echo, "echo", BehaviorConfig::empty()).unwrap();

    let report = tick::world_tick(&mut world);
    assert_eq!(report.failed, 1);
    assert_eq!(report.updated, 1);
    assert!(ticked(&log).contains(&rat));
}

#[test]
fn test_player_and_world_passes_are_separate() {
    let log = event_log();
    let mut world = world(registry(&log));
    let town = world.add_area("town");
    let hero = fighter(&mut world, "hero", EntityKind::Player, 20, None);
    let ghost = fighter(&mut world, "ghost", EntityKind::Player, 20, None);
    let guard = fighter(&mut world, "guard", EntityKind::Npc, 20, None);
    world.place(hero, town).unwrap();
    world.place(guard, town).unwrap();
    combat::kill(&mut world, ghost, None).unwrap();

    tick::world_tick(&mut world);
    assert_eq!(ticked(&log), vec![guard]);

    log.lock().clear();
    let report = tick::player_tick(&mut world);
    assert_eq!(report.tick, 2);
    assert_eq!(ticked(&log), vec![hero]);
}

#[test]
fn test_aggressive_npc_attacks_player() {
    let log = event_log();
    let mut world = world(registry(&log));
    let den = world.add_area("den");
    let wolf = fighter(&mut world, "wolf", EntityKind::Npc, 20, Some(4));
    let sheep = fighter(&mut world, "sheep", EntityKind::Npc, 20, None);
    let hero = fighter(&mut world, "hero", EntityKind::Player, 30, Some(2));
    for id in [wolf, sheep, hero] {
        world.place(id, den).unwrap();
    }
    world.attach_behavior(wolf, "aggro", BehaviorConfig::empty()).unwrap();
    world.attach_behavior(wolf, "combat", BehaviorConfig::empty()).unwrap();
    world.attach_behavior(hero, "combat", BehaviorConfig::empty()).unwrap();

    // aggro engages, then the combat behavior swings in the same update
    tick::world_tick(&mut world);
    assert_eq!(world.entity(wolf).unwrap().combat().opponents(), &[hero]);
    assert_eq!(health(&world, hero), 26);
    assert_eq!(health(&world, sheep), 20);

    tick::player_tick(&mut world);
    assert_eq!(health(&world, wolf), 18);
}

#[test]
fn test_player_snapshot_restores_into_fresh_world() {
    let log = event_log();
    let mut world = world(registry(&log));
    let town = world.add_area("town");
    let hero = fighter(&mut world, "hero", EntityKind::Player, 30, Some(2));
    let _guard = fighter(&mut world, "guard", EntityKind::Npc, 20, None);
    world.place(hero, town).unwrap();
    world.attach_behavior(hero, "combat", BehaviorConfig::empty()).unwrap();
    combat::apply_damage(&mut world, Damage::new(hero, 12)).unwrap();

    let records = snapshot_players(&world);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "hero");
    assert_eq!(records[0].area.as_deref(), Some("town"));

    let mut fresh = common::world(registry(&log));
    let town = fresh.add_area("town");
    let id = records[0].restore(&mut fresh).unwrap();
    assert_eq!(id, hero);

    let restored = fresh.entity(id).unwrap();
    assert_eq!(restored.attributes().current(HEALTH), Some(18));
    assert_eq!(restored.area(), Some(town));
    assert!(restored.has_behavior("watch"));
    assert!(restored.has_behavior("combat"));
    assert_eq!(restored.attack(), Some(&AttackProfile::new(2)));
}

#[test]
fn test_dead_player_restores_at_full_health() {
    let log = event_log();
    let mut world = world(registry(&log));
    let hero = fighter(&mut world, "hero", EntityKind::Player, 30, None);
    combat::apply_damage(&mut world, Damage::new(hero, 100)).unwrap();

    let record: PlayerRecord = snapshot_players(&world).remove(0);
    let mut fresh = common::world(registry(&log));
    let id = record.restore(&mut fresh).unwrap();
    assert!(fresh.is_live(id));
    assert_eq!(health(&fresh, id), 30);
}

#[test]
fn test_failed_restore_leaves_world_untouched() {
    let log = event_log();
    let mut world = world(registry(&log));
    let town = world.add_area("town");
    let hero = fighter(&mut world, "hero", EntityKind::Player, 30, None);
    world.place(hero, town).unwrap();
    world.attach_behavior(hero, "combat", BehaviorConfig::empty()).unwrap();

    let mut record: PlayerRecord = snapshot_players(&world).remove(0);
    record.behaviors.push(BehaviorRecord {
        kind: "nope".to_string(),
        config: "null".to_string(),
    });

    let mut fresh = common::world(registry(&log));
    let town = fresh.add_area("town");
    assert!(matches!(
        record.restore(&mut fresh),
        Err(ConfigurationError::UnknownBehavior(kind)) if kind == "nope"
    ));
    assert!(fresh.entity(hero).is_none());
    assert!(fresh.registry().area(town).unwrap().members().is_empty());

    // The same record restores cleanly once the bad behavior is gone
    record.behaviors.pop();
    assert_eq!(record.restore(&mut fresh).unwrap(), hero);
}
