//! Shared fixtures for hearth_sim integration tests

#![allow(dead_code)]

use hearth_sim::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;

pub type EventLog = Arc<Mutex<Vec<(EntityId, EventKind)>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn note(log: &EventLog, ctx: &BehaviorContext<'_>, kind: EventKind) -> HandlerResult {
    log.lock().push((ctx.this(), kind));
    Ok(())
}

/// Records every event the entity receives
pub fn watch_listeners(log: &EventLog) -> Listeners {
    Listeners::new()
        .on_update_tick({
            let log = log.clone();
            move |ctx, _| note(&log, ctx, EventKind::UpdateTick)
        })
        .on_hit({
            let log = log.clone();
            move |ctx, _, _, _| note(&log, ctx, EventKind::Hit)
        })
        .on_damaged({
            let log = log.clone();
            move |ctx, _, _| note(&log, ctx, EventKind::Damaged)
        })
        .on_killed({
            let log = log.clone();
            move |ctx, _, _| note(&log, ctx, EventKind::Killed)
        })
        .on_deathblow({
            let log = log.clone();
            move |ctx, _, _| note(&log, ctx, EventKind::Deathblow)
        })
        .on_combat_start({
            let log = log.clone();
            move |ctx, _| note(&log, ctx, EventKind::CombatStart)
        })
        .on_combat_end({
            let log = log.clone();
            move |ctx, _| note(&log, ctx, EventKind::CombatEnd)
        })
        .on_regen_start({
            let log = log.clone();
            move |ctx, _| note(&log, ctx, EventKind::RegenStart)
        })
        .on_regen_end({
            let log = log.clone();
            move |ctx, _| note(&log, ctx, EventKind::RegenEnd)
        })
}

/// Built-in behaviors plus `watch`
pub fn registry(log: &EventLog) -> BehaviorRegistry {
    let mut registry = BehaviorRegistry::new();
    hearth_sim::behaviors::register_builtin(&mut registry).unwrap();
    let log = log.clone();
    registry
        .register("watch", move |_| Ok(watch_listeners(&log)))
        .unwrap();
    registry
}

pub fn world(registry: BehaviorRegistry) -> World {
    World::new(
        Arc::new(registry),
        WorldSettings {
            regen_per_tick: 5,
            rng_seed: Some(7),
        },
    )
}

/// Spawn an entity with `health` and an optional attack, watched
pub fn fighter(
    world: &mut World,
    name: &str,
    kind: EntityKind,
    health: i32,
    attack: Option<u32>,
) -> EntityId {
    let id = world.spawn(name, kind, Attributes::new().with(HEALTH, health).unwrap());
    world
        .entity_mut(id)
        .unwrap()
        .set_attack(attack.map(AttackProfile::new));
    world
        .attach_behavior(id, "watch", BehaviorConfig::empty())
        .unwrap();
    id
}

/// Events received, excluding `updateTick`
pub fn received(log: &EventLog) -> Vec<(EntityId, EventKind)> {
    log.lock()
        .iter()
        .copied()
        .filter(|(_, kind)| *kind != EventKind::UpdateTick)
        .collect()
}

pub fn count(log: &EventLog, id: EntityId, kind: EventKind) -> usize {
    log.lock().iter().filter(|e| **e == (id, kind)).count()
}

pub fn health(world: &World, id: EntityId) -> i32 {
    world
        .entity(id)
        .and_then(|e| e.attributes().current(HEALTH))
        .unwrap()
}
