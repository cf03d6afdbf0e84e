//! Combat engine
//!
//! Free functions over the [`World`] that run combat rounds, apply damage, resolve deaths and
//! manage regeneration.
//!
//! Death is processed exactly once per entity:
//! 1. the victim stops being live and records its killer
//! 2. it is removed from every opponent list, so the killer's combat state is already settled
//! 3. `killed` goes to the victim, then `deathblow` to the killer (if any)
//! 4. the victim's health is pulled back to zero if a modifier let it go negative
//!
//! When both sides of a fight would drop each other in the same pass, the one killed before it
//! had its round still lands a final strike on its killer. An entity whose kind the pass does
//! not update has no round pending, so it falls without answering.

use crate::damage::Damage;
use crate::entity::{AttackProfile, CombatState, RegenState};
use crate::error::{CombatResolutionError, CombatResult};
use crate::event::Event;
use crate::world::World;
use hearth_core::{EntityId, CRITICAL, HEALTH};

/// Name of the optional attribute holding an entity's own regeneration rate
pub const REGEN: &str = "regen";

/// Rates like `critical` and `regen` are settings, not pools to refill
fn regenerates(name: &str) -> bool {
    name != CRITICAL && name != REGEN
}

/// Put `attacker` and `target` in combat with each other.
///
/// Idempotent for an existing pair. An entity going from idle (or regenerating) to engaged
/// receives `combatStart`; regeneration is interrupted with `regenEnd`.
pub fn initiate(world: &mut World, attacker: EntityId, target: EntityId) -> CombatResult<()> {
    if attacker == target {
        return Err(CombatResolutionError::SelfTarget(attacker));
    }
    world.live_entity_mut(attacker)?;
    world.live_entity_mut(target)?;

    engage(world, attacker, target)?;
    engage(world, target, attacker)?;
    log::debug!("{} engaged {}", attacker, target);
    Ok(())
}

fn engage(world: &mut World, this: EntityId, opponent: EntityId) -> CombatResult<()> {
    let entity = world.live_entity_mut(this)?;
    let combat = entity.combat_mut();
    combat.add_opponent(opponent);

    let previous = combat.state();
    if previous == CombatState::Engaged {
        return Ok(());
    }
    combat.set_state(CombatState::Engaged);
    combat.lag = 0;

    if previous == CombatState::Regenerating {
        world.dispatch(this, Event::RegenEnd)?;
    }
    world.dispatch(this, Event::CombatStart)?;
    Ok(())
}

/// Drop `a` and `b` from each other's opponent lists
pub fn disengage(world: &mut World, a: EntityId, b: EntityId) -> CombatResult<()> {
    drop_opponent(world, a, b)?;
    drop_opponent(world, b, a)?;
    Ok(())
}

/// Remove `opponent` from `this`'s list, ending combat for `this` if nobody is left
fn drop_opponent(world: &mut World, this: EntityId, opponent: EntityId) -> CombatResult<()> {
    let Some(entity) = world.entity_mut(this) else {
        return Ok(());
    };
    if entity.combat_mut().remove_opponent(opponent) {
        end_combat_if_alone(world, this)?;
    }
    Ok(())
}

fn end_combat_if_alone(world: &mut World, this: EntityId) -> CombatResult<()> {
    let Some(entity) = world.entity_mut(this) else {
        return Ok(());
    };
    let combat = entity.combat_mut();
    if combat.state() != CombatState::Engaged || !combat.opponents().is_empty() {
        return Ok(());
    }
    combat.set_state(CombatState::Idle);
    combat.lag = 0;
    world.dispatch(this, Event::CombatEnd)?;
    Ok(())
}

/// Take `id` out of combat entirely: clear its opponents and remove it from every list that
/// mentions it.
pub fn remove_from_combat(world: &mut World, id: EntityId) -> CombatResult<()> {
    for other in world.registry().engaged_with(id) {
        drop_opponent(world, other, id)?;
    }
    if let Some(entity) = world.entity_mut(id) {
        entity.combat_mut().clear_opponents();
    }
    end_combat_if_alone(world, id)
}

/// Run one combat round for `attacker`.
///
/// At most one round per entity per tick. Returns whether an attack was made. Opponents that
/// died or disappeared since the last round are dropped without error.
pub fn update_round(world: &mut World, attacker: EntityId) -> CombatResult<bool> {
    let tick = world.tick();
    let entity = world
        .entity_mut(attacker)
        .ok_or(CombatResolutionError::UnknownEntity(attacker))?;
    if !entity.is_live() || entity.combat().state() != CombatState::Engaged {
        return Ok(false);
    }
    if entity.combat().last_round == Some(tick) {
        return Ok(false);
    }
    entity.combat_mut().last_round = Some(tick);

    if entity.combat().lag > 0 {
        entity.combat_mut().lag -= 1;
        return Ok(false);
    }
    let Some(attack) = entity.attack().cloned() else {
        return Ok(false);
    };
    entity.combat_mut().lag = attack.interval_ticks.saturating_sub(1);
    let opponents = entity.combat().opponents().to_vec();

    for opponent in opponents {
        if !world.is_live(attacker) {
            break;
        }
        strike(world, attacker, &attack, opponent)?;
    }
    Ok(true)
}

/// One attack against one opponent, dropping the opponent if it can no longer be fought
fn strike(
    world: &mut World,
    attacker: EntityId,
    attack: &AttackProfile,
    opponent: EntityId,
) -> CombatResult<()> {
    let mut damage = Damage::new(opponent, attack.amount)
        .with_attacker(attacker)
        .with_attribute(attack.attribute.as_str())
        .with_critical_multiplier(attack.critical_multiplier);
    damage.source = attack.name.clone();

    match apply_damage(world, damage) {
        Ok(_) => Ok(()),
        Err(e @ CombatResolutionError::Dispatch(_)) => Err(e),
        Err(e) => {
            log::debug!("{} drops {}: {}", attacker, opponent, e);
            disengage(world, attacker, opponent)
        }
    }
}

/// Evaluate and apply one damage instance. Returns the amount applied.
///
/// `hit` goes to the attacker and `damaged` to the target. A target whose health reaches zero
/// dies. Damage without an attacker is environmental: the victim gets `killed` with no killer
/// and nobody gets `deathblow`.
pub fn apply_damage(world: &mut World, mut damage: Damage) -> CombatResult<u32> {
    let target = damage.target;
    let entity = world.live_entity_mut(target)?;
    if !entity.attributes().has(&damage.attribute) {
        return Err(hearth_core::AttributeError::Unknown(damage.attribute.clone()).into());
    }

    let amount = world.evaluate_damage(&mut damage)?;
    damage.applied = Some(amount);

    let entity = world.live_entity_mut(target)?;
    entity.attributes_mut().lower(&damage.attribute, amount)?;
    if damage.attacker.is_some() {
        entity.combat_mut().last_damaged_by = damage.attacker;
    }

    if let Some(attacker) = damage.attacker {
        world.dispatch(
            attacker,
            Event::Hit {
                damage: damage.clone(),
                target,
            },
        )?;
    }
    let killer = damage.attacker;
    world.dispatch(target, Event::Damaged { damage })?;

    let depleted = world
        .entity(target)
        .filter(|e| e.is_live())
        .and_then(|e| e.attributes().get(HEALTH))
        .map_or(false, |health| health.is_depleted());
    if depleted {
        handle_death(world, target, killer)?;
    }
    Ok(amount)
}

/// Restore `amount` to an attribute of a live entity. Returns the amount actually restored.
pub fn heal(world: &mut World, target: EntityId, attribute: &str, amount: u32) -> CombatResult<u32> {
    let entity = world.live_entity_mut(target)?;
    Ok(entity.attributes_mut().raise(attribute, amount)?)
}

/// Kill `victim` outside of damage resolution (scripted deaths, admin commands)
pub fn kill(world: &mut World, victim: EntityId, killer: Option<EntityId>) -> CombatResult<()> {
    world.live_entity_mut(victim)?;
    handle_death(world, victim, killer)
}

fn handle_death(world: &mut World, victim: EntityId, killer: Option<EntityId>) -> CombatResult<()> {
    let tick = world.tick();
    let Some(entity) = world.entity(victim) else {
        return Ok(());
    };
    if !entity.is_live() {
        return Ok(());
    }

    // Killed before its own round this pass: it still gets to answer its killer
    let retaliation = match (killer, entity.attack()) {
        (Some(k), Some(attack))
            if k != victim && entity.combat().has_opponent(k) && world.round_pending(entity) =>
        {
            Some((k, attack.clone()))
        }
        _ => None,
    };

    let Some(entity) = world.entity_mut(victim) else {
        return Ok(());
    };
    entity.set_live(false);

    let combat = entity.combat_mut();
    combat.killed_by = killer;
    if combat.state() == CombatState::Regenerating {
        combat.set_state(CombatState::Idle);
    }
    if retaliation.is_some() {
        combat.last_round = Some(tick);
    }
    match killer {
        Some(k) => log::info!("{} killed by {}", victim, k),
        None => log::info!("{} died", victim),
    }

    remove_from_combat(world, victim)?;
    world.dispatch(victim, Event::Killed { killer })?;
    if let Some(k) = killer.filter(|k| *k != victim) {
        world.dispatch(k, Event::Deathblow { target: victim })?;
    }

    if let Some(entity) = world.entity_mut(victim) {
        if let Ok(health) = entity.attributes_mut().get_mut(HEALTH) {
            health.settle();
        }
    }

    if let Some((target, attack)) = retaliation {
        if world.is_live(target) {
            log::debug!("{} strikes {} as it falls", victim, target);
            let mut damage = Damage::new(target, attack.amount)
                .with_attacker(victim)
                .with_attribute(attack.attribute.as_str())
                .with_critical_multiplier(attack.critical_multiplier);
            damage.source = attack.name;
            match apply_damage(world, damage) {
                Ok(_) => {}
                Err(e @ CombatResolutionError::Dispatch(_)) => return Err(e),
                Err(e) => log::debug!("Final strike from {} lost: {}", victim, e),
            }
        }
    }
    Ok(())
}

/// Begin regenerating. A no-op (returns `false`) when the entity is dead, fighting or already
/// regenerating.
pub fn start_regeneration(world: &mut World, id: EntityId) -> CombatResult<bool> {
    let default_rate = world.settings().regen_per_tick;
    let entity = world
        .entity_mut(id)
        .ok_or(CombatResolutionError::UnknownEntity(id))?;
    if !entity.is_live() || entity.combat().state() != CombatState::Idle {
        return Ok(false);
    }

    let per_tick = entity
        .attributes()
        .max(REGEN)
        .and_then(|r| u32::try_from(r).ok())
        .filter(|r| *r > 0)
        .unwrap_or(default_rate);
    entity.combat_mut().start_regen(RegenState { per_tick });
    log::trace!("{} regenerating {} per tick", id, per_tick);

    world.dispatch(id, Event::RegenStart)?;
    Ok(true)
}

/// Advance regeneration by one tick. Returns whether the entity is still regenerating.
///
/// Every pool attribute (all but `critical` and `regen`) rises by the regeneration rate. Once
/// those are full the entity goes idle and receives `regenEnd`.
pub fn update_regeneration(world: &mut World, id: EntityId) -> CombatResult<bool> {
    let entity = world
        .entity_mut(id)
        .ok_or(CombatResolutionError::UnknownEntity(id))?;
    let Some(regen) = entity.combat().regen() else {
        return Ok(false);
    };
    if !entity.is_live() {
        return Ok(false);
    }

    for attribute in entity.attributes_mut().iter_mut() {
        if regenerates(attribute.name()) {
            attribute.raise(regen.per_tick);
        }
    }
    let full = entity
        .attributes()
        .iter()
        .filter(|a| regenerates(a.name()))
        .all(|a| a.is_full());
    if !full {
        return Ok(true);
    }

    entity.combat_mut().set_state(CombatState::Idle);
    world.dispatch(id, Event::RegenEnd)?;
    Ok(false)
}

/// Bring a dead entity back with full health and let the rest regenerate
pub fn respawn(world: &mut World, id: EntityId) -> CombatResult<()> {
    let entity = world
        .entity_mut(id)
        .ok_or(CombatResolutionError::UnknownEntity(id))?;
    if entity.is_live() {
        return Ok(());
    }
    entity.set_live(true);
    *entity.combat_mut() = Default::default();
    if let Ok(health) = entity.attributes_mut().get_mut(HEALTH) {
        health.set_to_max();
    }
    log::info!("{} respawned", id);

    start_regeneration(world, id)?;
    Ok(())
}
