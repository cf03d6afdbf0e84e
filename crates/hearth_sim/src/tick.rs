//! Tick passes
//!
//! Two independent passes drive the world: the world tick updates NPCs area by area, the
//! player tick updates connected players. Each pass works from a snapshot of ids taken when
//! it starts; anything that dies or is removed mid-pass is skipped when its turn comes.

use crate::entity::EntityKind;
use crate::event::Event;
use crate::world::World;
use hearth_core::{AreaId, EntityId};

/// Outcome of one tick pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number this pass ran as
    pub tick: u64,
    /// Entities that received `updateTick`
    pub updated: usize,
    /// Dispatches aborted by a configuration error
    pub failed: usize,
}

impl TickReport {
    fn deliver(&mut self, world: &mut World, id: EntityId) {
        match world.dispatch(id, Event::UpdateTick) {
            Ok(()) => self.updated += 1,
            Err(e) => {
                self.failed += 1;
                log::error!("updateTick on {} aborted: {}", id, e);
            }
        }
    }
}

/// Update every non-player entity in every live area
pub fn world_tick(world: &mut World) -> TickReport {
    let tick = world.begin_tick(Some(EntityKind::Npc));
    let mut report = TickReport {
        tick,
        ..Default::default()
    };
    for area in world.registry().list_live_areas() {
        update_area(world, area, &mut report);
    }
    log::trace!("World tick {}: {} updated", tick, report.updated);
    report
}

fn update_area(world: &mut World, area: AreaId, report: &mut TickReport) {
    for id in world.registry().area_members(area) {
        let due = world
            .entity(id)
            .map_or(false, |e| e.is_live() && !e.is_player());
        if due {
            report.deliver(world, id);
        }
    }
}

/// Update every live player
pub fn player_tick(world: &mut World) -> TickReport {
    let tick = world.begin_tick(Some(EntityKind::Player));
    let mut report = TickReport {
        tick,
        ..Default::default()
    };
    for id in world.registry().list_live(EntityKind::Player) {
        if world.is_live(id) {
            report.deliver(world, id);
        }
    }
    report
}
