use crate::behavior::{BehaviorConfig, Listeners};
use crate::combat;
use crate::error::ConfigResult;

pub const KIND: &str = "combat";

/// `updateTick` runs a combat round while engaged and regeneration otherwise. `deathblow`
/// starts regeneration when the kill ended the fight.
pub fn listeners(_config: &BehaviorConfig) -> ConfigResult<Listeners> {
    Ok(Listeners::new()
        .on_update_tick(|ctx, _| {
            let this = ctx.this();
            let in_combat = ctx.entity().map_or(false, |e| e.is_in_combat());
            if in_combat {
                combat::update_round(ctx.world_mut(), this)?;
            } else {
                combat::update_regeneration(ctx.world_mut(), this)?;
            }
            Ok(())
        })
        .on_deathblow(|ctx, _, _target| {
            let this = ctx.this();
            let idle = ctx
                .entity()
                .map_or(false, |e| e.is_live() && !e.is_in_combat());
            if idle {
                combat::start_regeneration(ctx.world_mut(), this)?;
            }
            Ok(())
        }))
}
