//! Built-in behaviors
//!
//! - `combat`: runs the entity's combat round or regeneration every update, and starts
//!   regenerating after landing a killing blow once nothing else is fighting it
//! - `aggro`: idle entities pick a fight with the first matching entity in their area

pub mod aggro;
pub mod combat;

use crate::behavior::BehaviorRegistry;
use crate::error::ConfigResult;

/// Register every built-in behavior
pub fn register_builtin(registry: &mut BehaviorRegistry) -> ConfigResult<()> {
    registry.register(combat::KIND, combat::listeners)?;
    registry.register(aggro::KIND, aggro::listeners)?;
    Ok(())
}
