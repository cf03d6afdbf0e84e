use crate::behavior::{BehaviorConfig, Listeners};
use crate::combat;
use crate::entity::{CombatState, Entity};
use crate::error::{ConfigResult, ConfigurationError};
use crate::world::World;
use hearth_core::EntityId;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const KIND: &str = "aggro";

/// Who an aggressive entity attacks
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggroConfig {
    /// Attack players
    pub players: bool,
    /// Attack entities with these names
    pub names: Vec<String>,
}

impl AggroConfig {
    /// `null` and `true` mean "attack players"
    pub fn from_config(config: &BehaviorConfig) -> ConfigResult<Self> {
        match config.value() {
            Value::Null | Value::Bool(true) => Ok(Self {
                players: true,
                names: Vec::new(),
            }),
            _ => config.parse().map_err(|e| ConfigurationError::InvalidConfig {
                behavior: KIND.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn matches(&self, candidate: &Entity) -> bool {
        (self.players && candidate.is_player()) || self.names.iter().any(|n| n == candidate.name())
    }
}

/// First live entity sharing `this`'s area that `aggro` wants to fight
fn pick_target(world: &World, this: EntityId, aggro: &AggroConfig) -> Option<EntityId> {
    let area = world.entity(this)?.area()?;
    world
        .registry()
        .area(area)?
        .members()
        .iter()
        .copied()
        .filter(|id| *id != this)
        .find(|id| {
            world
                .entity(*id)
                .map_or(false, |e| e.is_live() && aggro.matches(e))
        })
}

pub fn listeners(config: &BehaviorConfig) -> ConfigResult<Listeners> {
    let aggro = Arc::new(AggroConfig::from_config(config)?);
    Ok(Listeners::new().on_update_tick(move |ctx, _| {
        let this = ctx.this();
        let idle = ctx
            .entity()
            .map_or(false, |e| e.is_live() && e.combat().state() != CombatState::Engaged);
        if !idle {
            return Ok(());
        }
        if let Some(target) = pick_target(ctx.world(), this, &aggro) {
            log::debug!("{} turns on {}", this, target);
            combat::initiate(ctx.world_mut(), this, target)?;
        }
        Ok(())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shorthand_configs() {
        let aggro = AggroConfig::from_config(&BehaviorConfig::new(json!(true))).unwrap();
        assert!(aggro.players);
        let aggro = AggroConfig::from_config(&BehaviorConfig::empty()).unwrap();
        assert!(aggro.players);
    }

    #[test]
    fn test_named_targets() {
        let aggro =
            AggroConfig::from_config(&BehaviorConfig::new(json!({ "names": ["rat"] }))).unwrap();
        assert!(!aggro.players);
        assert_eq!(aggro.names, vec!["rat".to_string()]);
    }

    #[test]
    fn test_bad_config_rejected() {
        assert!(matches!(
            AggroConfig::from_config(&BehaviorConfig::new(json!({ "victims": 3 }))),
            Err(ConfigurationError::InvalidConfig { .. })
        ));
    }
}
