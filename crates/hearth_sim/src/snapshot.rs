//! Player snapshots for persistence

use crate::behavior::BehaviorConfig;
use crate::entity::{AttackProfile, Entity, EntityKind};
use crate::error::{ConfigResult, ConfigurationError};
use crate::world::World;
use hearth_core::{Attributes, EntityId, HEALTH};
use serde::{Deserialize, Serialize};

/// A saved behavior attachment. The config is kept as JSON text so binary formats can carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRecord {
    pub kind: String,
    #[serde(default = "null_config")]
    pub config: String,
}

fn null_config() -> String {
    "null".to_string()
}

/// Everything needed to bring a player back after a restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: EntityId,
    pub name: String,
    pub attributes: Attributes,
    /// Area name; ids are not stable across rosters
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub attack: Option<AttackProfile>,
    #[serde(default)]
    pub behaviors: Vec<BehaviorRecord>,
}

impl PlayerRecord {
    /// Capture a player's persistent state
    pub fn capture(world: &World, player: &Entity) -> Self {
        Self {
            id: player.id(),
            name: player.name().to_string(),
            attributes: player.attributes().clone(),
            area: player
                .area()
                .and_then(|a| world.registry().area(a))
                .map(|a| a.name().to_string()),
            attack: player.attack().cloned(),
            behaviors: player
                .behaviors()
                .iter()
                .map(|b| BehaviorRecord {
                    kind: b.kind.name().to_string(),
                    config: b.config.value().to_string(),
                })
                .collect(),
        }
    }

    /// Recreate the player in `world`. A player saved dead comes back at full health.
    ///
    /// Behaviors are built before the player is inserted, so a failure leaves the world as
    /// it was.
    pub fn restore(&self, world: &mut World) -> ConfigResult<EntityId> {
        let mut attributes = self.attributes.clone();
        if let Ok(health) = attributes.get_mut(HEALTH) {
            if health.is_depleted() {
                health.set_to_max();
            }
        }

        let mut player = Entity::new(self.id, self.name.as_str(), EntityKind::Player, attributes);
        player.set_attack(self.attack.clone());
        for behavior in &self.behaviors {
            let value = serde_json::from_str(&behavior.config).map_err(|e| {
                ConfigurationError::InvalidConfig {
                    behavior: behavior.kind.clone(),
                    reason: e.to_string(),
                }
            })?;
            let attachment = world
                .behaviors()
                .instantiate(&behavior.kind, BehaviorConfig::new(value))?;
            player.attach(attachment)?;
        }

        let area = self.area.as_deref().and_then(|name| {
            let found = world.registry().area_named(name);
            if found.is_none() {
                log::warn!("Player {} saved in unknown area '{}'", self.id, name);
            }
            found
        });

        let id = world.insert(player)?;
        if let Some(area) = area {
            world.place(id, area)?;
        }
        Ok(id)
    }
}

/// Capture every player in the world, live or dead, in id order
pub fn snapshot_players(world: &World) -> Vec<PlayerRecord> {
    world
        .registry()
        .iter()
        .filter(|e| e.is_player())
        .map(|p| PlayerRecord::capture(world, p))
        .collect()
}
