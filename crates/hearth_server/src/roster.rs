//! World roster
//!
//! The areas and NPCs a server starts with, declared in TOML:
//!
//! ```toml
//! [[area]]
//! name = "forest"
//!
//! [[entity]]
//! name = "wolf"
//! area = "forest"
//! count = 2
//! attributes = { health = 20, critical = 10 }
//! attack = { amount = 4, interval_ticks = 2 }
//! behaviors = [
//!     { kind = "combat" },
//!     { kind = "aggro", config = { players = true } },
//! ]
//! ```

use crate::error::{RosterError, RosterResult};
use hearth_core::{AreaId, Attributes};
use hearth_sim::{AttackProfile, BehaviorConfig, EntityKind, World};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// An area to create
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AreaSpec {
    pub name: String,
    /// Dormant areas are skipped by the world tick
    #[serde(default = "default_live")]
    pub live: bool,
}

fn default_live() -> bool {
    true
}

/// A behavior to attach, with its config as written in the roster
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BehaviorSpec {
    pub kind: String,
    #[serde(default)]
    pub config: Option<toml::Value>,
}

impl BehaviorSpec {
    fn to_config(&self, entity: &str) -> RosterResult<BehaviorConfig> {
        let value = match &self.config {
            Some(config) => {
                serde_json::to_value(config).map_err(|e| RosterError::BehaviorConfig {
                    entity: entity.to_string(),
                    behavior: self.kind.clone(),
                    reason: e.to_string(),
                })?
            }
            None => Value::Null,
        };
        Ok(BehaviorConfig::new(value))
    }
}

/// One entity template, spawned `count` times
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntitySpec {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: EntityKind,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub attributes: BTreeMap<String, i32>,
    #[serde(default)]
    pub attack: Option<AttackProfile>,
    #[serde(default)]
    pub behaviors: Vec<BehaviorSpec>,
}

fn default_kind() -> EntityKind {
    EntityKind::Npc
}

fn default_count() -> u32 {
    1
}

/// What [`Roster::populate`] created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterSummary {
    pub areas: usize,
    pub entities: usize,
}

/// Parsed roster file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Roster {
    #[serde(rename = "area")]
    pub areas: Vec<AreaSpec>,
    #[serde(rename = "entity")]
    pub entities: Vec<EntitySpec>,
}

impl Roster {
    /// Load a roster from a TOML file
    pub fn load(path: &Path) -> RosterResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RosterError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a roster from TOML text
    pub fn from_toml(content: &str) -> RosterResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Create every area and entity in `world`.
    ///
    /// Area references are checked before anything is created, so a roster naming an
    /// unknown area leaves the world untouched.
    pub fn populate(&self, world: &mut World) -> RosterResult<RosterSummary> {
        let mut declared = HashSet::new();
        for area in &self.areas {
            if !declared.insert(area.name.as_str())
                || world.registry().area_named(&area.name).is_some()
            {
                return Err(RosterError::DuplicateArea(area.name.clone()));
            }
        }
        for entity in &self.entities {
            if let Some(area) = &entity.area {
                if !declared.contains(area.as_str()) && world.registry().area_named(area).is_none() {
                    return Err(RosterError::UnknownArea {
                        entity: entity.name.clone(),
                        area: area.clone(),
                    });
                }
            }
        }

        let mut summary = RosterSummary::default();
        for spec in &self.areas {
            let id = world.add_area(&spec.name);
            if !spec.live {
                world.registry_mut().set_area_live(id, false)?;
            }
            summary.areas += 1;
        }

        for spec in &self.entities {
            let area = spec
                .area
                .as_deref()
                .and_then(|name| world.registry().area_named(name));
            for _ in 0..spec.count {
                spawn(world, spec, area)?;
                summary.entities += 1;
            }
        }

        log::info!(
            "Roster loaded: {} areas, {} entities",
            summary.areas,
            summary.entities
        );
        Ok(summary)
    }
}

fn spawn(world: &mut World, spec: &EntitySpec, area: Option<AreaId>) -> RosterResult<()> {
    let mut attributes = Attributes::new();
    for (name, base) in &spec.attributes {
        attributes
            .add(name, *base)
            .map_err(|source| RosterError::Attribute {
                entity: spec.name.clone(),
                source,
            })?;
    }

    let id = world.spawn(&spec.name, spec.kind, attributes);
    if let Some(entity) = world.entity_mut(id) {
        entity.set_attack(spec.attack.clone());
    }
    for behavior in &spec.behaviors {
        let config = behavior.to_config(&spec.name)?;
        world.attach_behavior(id, &behavior.kind, config)?;
    }
    if let Some(area) = area {
        world.place(id, area)?;
    }
    log::debug!("Spawned {} as {}", spec.name, id);
    Ok(())
}
