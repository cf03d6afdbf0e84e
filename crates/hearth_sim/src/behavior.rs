//! Behavior registry
//!
//! A behavior is a named bundle of event handlers. Content registers a factory per behavior
//! kind at startup; attaching a behavior to an entity runs the factory once with that
//! attachment's config and stores the resulting listener table on the entity.
//!
//! Configs are immutable: [`BehaviorConfig`] exposes no mutation and shares one frozen JSON
//! value between every handler invocation of that attachment.

use crate::damage::Damage;
use crate::dispatch::BehaviorContext;
use crate::error::{ConfigResult, ConfigurationError, HandlerResult};
use crate::event::{Event, EventKind};
use core::fmt;
use hearth_core::EntityId;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of a behavior kind. Opaque to the core.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BehaviorKind(Box<str>);

impl BehaviorKind {
    /// Create a new behavior kind
    pub fn new(name: &str) -> Self {
        Self(name.into())
    }

    /// Get the kind name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BehaviorKind({:?})", self.0)
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BehaviorKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Frozen per-attachment configuration
#[derive(Clone, Debug, PartialEq)]
pub struct BehaviorConfig(Arc<Value>);

impl BehaviorConfig {
    /// Wrap a JSON value
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    /// An empty (null) config
    pub fn empty() -> Self {
        Self::new(Value::Null)
    }

    /// The raw JSON value
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Read one key. `None` when missing or of the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.0.get(key)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Read one key with a fallback
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Deserialize the whole config into a typed struct
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value().clone())
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for BehaviorConfig {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Type-erased handler stored in a listener table
pub type Handler =
    Arc<dyn Fn(&mut BehaviorContext<'_>, &BehaviorConfig, &Event) -> HandlerResult + Send + Sync>;

/// Handler table produced by a behavior factory, one handler per event kind
#[derive(Clone, Default)]
pub struct Listeners {
    handlers: BTreeMap<EventKind, Handler>,
}

impl Listeners {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    fn insert<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(&mut BehaviorContext<'_>, &BehaviorConfig, &Event) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Handle `updateTick`
    pub fn on_update_tick<F>(self, f: F) -> Self
    where
        F: Fn(&mut BehaviorContext<'_>, &BehaviorConfig) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(EventKind::UpdateTick, move |ctx, config, _| f(ctx, config))
    }

    /// Handle `hit(damage, target)`
    pub fn on_hit<F>(self, f: F) -> Self
    where
        F: Fn(&mut BehaviorContext<'_>, &BehaviorConfig, &Damage, EntityId) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.insert(EventKind::Hit, move |ctx, config, event| match event {
            Event::Hit { damage, target } => f(ctx, config, damage, *target),
            _ => Ok(()),
        })
    }

    /// Handle `damaged(damage)`
    pub fn on_damaged<F>(self, f: F) -> Self
    where
        F: Fn(&mut BehaviorContext<'_>, &BehaviorConfig, &Damage) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.insert(EventKind::Damaged, move |ctx, config, event| match event {
            Event::Damaged { damage } => f(ctx, config, damage),
            _ => Ok(()),
        })
    }

    /// Handle `killed(killer)`
    pub fn on_killed<F>(self, f: F) -> Self
    where
        F: Fn(&mut BehaviorContext<'_>, &BehaviorConfig, Option<EntityId>) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.insert(EventKind::Killed, move |ctx, config, event| match event {
            Event::Killed { killer } => f(ctx, config, *killer),
            _ => Ok(()),
        })
    }

    /// Handle `deathblow(target)`
    pub fn on_deathblow<F>(self, f: F) -> Self
    where
        F: Fn(&mut BehaviorContext<'_>, &BehaviorConfig, EntityId) -> HandlerResult
            + Send
            + Sync
            + 'static,
    {
        self.insert(EventKind::Deathblow, move |ctx, config, event| match event {
            Event::Deathblow { target } => f(ctx, config, *target),
            _ => Ok(()),
        })
    }

    /// Handle `combatStart`
    pub fn on_combat_start<F>(self, f: F) -> Self
    where
        F: Fn(&mut BehaviorContext<'_>, &BehaviorConfig) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(EventKind::CombatStart, move |ctx, config, _| f(ctx, config))
    }

    /// Handle `combatEnd`
    pub fn on_combat_end<F>(self, f: F) -> Self
    where
        F: Fn(&mut BehaviorContext<'_>, &BehaviorConfig) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(EventKind::CombatEnd, move |ctx, config, _| f(ctx, config))
    }

    /// Handle `regenStart`
    pub fn on_regen_start<F>(self, f: F) -> Self
    where
        F: Fn(&mut BehaviorContext<'_>, &BehaviorConfig) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(EventKind::RegenStart, move |ctx, config, _| f(ctx, config))
    }

    /// Handle `regenEnd`
    pub fn on_regen_end<F>(self, f: F) -> Self
    where
        F: Fn(&mut BehaviorContext<'_>, &BehaviorConfig) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(EventKind::RegenEnd, move |ctx, config, _| f(ctx, config))
    }

    /// Handler for an event kind
    pub fn handler(&self, kind: EventKind) -> Option<&Handler> {
        self.handlers.get(&kind)
    }

    /// Whether this table handles the event kind
    pub fn handles(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Handled event kinds
    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.handlers.keys().copied()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Builds the listener table for one attachment's config
pub type BehaviorFactory = Arc<dyn Fn(&BehaviorConfig) -> ConfigResult<Listeners> + Send + Sync>;

/// One behavior attached to one entity
#[derive(Clone, Debug)]
pub struct BehaviorAttachment {
    pub kind: BehaviorKind,
    pub config: BehaviorConfig,
    pub listeners: Arc<Listeners>,
}

/// Central registry mapping behavior kinds to factories.
///
/// Filled once at startup from the content bundles, then shared read-only by the world.
#[derive(Default)]
pub struct BehaviorRegistry {
    factories: BTreeMap<BehaviorKind, BehaviorFactory>,
}

impl BehaviorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for a behavior kind
    pub fn register<F>(&mut self, kind: &str, factory: F) -> ConfigResult<()>
    where
        F: Fn(&BehaviorConfig) -> ConfigResult<Listeners> + Send + Sync + 'static,
    {
        self.register_factory(BehaviorKind::new(kind), Arc::new(factory))
    }

    /// Register an already boxed factory
    pub fn register_factory(
        &mut self,
        kind: BehaviorKind,
        factory: BehaviorFactory,
    ) -> ConfigResult<()> {
        if self.factories.contains_key(&kind) {
            return Err(ConfigurationError::DuplicateBehavior(kind.name().to_string()));
        }
        log::debug!("Registered behavior '{}'", kind);
        self.factories.insert(kind, factory);
        Ok(())
    }

    /// Register every `(kind, factory)` pair supplied by a content bundle
    pub fn register_bundle<I>(&mut self, bundle: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = (BehaviorKind, BehaviorFactory)>,
    {
        for (kind, factory) in bundle {
            self.register_factory(kind, factory)?;
        }
        Ok(())
    }

    /// Whether a kind is known
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(&BehaviorKind::new(kind))
    }

    /// Build the attachment for `kind` with `config`
    pub fn instantiate(&self, kind: &str, config: BehaviorConfig) -> ConfigResult<BehaviorAttachment> {
        let kind = BehaviorKind::new(kind);
        let factory = self
            .factories
            .get(&kind)
            .ok_or_else(|| ConfigurationError::UnknownBehavior(kind.name().to_string()))?;
        let listeners = factory(&config)?;
        Ok(BehaviorAttachment {
            kind,
            config,
            listeners: Arc::new(listeners),
        })
    }

    /// Registered kinds in name order
    pub fn kinds(&self) -> impl Iterator<Item = &BehaviorKind> {
        self.factories.keys()
    }

    /// Number of registered kinds
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
