//! Event dispatch
//!
//! Delivers one event to every behavior attached to one entity, in attachment order.
//!
//! - A handler that fails or panics is logged with the entity, behavior and event; the
//!   remaining handlers still run.
//! - A handler that re-dispatches the same event kind onto the entity it is handling, directly
//!   or through a chain of other dispatches, is stopped with
//!   [`ConfigurationError::DispatchCycle`].
//! - Configuration errors raised inside a handler abort the dispatch and are returned.

use crate::behavior::BehaviorAttachment;
use crate::entity::Entity;
use crate::error::{ConfigResult, ConfigurationError, HandlerError};
use crate::event::{Event, EventKind};
use crate::world::World;
use hearth_core::EntityId;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// What a handler sees: the world and the entity the event was delivered to
pub struct BehaviorContext<'w> {
    world: &'w mut World,
    this: EntityId,
}

impl<'w> BehaviorContext<'w> {
    /// Context for handlers running on `this`
    pub fn new(world: &'w mut World, this: EntityId) -> Self {
        Self { world, this }
    }

    /// The entity the event was delivered to
    pub fn this(&self) -> EntityId {
        self.this
    }

    /// The receiving entity, if it still exists
    pub fn entity(&self) -> Option<&Entity> {
        self.world.entity(self.this)
    }

    /// The receiving entity, mutably
    pub fn entity_mut(&mut self) -> Option<&mut Entity> {
        self.world.entity_mut(self.this)
    }

    pub fn world(&self) -> &World {
        self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.world
    }

    /// Send an event to another entity (or this one)
    pub fn dispatch(&mut self, target: EntityId, event: Event) -> ConfigResult<()> {
        dispatch(self.world, target, event)
    }
}

/// Deliver `event` to `target`'s behaviors.
///
/// Unknown entities and entities without a matching handler are a no-op.
pub fn dispatch(world: &mut World, target: EntityId, event: Event) -> ConfigResult<()> {
    let kind = event.kind();
    let attachments: Vec<BehaviorAttachment> = match world.entity(target) {
        Some(entity) => entity
            .behaviors()
            .iter()
            .filter(|b| b.listeners.handles(kind))
            .cloned()
            .collect(),
        None => {
            log::trace!("Dropping '{}' for missing {}", kind, target);
            return Ok(());
        }
    };
    if attachments.is_empty() {
        return Ok(());
    }

    if !world.in_flight.insert((target, kind)) {
        return Err(ConfigurationError::DispatchCycle {
            entity: target,
            event: kind,
        });
    }
    let result = run_handlers(world, target, kind, &event, &attachments);
    world.in_flight.remove(&(target, kind));
    result
}

fn run_handlers(
    world: &mut World,
    target: EntityId,
    kind: EventKind,
    event: &Event,
    attachments: &[BehaviorAttachment],
) -> ConfigResult<()> {
    for attachment in attachments {
        let Some(handler) = attachment.listeners.handler(kind) else {
            continue;
        };

        let mut ctx = BehaviorContext::new(world, target);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            handler(&mut ctx, &attachment.config, event)
        }))
        .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(&payload))));

        if let Err(err) = outcome {
            if let Some(config) = err.as_configuration() {
                return Err(config.clone());
            }
            log::error!(
                "Behavior '{}' on {} failed handling {:?}: {}",
                attachment.kind,
                target,
                event,
                err
            );
        }
    }
    Ok(())
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{BehaviorConfig, BehaviorRegistry, Listeners};
    use crate::entity::EntityKind;
    use crate::world::WorldSettings;
    use hearth_core::Attributes;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, label: &'static str) -> Listeners {
        let log = log.clone();
        Listeners::new().on_update_tick(move |_, _| {
            log.lock().push(label.to_string());
            Ok(())
        })
    }

    #[test]
    fn test_handlers_run_in_attachment_order() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BehaviorRegistry::new();
        for label in ["first", "second", "third"] {
            let log = log.clone();
            registry
                .register(label, move |_| Ok(recorder(&log, label)))
                .unwrap();
        }

        let mut world = World::new(Arc::new(registry), WorldSettings::default());
        let rat = world.spawn("rat", EntityKind::Npc, Attributes::new());
        for label in ["second", "first", "third"] {
            world.attach_behavior(rat, label, BehaviorConfig::empty()).unwrap();
        }

        world.dispatch(rat, Event::UpdateTick).unwrap();
        assert_eq!(*log.lock(), vec!["second", "first", "third"]);
    }

    #[test]
    fn test_no_behaviors_is_noop() {
        let mut world = World::new(Arc::new(BehaviorRegistry::new()), WorldSettings::default());
        let rat = world.spawn("rat", EntityKind::Npc, Attributes::new());
        assert!(world.dispatch(rat, Event::UpdateTick).is_ok());
        assert!(world.dispatch(EntityId::from_raw(77), Event::CombatEnd).is_ok());
    }

    #[test]
    fn test_failing_handler_does_not_stop_others() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BehaviorRegistry::new();
        registry
            .register("broken", |_| {
                Ok(Listeners::new().on_update_tick(|_, _| Err(HandlerError::failed("boom"))))
            })
            .unwrap();
        registry
            .register("panicky", |_| {
                Ok(Listeners::new().on_update_tick(|_, _| panic!("handler exploded")))
            })
            .unwrap();
        {
            let log = log.clone();
            registry
                .register("ok", move |_| Ok(recorder(&log, "ok")))
                .unwrap();
        }

        let mut world = World::new(Arc::new(registry), WorldSettings::default());
        let rat = world.spawn("rat", EntityKind::Npc, Attributes::new());
        for kind in ["broken", "panicky", "ok"] {
            world.attach_behavior(rat, kind, BehaviorConfig::empty()).unwrap();
        }

        world.dispatch(rat, Event::UpdateTick).unwrap();
        assert_eq!(*log.lock(), vec!["ok"]);

        // Guard released after the panic
        world.dispatch(rat, Event::UpdateTick).unwrap();
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn test_self_redispatch_is_a_cycle() {
        let mut registry = BehaviorRegistry::new();
        registry
            .register("echo", |_| {
                Ok(Listeners::new().on_update_tick(|ctx, _| {
                    let this = ctx.this();
                    ctx.dispatch(this, Event::UpdateTick)?;
                    Ok(())
                }))
            })
            .unwrap();

        let mut world = World::new(Arc::new(registry), WorldSettings::default());
        let rat = world.spawn("rat", EntityKind::Npc, Attributes::new());
        world.attach_behavior(rat, "echo", BehaviorConfig::empty()).unwrap();

        assert_eq!(
            world.dispatch(rat, Event::UpdateTick),
            Err(ConfigurationError::DispatchCycle {
                entity: rat,
                event: EventKind::UpdateTick
            })
        );
        // Guard released after the error
        assert!(matches!(
            world.dispatch(rat, Event::UpdateTick),
            Err(ConfigurationError::DispatchCycle { .. })
        ));
    }

    #[test]
    fn test_indirect_cycle_through_second_entity() {
        let mut registry = BehaviorRegistry::new();
        registry
            .register("relay", |config| {
                let partner = EntityId::from_raw(config.get_or("partner", 0u64));
                Ok(Listeners::new().on_combat_start(move |ctx, _| {
                    ctx.dispatch(partner, Event::CombatStart)?;
                    Ok(())
                }))
            })
            .unwrap();

        let mut world = World::new(Arc::new(registry), WorldSettings::default());
        let a = world.spawn("a", EntityKind::Npc, Attributes::new());
        let b = world.spawn("b", EntityKind::Npc, Attributes::new());
        world
            .attach_behavior(a, "relay", BehaviorConfig::new(json!({ "partner": b.raw() })))
            .unwrap();
        world
            .attach_behavior(b, "relay", BehaviorConfig::new(json!({ "partner": a.raw() })))
            .unwrap();

        assert_eq!(
            world.dispatch(a, Event::CombatStart),
            Err(ConfigurationError::DispatchCycle {
                entity: a,
                event: EventKind::CombatStart
            })
        );
    }

    #[test]
    fn test_different_event_on_same_entity_is_allowed() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BehaviorRegistry::new();
        {
            let log = log.clone();
            registry
                .register("chain", move |_| {
                    let log = log.clone();
                    Ok(Listeners::new()
                        .on_update_tick(|ctx, _| {
                            let this = ctx.this();
                            ctx.dispatch(this, Event::RegenEnd)?;
                            Ok(())
                        })
                        .on_regen_end(move |_, _| {
                            log.lock().push("regenEnd".into());
                            Ok(())
                        }))
                })
                .unwrap();
        }

        let mut world = World::new(Arc::new(registry), WorldSettings::default());
        let rat = world.spawn("rat", EntityKind::Npc, Attributes::new());
        world.attach_behavior(rat, "chain", BehaviorConfig::empty()).unwrap();

        world.dispatch(rat, Event::UpdateTick).unwrap();
        assert_eq!(*log.lock(), vec!["regenEnd"]);
    }

    #[test]
    fn test_configs_are_per_attachment() {
        let seen: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BehaviorRegistry::new();
        {
            let seen = seen.clone();
            registry
                .register("counter", move |_| {
                    let seen = seen.clone();
                    Ok(Listeners::new().on_update_tick(move |_, config| {
                        seen.lock().push(config.get_or("step", 0u32));
                        Ok(())
                    }))
                })
                .unwrap();
        }

        let mut world = World::new(Arc::new(registry), WorldSettings::default());
        let a = world.spawn("a", EntityKind::Npc, Attributes::new());
        let b = world.spawn("b", EntityKind::Npc, Attributes::new());
        world
            .attach_behavior(a, "counter", BehaviorConfig::new(json!({ "step": 1 })))
            .unwrap();
        world
            .attach_behavior(b, "counter", BehaviorConfig::new(json!({ "step": 5 })))
            .unwrap();

        world.dispatch(a, Event::UpdateTick).unwrap();
        world.dispatch(b, Event::UpdateTick).unwrap();
        world.dispatch(a, Event::UpdateTick).unwrap();
        assert_eq!(*seen.lock(), vec![1, 5, 1]);
    }
}
