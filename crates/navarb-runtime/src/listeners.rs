#![forbid(unsafe_code)]

//! Outbound controller notifications.
//!
//! [`EventBus`] holds subscribers as weak references; the strong side lives
//! in the [`Subscription`] guard returned by [`EventBus::subscribe`].
//! Dropping the guard unsubscribes. Dead entries are pruned on the next emit.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. No internal borrow is held while a callback runs, so a callback may
//!    subscribe or emit.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use navarb_core::NavigationMode;
use serde::{Deserialize, Serialize};

/// Events the controller publishes to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControllerEvent {
    NavigationTypeChange {
        from: NavigationMode,
        to: NavigationMode,
        /// Width that triggered the change.
        breakpoint: u32,
        timestamp_ms: u64,
    },
    CollapseChange {
        collapsed: bool,
    },
    StateChange {
        sidebar_collapsed: bool,
        navigation_type: NavigationMode,
    },
    /// A navigation component asked to go somewhere.
    Navigate {
        route: String,
    },
}

type CallbackRc = Rc<dyn Fn(&ControllerEvent)>;
type CallbackWeak = Weak<dyn Fn(&ControllerEvent)>;

/// Fan-out of [`ControllerEvent`]s. Clones share subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Rc<RefCell<Vec<CallbackWeak>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. Keep the guard alive to stay subscribed.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&ControllerEvent) + 'static) -> Subscription {
        let strong: CallbackRc = Rc::new(callback);
        self.subscribers.borrow_mut().push(Rc::downgrade(&strong));
        Subscription { _guard: strong }
    }

    /// Deliver `event` to every live subscriber. Returns how many ran.
    pub fn emit(&self, event: &ControllerEvent) -> usize {
        let callbacks: Vec<CallbackRc> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|w| w.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }
}

/// RAII guard for a subscriber callback.
pub struct Subscription {
    _guard: CallbackRc,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn collapse(collapsed: bool) -> ControllerEvent {
        ControllerEvent::CollapseChange { collapsed }
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let a = {
            let log = Rc::clone(&log);
            bus.subscribe(move |_| log.borrow_mut().push("a"))
        };
        let b = {
            let log = Rc::clone(&log);
            bus.subscribe(move |_| log.borrow_mut().push("b"))
        };
        assert_eq!(bus.emit(&collapse(true)), 2);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        drop((a, b));
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let sub = {
            let hits = Rc::clone(&hits);
            bus.subscribe(move |_| hits.set(hits.get() + 1))
        };
        bus.emit(&collapse(false));
        drop(sub);
        assert_eq!(bus.emit(&collapse(false)), 0);
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn callback_may_subscribe_during_emit() {
        let bus = EventBus::new();
        let late: Rc<RefCell<Vec<Subscription>>> = Rc::default();
        let _sub = {
            let bus = bus.clone();
            let late = Rc::clone(&late);
            bus.clone().subscribe(move |_| late.borrow_mut().push(bus.subscribe(|_| {})))
        };
        bus.emit(&collapse(true));
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn serializes_with_event_tag() {
        let json = serde_json::to_value(ControllerEvent::Navigate {
            route: "/leave".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "navigate");
        assert_eq!(json["route"], "/leave");
    }
}
