//! Named-event emitter standing in for the router's transition notifications.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use tracing::{debug, warn};

/// Emitted once per completed navigation transition.
pub const ROUTE_CHANGE_SUCCESS: &str = "route_change_success";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Read-only count of how many times one event has started emitting.
///
/// The count is bumped before any listener runs, so anything stamped with
/// the current reading during an emit compares equal to that emit.
#[derive(Debug, Clone, Default)]
pub struct EmitClock(Rc<Cell<u64>>);

impl EmitClock {
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    /// Whether both handles read the same event on the same bus.
    pub fn same_as(&self, other: &EmitClock) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

type Listener = Rc<RefCell<dyn FnMut()>>;

struct Subscription {
    id: SubscriptionId,
    event: String,
    listener: Listener,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    subscriptions: Vec<Subscription>,
    clocks: HashMap<String, EmitClock>,
}

/// Listeners run synchronously inside [`TransitionBus::emit`], in
/// subscription order.
#[derive(Clone, Default)]
pub struct TransitionBus {
    inner: Rc<RefCell<BusState>>,
}

impl TransitionBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event: &str, listener: impl FnMut() + 'static) -> SubscriptionId {
        let mut state = self.inner.borrow_mut();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.subscriptions.push(Subscription {
            id,
            event: event.to_string(),
            listener: Rc::new(RefCell::new(listener)),
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.inner.borrow_mut();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|subscription| subscription.id != id);
        state.subscriptions.len() != before
    }

    pub fn clock(&self, event: &str) -> EmitClock {
        self.inner
            .borrow_mut()
            .clocks
            .entry(event.to_string())
            .or_default()
            .clone()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .borrow()
            .subscriptions
            .iter()
            .filter(|subscription| subscription.event == event)
            .count()
    }

    /// Notifies every listener of `event`. Returns how many ran.
    pub fn emit(&self, event: &str) -> usize {
        let clock = self.clock(event);
        clock.0.set(clock.0.get() + 1);

        let listeners: Vec<Listener> = self
            .inner
            .borrow()
            .subscriptions
            .iter()
            .filter(|subscription| subscription.event == event)
            .map(|subscription| subscription.listener.clone())
            .collect();

        let mut notified = 0;
        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut listener) => {
                    (&mut *listener)();
                    notified += 1;
                }
                Err(_) => warn!(event, "listener re-entered its own event; skipped"),
            }
        }
        debug!(event, listeners = notified, "event emitted");
        notified
    }

    pub fn emit_transition(&self) -> usize {
        self.emit(ROUTE_CHANGE_SUCCESS)
    }
}
