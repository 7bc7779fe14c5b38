//! One-shot notices delivered on navigation transitions.
//!
//! Producers [`FlashQueue::enqueue`] messages at any time. Each observed
//! transition moves exactly one pending message into the current slot, or
//! clears the slot when nothing is pending. A message queued after a
//! transition has started, including by another listener of that same
//! transition, is only ever shown by a later one.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use thiserror::Error;
use tracing::debug;

use crate::navigation::{EmitClock, SubscriptionId, TransitionBus, ROUTE_CHANGE_SUCCESS};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    #[error("flash queue is already subscribed to transition events")]
    AlreadySubscribed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashStatus {
    Idle,
    Showing,
}

#[derive(Debug)]
struct Pending {
    /// Transition clock reading when the message was queued.
    queued_at: u64,
    message: String,
}

#[derive(Debug)]
struct Subscribed {
    id: SubscriptionId,
    clock: EmitClock,
}

#[derive(Debug, Default)]
struct FlashState {
    pending: VecDeque<Pending>,
    current: Option<String>,
    subscription: Option<Subscribed>,
}

impl FlashState {
    fn now(&self) -> u64 {
        self.subscription
            .as_ref()
            .map_or(0, |subscribed| subscribed.clock.now())
    }

    /// Moves the oldest message queued strictly before transition `at` into
    /// the slot, or clears the slot.
    fn advance(&mut self, at: u64) {
        let eligible = self
            .pending
            .front()
            .is_some_and(|pending| pending.queued_at < at);
        self.current = if eligible {
            self.pending.pop_front().map(|pending| pending.message)
        } else {
            None
        };
        debug!(
            showing = self.current.is_some(),
            pending = self.pending.len(),
            "flash slot advanced"
        );
    }

    /// Readings from a previous bus mean nothing on the next one.
    fn restamp(&mut self) {
        for pending in &mut self.pending {
            pending.queued_at = 0;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlashQueue {
    inner: Rc<RefCell<FlashState>>,
}

impl FlashQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, message: impl Into<String>) {
        let mut state = self.inner.borrow_mut();
        let queued_at = state.now();
        state.pending.push_back(Pending {
            queued_at,
            message: message.into(),
        });
        debug!(pending = state.pending.len(), "flash message queued");
    }

    /// The message on display, or an empty string.
    pub fn current_message(&self) -> String {
        self.inner.borrow().current.clone().unwrap_or_default()
    }

    pub fn status(&self) -> FlashStatus {
        match self.inner.borrow().current {
            Some(_) => FlashStatus::Showing,
            None => FlashStatus::Idle,
        }
    }

    pub fn pending_len(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Advances by one transition happening now, outside any bus emit. Every
    /// message queued so far is eligible.
    pub fn on_transition(&self) {
        self.inner.borrow_mut().advance(u64::MAX);
    }

    /// Starts advancing on every `ROUTE_CHANGE_SUCCESS` emitted by `bus`.
    pub fn subscribe(&self, bus: &TransitionBus) -> Result<SubscriptionId, FlashError> {
        if self.inner.borrow().subscription.is_some() {
            return Err(FlashError::AlreadySubscribed);
        }
        let clock = bus.clock(ROUTE_CHANGE_SUCCESS);
        let queue = self.clone();
        let listener_clock = clock.clone();
        let id = bus.subscribe(ROUTE_CHANGE_SUCCESS, move || {
            queue.inner.borrow_mut().advance(listener_clock.now());
        });

        let mut state = self.inner.borrow_mut();
        state.restamp();
        state.subscription = Some(Subscribed { id, clock });
        Ok(id)
    }

    /// Stops following `bus`, also when the listener was already removed
    /// through [`TransitionBus::unsubscribe`]. Returns `false` when the queue
    /// was not subscribed to `bus`. Pending messages stay queued.
    pub fn unsubscribe(&self, bus: &TransitionBus) -> bool {
        let bus_clock = bus.clock(ROUTE_CHANGE_SUCCESS);
        let mut state = self.inner.borrow_mut();
        let id = match &state.subscription {
            Some(subscribed) if subscribed.clock.same_as(&bus_clock) => subscribed.id,
            _ => return false,
        };
        state.subscription = None;
        bus.unsubscribe(id);
        state.restamp();
        true
    }
}
