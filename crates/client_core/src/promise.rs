//! One-shot asynchronous outcomes: [`Deferred`] is the producer side,
//! [`Promise`] the read-only consumer side.
//!
//! A promise settles at most once. Continuations attached with [`Promise::then`]
//! (or one of its shorthands) run as jobs on the promise's [`Scheduler`], in
//! registration order, and never inside the call that settled the promise or
//! attached the continuation.
//!
//! A rejection that reaches the end of a chain without a rejection handler is
//! dropped. The only trace it leaves is a `debug` event when the last handle
//! to the rejected promise goes away, so chains whose failures matter must end
//! with [`Promise::or_else`] or a two-armed [`Promise::then`].

use std::{
    cell::{Cell, RefCell},
    future::{Future, IntoFuture},
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

use tracing::{debug, trace, warn};

use crate::scheduler::{Scheduler, WeakScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

impl PromiseState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, PromiseState::Pending)
    }
}

impl std::fmt::Display for PromiseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromiseState::Pending => f.write_str("pending"),
            PromiseState::Fulfilled => f.write_str("fulfilled"),
            PromiseState::Rejected => f.write_str("rejected"),
        }
    }
}

/// What a continuation hands to the promise returned by `then`.
///
/// `Follow` makes the downstream promise wait for another promise and adopt
/// its outcome.
pub enum Chain<T, E> {
    Fulfill(T),
    Reject(E),
    Follow(Promise<T, E>),
}

impl<T, E> From<Result<T, E>> for Chain<T, E> {
    fn from(outcome: Result<T, E>) -> Self {
        match outcome {
            Ok(value) => Chain::Fulfill(value),
            Err(reason) => Chain::Reject(reason),
        }
    }
}

impl<T, E> From<Promise<T, E>> for Chain<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Chain::Follow(promise)
    }
}

type Reaction<T, E> = Box<dyn FnOnce(Result<T, E>)>;

enum State<T, E> {
    Pending(Vec<Reaction<T, E>>),
    Settled(Result<T, E>),
}

struct Shared<T, E> {
    state: RefCell<State<T, E>>,
    wakers: RefCell<Vec<Waker>>,
    handled: Cell<bool>,
    scheduler: WeakScheduler,
}

impl<T, E> Drop for Shared<T, E> {
    fn drop(&mut self) {
        if !self.handled.get() && matches!(self.state.get_mut(), State::Settled(Err(_))) {
            debug!("rejected promise dropped without a rejection handler");
        }
    }
}

pub struct Promise<T, E> {
    shared: Rc<Shared<T, E>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

/// Settlement authority for exactly one promise. Only the first `resolve`,
/// `reject` or `settle` call has any effect.
pub struct Deferred<T, E> {
    shared: Rc<Shared<T, E>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Deferred<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub fn new(scheduler: &Scheduler) -> (Self, Promise<T, E>) {
        Self::on(scheduler.downgrade())
    }

    fn on(scheduler: WeakScheduler) -> (Self, Promise<T, E>) {
        let shared = Rc::new(Shared {
            state: RefCell::new(State::Pending(Vec::new())),
            wakers: RefCell::new(Vec::new()),
            handled: Cell::new(false),
            scheduler,
        });
        (
            Self {
                shared: shared.clone(),
            },
            Promise { shared },
        )
    }

    pub fn promise(&self) -> Promise<T, E> {
        Promise {
            shared: self.shared.clone(),
        }
    }

    pub fn resolve(&self, value: T) {
        self.settle(Ok(value));
    }

    pub fn reject(&self, reason: E) {
        self.settle(Err(reason));
    }

    pub fn is_settled(&self) -> bool {
        matches!(*self.shared.state.borrow(), State::Settled(_))
    }

    pub fn settle(&self, outcome: Result<T, E>) {
        let reactions = {
            let mut state = self.shared.state.borrow_mut();
            let reactions = match &mut *state {
                State::Settled(_) => {
                    trace!("ignoring settlement of an already settled promise");
                    return;
                }
                State::Pending(reactions) => std::mem::take(reactions),
            };
            *state = State::Settled(outcome.clone());
            reactions
        };

        for reaction in reactions {
            let outcome = outcome.clone();
            self.shared.scheduler.schedule(move || reaction(outcome));
        }

        let wakers = std::mem::take(&mut *self.shared.wakers.borrow_mut());
        for waker in wakers {
            waker.wake();
        }
    }

    /// Settles from a continuation's result, waiting on `Chain::Follow`.
    pub(crate) fn adopt(&self, chain: Chain<T, E>) {
        match chain {
            Chain::Fulfill(value) => self.resolve(value),
            Chain::Reject(reason) => self.reject(reason),
            Chain::Follow(inner) => {
                if Rc::ptr_eq(&inner.shared, &self.shared) {
                    warn!("promise told to follow itself; it will stay pending");
                    return;
                }
                let deferred = self.clone();
                inner.subscribe(move |outcome| deferred.settle(outcome));
            }
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub fn state(&self) -> PromiseState {
        match &*self.shared.state.borrow() {
            State::Pending(_) => PromiseState::Pending,
            State::Settled(Ok(_)) => PromiseState::Fulfilled,
            State::Settled(Err(_)) => PromiseState::Rejected,
        }
    }

    /// The settled outcome, or `None` while pending. Does not count as
    /// handling a rejection.
    pub fn outcome(&self) -> Option<Result<T, E>> {
        match &*self.shared.state.borrow() {
            State::Pending(_) => None,
            State::Settled(outcome) => Some(outcome.clone()),
        }
    }

    /// The scheduler continuations run on, or `None` once every handle to it
    /// has been dropped.
    pub fn scheduler(&self) -> Option<Scheduler> {
        self.shared.scheduler.upgrade()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// Registers a raw reaction. It runs on a later scheduler turn, exactly once.
    pub(crate) fn subscribe(&self, reaction: impl FnOnce(Result<T, E>) + 'static) {
        self.shared.handled.set(true);
        let mut state = self.shared.state.borrow_mut();
        match &mut *state {
            State::Pending(reactions) => reactions.push(Box::new(reaction)),
            State::Settled(outcome) => {
                let outcome = outcome.clone();
                self.shared.scheduler.schedule(move || reaction(outcome));
            }
        }
    }

    fn react<U, E2>(
        &self,
        handler: impl FnOnce(Result<T, E>) -> Chain<U, E2> + 'static,
    ) -> Promise<U, E2>
    where
        U: Clone + 'static,
        E2: Clone + 'static,
    {
        let (deferred, promise) = Deferred::on(self.shared.scheduler.clone());
        self.subscribe(move |outcome| deferred.adopt(handler(outcome)));
        promise
    }

    pub fn then<U, E2, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E2>
    where
        U: Clone + 'static,
        E2: Clone + 'static,
        F: FnOnce(T) -> Chain<U, E2> + 'static,
        R: FnOnce(E) -> Chain<U, E2> + 'static,
    {
        self.react(move |outcome| match outcome {
            Ok(value) => on_fulfilled(value),
            Err(reason) => on_rejected(reason),
        })
    }

    /// `then` without a rejection handler: rejections pass through unchanged.
    pub fn and_then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Chain<U, E> + 'static,
    {
        self.then(on_fulfilled, Chain::Reject)
    }

    /// `then` without a fulfillment handler: values pass through unchanged.
    pub fn or_else<F>(&self, on_rejected: F) -> Promise<T, E>
    where
        F: FnOnce(E) -> Chain<T, E> + 'static,
    {
        self.then(Chain::Fulfill, on_rejected)
    }

    pub fn map<U, F>(&self, f: F) -> Promise<U, E>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> U + 'static,
    {
        self.and_then(move |value| Chain::Fulfill(f(value)))
    }

    pub fn map_err<E2, F>(&self, f: F) -> Promise<T, E2>
    where
        E2: Clone + 'static,
        F: FnOnce(E) -> E2 + 'static,
    {
        self.then(Chain::Fulfill, move |reason| Chain::Reject(f(reason)))
    }

    /// Runs `f` on either outcome and passes the outcome through.
    pub fn finally<F>(&self, f: F) -> Promise<T, E>
    where
        F: FnOnce() + 'static,
    {
        self.react(move |outcome| {
            f();
            Chain::from(outcome)
        })
    }
}

impl<T, E> std::fmt::Debug for Promise<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.state())
            .finish()
    }
}

/// Future returned by awaiting a [`Promise`].
pub struct Settled<T, E> {
    shared: Rc<Shared<T, E>>,
}

impl<T: Clone, E: Clone> Future for Settled<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let State::Settled(outcome) = &*self.shared.state.borrow() {
            return Poll::Ready(outcome.clone());
        }

        let mut wakers = self.shared.wakers.borrow_mut();
        if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
            wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T: Clone, E: Clone> IntoFuture for Promise<T, E> {
    type Output = Result<T, E>;
    type IntoFuture = Settled<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        self.shared.handled.set(true);
        Settled {
            shared: self.shared,
        }
    }
}
