//! Ordered before/after hooks wrapped around every operation that crosses a
//! boundary.
//!
//! A [`Pipeline`] is assembled once with [`PipelineBuilder`] and is immutable
//! afterwards. Hooks run in registration order. On each step the current
//! outcome decides which hook runs: a value goes to `on_success`, a reason to
//! `on_failure`. Either hook may flip the outcome, and later interceptors only
//! ever see the flipped one.

use std::{cell::Cell, rc::Rc};

use shared::ResponseEnvelope;
use tracing::{debug, info, warn};

use crate::promise::{Chain, Promise};

/// One interceptor. All hooks default to passing the payload through, so an
/// implementation only overrides what it needs.
///
/// A failure hook that returns `Ok` recovers the operation. The recovered
/// value has the success type `T`; for HTTP pipelines that is a
/// [`ResponseEnvelope`], built with [`ResponseEnvelope::recovered`] when only
/// raw data is at hand.
pub trait Interceptor<T, E> {
    /// Called when an operation enters the boundary, before the transport runs.
    fn on_dispatch(&self) {}

    fn on_success(&self, value: T) -> Result<T, E> {
        Ok(value)
    }

    fn on_failure(&self, reason: E) -> Result<T, E> {
        Err(reason)
    }
}

type SuccessHook<T, E> = Box<dyn Fn(T) -> Result<T, E>>;
type FailureHook<T, E> = Box<dyn Fn(E) -> Result<T, E>>;

/// Interceptor assembled from closures.
pub struct FnInterceptor<T, E> {
    on_success: Option<SuccessHook<T, E>>,
    on_failure: Option<FailureHook<T, E>>,
}

impl<T, E> Default for FnInterceptor<T, E> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_failure: None,
        }
    }
}

impl<T, E> FnInterceptor<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, hook: impl Fn(T) -> Result<T, E> + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    pub fn on_failure(mut self, hook: impl Fn(E) -> Result<T, E> + 'static) -> Self {
        self.on_failure = Some(Box::new(hook));
        self
    }
}

impl<T, E> Interceptor<T, E> for FnInterceptor<T, E> {
    fn on_success(&self, value: T) -> Result<T, E> {
        match &self.on_success {
            Some(hook) => hook(value),
            None => Ok(value),
        }
    }

    fn on_failure(&self, reason: E) -> Result<T, E> {
        match &self.on_failure {
            Some(hook) => hook(reason),
            None => Err(reason),
        }
    }
}

pub struct PipelineBuilder<T, E> {
    interceptors: Vec<Rc<dyn Interceptor<T, E>>>,
}

impl<T, E> Default for PipelineBuilder<T, E> {
    fn default() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }
}

impl<T, E> PipelineBuilder<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(self, interceptor: impl Interceptor<T, E> + 'static) -> Self {
        self.push_shared(Rc::new(interceptor))
    }

    /// Registers an interceptor the caller keeps a handle to.
    pub fn push_shared(mut self, interceptor: Rc<dyn Interceptor<T, E>>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn build(self) -> Pipeline<T, E> {
        Pipeline {
            interceptors: self.interceptors.into(),
        }
    }
}

pub struct Pipeline<T, E> {
    interceptors: Rc<[Rc<dyn Interceptor<T, E>>]>,
}

impl<T, E> Clone for Pipeline<T, E> {
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
        }
    }
}

impl<T, E> Default for Pipeline<T, E> {
    fn default() -> Self {
        PipelineBuilder::new().build()
    }
}

impl<T, E> Pipeline<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pub fn builder() -> PipelineBuilder<T, E> {
        PipelineBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Runs every `on_dispatch` hook in registration order.
    pub fn dispatch(&self) {
        for interceptor in self.interceptors.iter() {
            interceptor.on_dispatch();
        }
    }

    /// Returns a new promise carrying `raw`'s outcome after it has passed
    /// through every interceptor. `raw` itself is left untouched.
    pub fn wrap(&self, raw: &Promise<T, E>) -> Promise<T, E> {
        let mut current = raw.then(Chain::Fulfill, Chain::Reject);
        for interceptor in self.interceptors.iter() {
            let on_success = interceptor.clone();
            let on_failure = interceptor.clone();
            current = current.then::<T, E, _, _>(
                move |value| on_success.on_success(value).into(),
                move |reason| on_failure.on_failure(reason).into(),
            );
        }
        current
    }
}

/// Counts operations in flight; busy while the count is non-zero.
#[derive(Debug, Clone, Default)]
pub struct BusyIndicator {
    in_flight: Rc<Cell<usize>>,
}

impl BusyIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.get() > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    fn finish(&self) {
        self.in_flight.set(self.in_flight.get().saturating_sub(1));
        if !self.is_busy() {
            debug!("busy indicator cleared");
        }
    }
}

impl<T, E> Interceptor<T, E> for BusyIndicator {
    fn on_dispatch(&self) {
        self.in_flight.set(self.in_flight.get() + 1);
    }

    fn on_success(&self, value: T) -> Result<T, E> {
        self.finish();
        Ok(value)
    }

    fn on_failure(&self, reason: E) -> Result<T, E> {
        self.finish();
        Err(reason)
    }
}

/// Emits one tracing event per completed HTTP operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogInterceptor;

impl Interceptor<ResponseEnvelope, ResponseEnvelope> for LogInterceptor {
    fn on_success(&self, value: ResponseEnvelope) -> Result<ResponseEnvelope, ResponseEnvelope> {
        let config = &value.request_config;
        info!(
            request_id = %config.request_id,
            method = %config.method,
            url = %config.url,
            status = value.status,
            "request completed"
        );
        Ok(value)
    }

    fn on_failure(&self, reason: ResponseEnvelope) -> Result<ResponseEnvelope, ResponseEnvelope> {
        let config = &reason.request_config;
        warn!(
            request_id = %config.request_id,
            method = %config.method,
            url = %config.url,
            status = reason.status,
            code = ?reason.error_code(),
            "request failed"
        );
        Err(reason)
    }
}
