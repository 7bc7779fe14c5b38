//! Asynchronous result composition for client-side remote data access.
//!
//! - [`Scheduler`] runs continuations cooperatively on one thread.
//! - [`Deferred`] / [`Promise`] model one-shot outcomes with chaining.
//! - [`wait_all`], [`race`] and [`timeout`] compose several promises.
//! - [`Pipeline`] wraps every operation crossing an [`HttpBoundary`] with
//!   ordered interceptors.
//! - [`FlashQueue`] relays one-shot notices across [`TransitionBus`]
//!   navigation events.

pub mod boundary;
pub mod combinator;
pub mod flash;
pub mod interceptor;
pub mod navigation;
pub mod promise;
pub mod scheduler;
pub mod transport;

pub use boundary::{HttpBoundary, HttpPipeline, HttpPromise};
pub use combinator::{race, timeout, wait_all};
pub use flash::{FlashError, FlashQueue, FlashStatus};
pub use interceptor::{
    BusyIndicator, FnInterceptor, Interceptor, LogInterceptor, Pipeline, PipelineBuilder,
};
pub use navigation::{EmitClock, SubscriptionId, TransitionBus, ROUTE_CHANGE_SUCCESS};
pub use promise::{Chain, Deferred, Promise, PromiseState, Settled};
pub use scheduler::Scheduler;
pub use transport::{ReqwestTransport, Transport};

#[cfg(test)]
mod tests;
