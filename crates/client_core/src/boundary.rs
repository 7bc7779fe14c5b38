//! Adapter that routes every transport call through an interceptor pipeline.

use std::{cell::Cell, collections::BTreeMap, sync::Arc};

use serde_json::Value;
use shared::{RequestConfig, RequestId, ResponseEnvelope};
use tracing::debug;

use crate::{interceptor::Pipeline, promise::Promise, scheduler::Scheduler, transport::Transport};

pub type HttpPipeline = Pipeline<ResponseEnvelope, ResponseEnvelope>;
pub type HttpPromise = Promise<ResponseEnvelope, ResponseEnvelope>;

pub struct HttpBoundary {
    scheduler: Scheduler,
    transport: Arc<dyn Transport>,
    pipeline: HttpPipeline,
    default_headers: BTreeMap<String, String>,
    next_request_id: Cell<u64>,
}

impl HttpBoundary {
    pub fn new(
        scheduler: &Scheduler,
        transport: Arc<dyn Transport>,
        pipeline: HttpPipeline,
    ) -> Self {
        Self {
            scheduler: scheduler.clone(),
            transport,
            pipeline,
            default_headers: BTreeMap::new(),
            next_request_id: Cell::new(1),
        }
    }

    /// Header added to every request that does not set it itself.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn pipeline(&self) -> &HttpPipeline {
        &self.pipeline
    }

    /// Sends `config` through the transport. Must be called inside a tokio
    /// `LocalSet`.
    pub fn request(&self, mut config: RequestConfig) -> HttpPromise {
        let id = self.next_request_id.get();
        self.next_request_id.set(id + 1);
        config.request_id = RequestId(id);
        for (name, value) in &self.default_headers {
            config
                .headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }

        debug!(request_id = id, method = %config.method, url = %config.url, "dispatching request");
        let transport = self.transport.clone();
        self.intercept_with(|scheduler| {
            scheduler.spawn(async move { transport.execute(config).await })
        })
    }

    /// Passes a promise produced outside the transport through the pipeline.
    pub fn intercept(&self, raw: &HttpPromise) -> HttpPromise {
        self.intercept_with(|_| raw.clone())
    }

    fn intercept_with(&self, start: impl FnOnce(&Scheduler) -> HttpPromise) -> HttpPromise {
        self.pipeline.dispatch();
        let raw = start(&self.scheduler);
        self.pipeline.wrap(&raw)
    }

    pub fn get(&self, url: impl Into<String>) -> HttpPromise {
        self.request(RequestConfig::get(url))
    }

    pub fn post(&self, url: impl Into<String>, body: Value) -> HttpPromise {
        self.request(RequestConfig::post(url, body))
    }

    pub fn put(&self, url: impl Into<String>, body: Value) -> HttpPromise {
        self.request(RequestConfig::put(url, body))
    }

    pub fn delete(&self, url: impl Into<String>) -> HttpPromise {
        self.request(RequestConfig::delete(url))
    }
}
