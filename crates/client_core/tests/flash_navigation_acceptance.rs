use std::{
    collections::HashMap,
    rc::Rc,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use client_core::{
    BusyIndicator, Chain, FlashQueue, HttpBoundary, HttpPipeline, LogInterceptor, Scheduler,
    TransitionBus, Transport,
};
use serde_json::json;
use shared::{Method, RequestConfig, ResponseEnvelope};
use tokio::task::LocalSet;

#[derive(Default)]
struct MemoryTransport {
    items: Mutex<HashMap<String, serde_json::Value>>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn execute(&self, config: RequestConfig) -> Result<ResponseEnvelope, ResponseEnvelope> {
        let mut items = self.items.lock().expect("items lock");
        match config.method {
            Method::Put => {
                let body = config.body.clone().unwrap_or_default();
                items.insert(config.url.clone(), body.clone());
                Ok(ResponseEnvelope::new(200, body, config))
            }
            Method::Get => match items.get(&config.url) {
                Some(item) => Ok(ResponseEnvelope::new(200, item.clone(), config)),
                None => Err(ResponseEnvelope::new(404, json!(null), config)),
            },
            _ => Err(ResponseEnvelope::new(405, json!(null), config)),
        }
    }
}

#[tokio::test]
async fn save_then_navigate_shows_notice_exactly_once() {
    LocalSet::new()
        .run_until(async {
            let scheduler = Scheduler::new();
            tokio::task::spawn_local(scheduler.clone().run());

            let routes = TransitionBus::new();
            let flash = FlashQueue::new();
            flash.subscribe(&routes).expect("subscribe flash queue");

            let busy = BusyIndicator::new();
            let pipeline = HttpPipeline::builder()
                .push_shared(Rc::new(busy.clone()))
                .push(LogInterceptor)
                .build();
            let http = HttpBoundary::new(
                &scheduler,
                Arc::new(MemoryTransport::default()),
                pipeline,
            );

            let notice = flash.clone();
            let navigation = routes.clone();
            let saved = http
                .put("projects/1", json!({ "name": "apollo" }))
                .map(move |response| {
                    notice.enqueue(format!("Saved {}", response.data["name"]));
                    navigation.emit_transition();
                    response.status
                });
            assert!(busy.is_busy());
            assert_eq!(saved.await, Ok(200));
            assert!(!busy.is_busy());
            assert_eq!(flash.current_message(), "Saved \"apollo\"");

            routes.emit_transition();
            assert_eq!(flash.current_message(), "");

            let notice = flash.clone();
            let missing = http.get("projects/2").or_else(move |reason| {
                notice.enqueue(format!("Project not found ({})", reason.status));
                Chain::Reject(reason)
            });
            let rejection = missing.await.expect_err("unknown project");
            assert_eq!(rejection.status, 404);
            assert_eq!(flash.current_message(), "");

            routes.emit_transition();
            assert_eq!(flash.current_message(), "Project not found (404)");
        })
        .await;
}
