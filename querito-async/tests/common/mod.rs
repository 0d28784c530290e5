#![allow(dead_code)]

use parking_lot::Mutex;
use querito_async::{
    async_trait, CacheConfig, InvalidationRegistry, ResourceCache, ResourceDef, Transport,
    TransportError, TransportRequest, TransportResponse,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_LATENCY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Value),
    Status(u16),
    Network,
    Panic,
}

/// Scripted transport: replies are consumed in call order; once the script
/// runs out every call succeeds with `{"call": n}`.
#[derive(Default)]
pub struct MockTransport {
    calls: AtomicUsize,
    script: Mutex<VecDeque<(Duration, Reply)>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, delay: Duration, reply: Reply) {
        self.script.lock().push_back((delay, reply));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push(request);
        let (delay, reply) = self
            .script
            .lock()
            .pop_front()
            .unwrap_or((DEFAULT_LATENCY, Reply::Ok(json!({ "call": call }))));

        tokio::time::sleep(delay).await;
        match reply {
            Reply::Ok(data) => Ok(TransportResponse::ok(data)),
            Reply::Status(status) => Ok(TransportResponse::failed(status, "scripted failure")),
            Reply::Network => Err(TransportError::new("connection reset")),
            Reply::Panic => panic!("transport crashed"),
        }
    }
}

/// Config with no background sweep and a fast retry.
pub fn config(name: &str) -> CacheConfig {
    CacheConfig::new(name)
        .with_gc_interval(None)
        .with_retry_delay(Duration::from_millis(200))
}

/// Routes cache logs to the test output; filter with `RUST_LOG=querito_async=trace`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn cache(transport: &Arc<MockTransport>, name: &str) -> ResourceCache {
    init_tracing();
    ResourceCache::init(config(name), transport.clone(), InvalidationRegistry::new())
        .expect("inside a runtime")
}

pub fn rewards() -> ResourceDef {
    ResourceDef::new("reward-list", "/reward")
}

pub fn kanji() -> ResourceDef {
    ResourceDef::new("kanji-list", "/kanji")
}
