use crate::resource_cache::{stat, Inner};
use crate::transport::TransportRequest;
use querito_core::{FetchTicket, QueryError, QueryOptions, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum extra delay added to each retry, as a fraction of `retry_delay`.
const JITTER_RATIO: f64 = 0.5;

/// Runs one generation's request, retrying failures up to `options.retry`
/// times, and hands the outcome back to the cache.
///
/// Stops early once the ticket no longer owns its key: nobody would see the
/// result.
pub(crate) async fn run(
    inner: Arc<Inner>,
    ticket: FetchTicket,
    request: TransportRequest,
    options: QueryOptions,
) {
    let mut attempt: u32 = 0;
    let outcome = loop {
        stat!(inner, record_fetch);
        let result = send(&inner, request.clone()).await;

        let error = match result {
            Ok(data) => break Ok(Arc::new(data)),
            Err(error) => error,
        };
        if attempt >= options.retry || !error.is_retryable() {
            break Err(error);
        }
        if !inner.is_current(&ticket) {
            debug!(key = %ticket.key, generation = ticket.generation, "superseded, not retrying");
            return;
        }

        attempt += 1;
        let delay = backoff(options.retry_delay);
        warn!(
            key = %ticket.key,
            generation = ticket.generation,
            attempt,
            %error,
            delay_ms = delay.as_millis() as u64,
            "fetch failed, retrying"
        );
        stat!(inner, record_retry);
        tokio::time::sleep(delay).await;

        if !inner.is_current(&ticket) {
            debug!(key = %ticket.key, generation = ticket.generation, "superseded during backoff");
            return;
        }
    };

    inner.complete(ticket, outcome);
}

async fn send(inner: &Inner, request: TransportRequest) -> Result<Value> {
    let response = inner
        .transport
        .request(request)
        .await
        .map_err(QueryError::from)?;
    response.into_result()
}

fn backoff(base: Duration) -> Duration {
    if base.is_zero() {
        return base;
    }
    base + base.mul_f64(fastrand::f64() * JITTER_RATIO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_stays_within_jitter_bound() {
        let base = Duration::from_millis(1000);
        for _ in 0..100 {
            let delay = backoff(base);
            assert!(delay >= base);
            assert!(delay <= Duration::from_millis(1500));
        }
        assert_eq!(backoff(Duration::ZERO), Duration::ZERO);
    }
}
