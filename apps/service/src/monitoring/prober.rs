use anyhow::Result;
use std::time::{Duration, Instant};

use super::types::ProbeOutcome;

/// Issues a single timed HTTP GET against a target URL.
///
/// Implementations must not retry; retry policy, if any, belongs to the
/// caller.
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// HTTP prober backed by a shared `reqwest` client with a fixed timeout.
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let timeout = Duration::from_millis(timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self { client, timeout })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let start = Instant::now();

        match self.client.get(url).send().await {
            Ok(response) => ProbeOutcome::Completed {
                status_code: response.status().as_u16(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
            Err(error) => {
                // Timed-out probes report the ceiling rather than however far
                // the clock happened to get past it.
                let latency_ms = if error.is_timeout() {
                    self.timeout.as_millis() as u64
                } else {
                    start.elapsed().as_millis() as u64
                };

                ProbeOutcome::Failed { reason: error.to_string(), latency_ms }
            }
        }
    }
}
