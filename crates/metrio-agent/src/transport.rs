use std::io::Write;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use metrio_common::error::{MetrioError, Result};
use metrio_common::retry::RetryPolicy;
use metrio_common::sign;
use metrio_common::types::Metric;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts, refused connects, resets and premature EOF are worth another
/// attempt; everything else (bad URL, TLS, redirect loops) is fatal.
fn is_transient(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::TimedOut
            );
        }
        source = cause.source();
    }
    false
}

/// HTTP client for both delivery paths. Bodies are JSON, gzip-compressed,
/// and signed over the uncompressed payload when a key is configured.
pub struct MetricClient {
    http: reqwest::Client,
    base: String,
    key: Option<String>,
    retry: RetryPolicy,
}

impl MetricClient {
    pub fn new(address: &str, key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| MetrioError::Transport(err.to_string()))?;
        Ok(Self {
            http,
            base: format!("http://{address}"),
            key,
            retry: RetryPolicy::fibonacci(4),
        })
    }

    fn encode(&self, body: &[u8]) -> Result<(Vec<u8>, Option<String>)> {
        let signature = self.key.as_deref().map(|key| sign::sign(key, body));
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body)?;
        Ok((encoder.finish()?, signature))
    }

    async fn post(
        &self,
        url: &str,
        payload: &[u8],
        signature: Option<&str>,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut request = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header("Content-Encoding", "gzip")
            .body(payload.to_vec());
        if let Some(signature) = signature {
            request = request.header(sign::SIGNATURE_HEADER, signature);
        }
        request.send().await
    }

    /// Delivers one metric on the per-metric path. Best effort: the caller
    /// forwards errors to the shared sink and moves on.
    pub async fn send_metric(&self, metric: &Metric) -> Result<()> {
        let body = serde_json::to_vec(metric)?;
        let (payload, signature) = self.encode(&body)?;
        let url = format!("{}/update/", self.base);

        let response = self
            .retry
            .run("update metric", is_transient, || {
                self.post(&url, &payload, signature.as_deref())
            })
            .await
            .map_err(|err| MetrioError::Transport(format!("update {}: {err}", metric.id)))?;

        debug!(metric = %metric.id, status = %response.status(), "metric sent");
        Ok(())
    }

    /// Delivers a whole snapshot atomically on the batch path.
    pub async fn send_batch(&self, snapshot: &[Metric]) -> Result<()> {
        let body = serde_json::to_vec(snapshot)?;
        let (payload, signature) = self.encode(&body)?;
        let url = format!("{}/updates/", self.base);

        let response = self
            .retry
            .run("update batch", is_transient, || {
                self.post(&url, &payload, signature.as_deref())
            })
            .await
            .map_err(|err| MetrioError::Transport(format!("batch of {}: {err}", snapshot.len())))?;

        debug!(metrics = snapshot.len(), status = %response.status(), "batch sent");
        Ok(())
    }
}
