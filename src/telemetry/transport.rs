use log::{error, warn};
use tokio::time::Duration;

use crate::error::NodeError;
use crate::models::PublishResult;

/// HTTP POST used to deliver telemetry
pub(crate) trait HttpTransport {
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &[(String, String)],
    ) -> Result<PublishResult, NodeError>;
}

/// reqwest-backed transport with a bounded timeout and no connection reuse
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, NodeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0) // one connection per publish
            .build()?;
        Ok(ReqwestTransport { client })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &[(String, String)],
    ) -> Result<PublishResult, NodeError> {
        let mut request = self.client.post(url).body(body.to_string());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status_code = response.status().as_u16();
        // text() consumes the response; the connection is released here
        let body = response.text().await?;

        Ok(PublishResult { status_code, body })
    }
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// POST a request, retrying transient failures
///
/// A 2xx response is returned as is. Any other status becomes
/// `NodeError::Status`. Transport errors, 429 and 5xx are retried up to the
/// policy's attempt limit; after that the request is dropped and the last
/// error returned.
pub async fn send_with_retry<T: HttpTransport>(
    transport: &T,
    policy: &RetryPolicy,
    url: &str,
    body: &str,
    headers: &[(String, String)],
) -> Result<PublishResult, NodeError> {
    let mut backoff = policy.initial_backoff;
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        let error = match transport.post(url, body, headers).await {
            Ok(result) if (200..300).contains(&result.status_code) => return Ok(result),
            Ok(result) => NodeError::Status {
                status: result.status_code,
                body: result.body,
            },
            Err(e) => e,
        };

        if !error.is_retryable() {
            error!("Request rejected: {}", error);
            return Err(error);
        }

        warn!(
            "Attempt {}/{}: {}",
            attempt + 1,
            policy.max_attempts,
            error
        );
        last_error = Some(error);

        if attempt + 1 < policy.max_attempts {
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    Err(last_error.unwrap_or_else(|| NodeError::Http("no attempts were made".into())))
}
