/// Telemetry event submission
use log::{debug, info};
use url::Url;

use crate::error::NodeError;
use crate::models::{PublishResult, TelemetryEvent};
use crate::signing::{AuthToken, RequestDate, RequestSigner};
use crate::telemetry::transport::{send_with_retry, HttpTransport, RetryPolicy};

// Document-store REST protocol constants
const VERB: &str = "POST";
const RESOURCE_TYPE: &str = "docs";
const API_VERSION: &str = "2018-12-31";

/// Destination for telemetry events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishTarget {
    /// Ingestion function that stores the event on the node's behalf
    Function { url: Url },
    /// Document collection, authenticated with a master-key token
    DocumentStore { url: Url, resource_link: String },
}

impl PublishTarget {
    pub fn url(&self) -> &Url {
        match self {
            PublishTarget::Function { url } => url,
            PublishTarget::DocumentStore { url, .. } => url,
        }
    }
}

pub struct TelemetryPublisher<T> {
    transport: T,
    target: PublishTarget,
    signer: RequestSigner,
    retry: RetryPolicy,
}

impl<T: HttpTransport> TelemetryPublisher<T> {
    pub fn new(transport: T, target: PublishTarget, signer: RequestSigner) -> Self {
        TelemetryPublisher {
            transport,
            target,
            signer,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Headers for one event
    ///
    /// The document-store variant signs the request with the event's date;
    /// the function variant only declares the content type.
    pub fn headers(
        &self,
        event: &TelemetryEvent,
        date: &RequestDate,
    ) -> Result<Vec<(String, String)>, NodeError> {
        match &self.target {
            PublishTarget::Function { .. } => Ok(vec![json_content_type()]),
            PublishTarget::DocumentStore { resource_link, .. } => {
                let token = self
                    .signer
                    .sign(VERB, RESOURCE_TYPE, resource_link, &date.header)?;
                Ok(document_headers(token, &event.device_id))
            }
        }
    }

    /// Serialize and send one event
    ///
    /// Returns the final response when it is 2xx. Failures are retried per
    /// the publisher's retry policy and then dropped; nothing is queued.
    pub async fn publish(
        &self,
        event: &TelemetryEvent,
        date: &RequestDate,
    ) -> Result<PublishResult, NodeError> {
        let body = serde_json::to_string(event).map_err(|e| NodeError::Serialize(e.to_string()))?;
        let headers = self.headers(event, date)?;

        debug!("Request headers: {:?}", header_names(&headers));
        info!("Publishing {}: {}", event.id, body);

        send_with_retry(
            &self.transport,
            &self.retry,
            self.target.url().as_str(),
            &body,
            &headers,
        )
        .await
    }
}

fn json_content_type() -> (String, String) {
    ("Content-Type".to_string(), "application/json".to_string())
}

fn document_headers(token: AuthToken, device_id: &str) -> Vec<(String, String)> {
    vec![
        ("Authorization".to_string(), token.as_str().to_string()),
        ("x-ms-date".to_string(), token.date().to_string()),
        ("x-ms-version".to_string(), API_VERSION.to_string()),
        json_content_type(),
        ("x-ms-documentdb-is-upsert".to_string(), "True".to_string()),
        (
            "x-ms-documentdb-partitionkey".to_string(),
            format!("[\"{}\"]", device_id),
        ),
    ]
}

// Header values may carry the signature, so only names are logged
fn header_names(headers: &[(String, String)]) -> Vec<&str> {
    headers.iter().map(|(name, _)| name.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColorClass;
    use crate::testing::RecordingTransport;
    use time::macros::datetime;
    use tokio::time::Duration;

    const KEY_B64: &str = "Y29sb3Itbm9kZS1zaGFyZWQtc2VjcmV0";

    fn date() -> RequestDate {
        RequestDate::at(datetime!(2024-06-05 09:15:30 UTC))
    }

    fn event(color: ColorClass) -> TelemetryEvent {
        TelemetryEvent::for_reading("testArduino", &date(), color).unwrap()
    }

    fn publisher(target: PublishTarget) -> TelemetryPublisher<RecordingTransport> {
        TelemetryPublisher::new(
            RecordingTransport::default(),
            target,
            RequestSigner::from_base64(KEY_B64).unwrap(),
        )
        .with_retry(RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::ZERO,
        })
    }

    fn function_target() -> PublishTarget {
        PublishTarget::Function {
            url: Url::parse("https://colors.azurewebsites.net/api/InsertColorData").unwrap(),
        }
    }

    fn document_target() -> PublishTarget {
        PublishTarget::DocumentStore {
            url: Url::parse(
                "https://colors.documents.azure.com/dbs/ColorsDB/colls/ColorReadings/docs",
            )
            .unwrap(),
            resource_link: "dbs/ColorsDB/colls/ColorReadings".to_string(),
        }
    }

    #[tokio::test]
    async fn function_target_sends_json_body_only() {
        let publisher = publisher(function_target());

        let result = publisher
            .publish(&event(ColorClass::Green), &date())
            .await
            .unwrap();
        assert_eq!(result.status_code, 201);

        let sent = publisher.transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].url,
            "https://colors.azurewebsites.net/api/InsertColorData"
        );
        assert_eq!(
            sent[0].headers,
            vec![("Content-Type".to_string(), "application/json".to_string())]
        );

        let body: serde_json::Value = serde_json::from_str(&sent[0].body).unwrap();
        assert_eq!(body["id"], "testArduino-2024-06-05-09-15-30");
        assert_eq!(body["date_of_req"], "2024-06-05-09-15-30");
        assert_eq!(body["deviceId"], "testArduino");
        assert_eq!(body["color"], "Green");
    }

    #[tokio::test]
    async fn document_target_sends_signed_headers() {
        let publisher = publisher(document_target());

        publisher
            .publish(&event(ColorClass::Red), &date())
            .await
            .unwrap();

        let sent = publisher.transport.sent.borrow();
        let request = &sent[0];
        assert_eq!(
            request.header("Authorization"),
            Some("type=master&ver=1.0&sig=EXMhE/O/lZLTEnblLAn4WUGaGDdo0lZ8MEGwgwRacR0=")
        );
        assert_eq!(
            request.header("x-ms-date"),
            Some("Wed, 05 Jun 2024 09:15:30 GMT")
        );
        assert_eq!(request.header("x-ms-version"), Some("2018-12-31"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("x-ms-documentdb-is-upsert"), Some("True"));
        assert_eq!(
            request.header("x-ms-documentdb-partitionkey"),
            Some("[\"testArduino\"]")
        );
    }

    #[tokio::test]
    async fn failed_submission_is_dropped_after_retries() {
        let publisher = TelemetryPublisher::new(
            RecordingTransport::with_responses(vec![
                Err(NodeError::Http("timed out".into())),
                Err(NodeError::Http("timed out".into())),
            ]),
            function_target(),
            RequestSigner::from_base64(KEY_B64).unwrap(),
        )
        .with_retry(RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::ZERO,
        });

        let err = publisher
            .publish(&event(ColorClass::Yellow), &date())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, NodeError::Http(_)));
        assert_eq!(publisher.transport.sent.borrow().len(), 2);
    }
}
