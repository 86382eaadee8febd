pub mod publisher;
pub mod transport;

pub use publisher::{PublishTarget, TelemetryPublisher};
pub(crate) use transport::HttpTransport;
pub use transport::{ReqwestTransport, RetryPolicy};
