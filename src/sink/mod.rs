use std::future::Future;

use rdkafka::error::KafkaError;
use thiserror::Error;

pub mod kafka;

pub use kafka::KafkaSink;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to connect to the broker: {0}")]
    Connect(#[source] KafkaError),

    #[error("broker did not accept the message: {0}")]
    Publish(#[source] KafkaError),

    #[error("failed to release the broker connection: {0}")]
    Close(#[source] KafkaError),

    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Destination of serialized events.
///
/// `close` takes the sink by value, so a connection can be released only once.
pub trait EventSink {
    /// Resolves once the broker has acknowledged the message.
    fn publish(
        &mut self,
        key: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), SinkError>> + Send;

    fn close(self) -> Result<(), SinkError>;
}
