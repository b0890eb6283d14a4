use std::time::Duration;

use log::{debug, info};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use super::{EventSink, SinkError};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
}

impl KafkaSink {
    pub fn connect(brokers: &str, topic: &str) -> Result<Self, SinkError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .create()
            .map_err(SinkError::Connect)?;

        Ok(KafkaSink {
            producer,
            topic: topic.to_owned(),
        })
    }
}

impl EventSink for KafkaSink {
    async fn publish(&mut self, key: &str, payload: &[u8]) -> Result<(), SinkError> {
        let record = FutureRecord::to(&self.topic).key(key).payload(payload);

        // No queue timeout: a stalled broker holds the loop here.
        self.producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(err, _)| SinkError::Publish(err))?;

        debug!("Delivered message with key {} to {}", key, self.topic);
        Ok(())
    }

    fn close(self) -> Result<(), SinkError> {
        info!("Flushing and closing the Kafka producer");
        self.producer
            .flush(FLUSH_TIMEOUT)
            .map_err(SinkError::Close)
    }
}
