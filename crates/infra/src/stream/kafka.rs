use super::{IStreamConsumer, IStreamTransport, StreamMessage};
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
    Message, Offset, TopicPartitionList,
};
use std::{sync::Arc, time::Duration};

pub struct KafkaStreamTransport {
    brokers: String,
    producer: FutureProducer,
    publish_timeout: Duration,
}

impl KafkaStreamTransport {
    pub fn new(brokers: &str, publish_timeout: Duration) -> anyhow::Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", publish_timeout.as_millis().to_string())
            .create()?;

        Ok(Self {
            brokers: brokers.to_string(),
            producer,
            publish_timeout,
        })
    }
}

#[async_trait::async_trait]
impl IStreamTransport for KafkaStreamTransport {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> anyhow::Result<()> {
        let record = FutureRecord::to(topic).key(key).payload(payload);
        self.producer
            .send(record, Timeout::After(self.publish_timeout))
            .await
            .map(|_| ())
            .map_err(|(e, _)| anyhow::anyhow!("failed to publish to topic {}: {}", topic, e))
    }

    async fn subscribe(
        &self,
        topic: &str,
        group: &str,
    ) -> anyhow::Result<Arc<dyn IStreamConsumer>> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()?;
        consumer.subscribe(&[topic])?;

        Ok(Arc::new(KafkaStreamConsumer { consumer }))
    }
}

struct KafkaStreamConsumer {
    consumer: StreamConsumer,
}

#[async_trait::async_trait]
impl IStreamConsumer for KafkaStreamConsumer {
    async fn fetch(&self) -> anyhow::Result<StreamMessage> {
        let msg = self.consumer.recv().await?;
        Ok(StreamMessage {
            topic: msg.topic().to_string(),
            key: msg
                .key()
                .map(|k| String::from_utf8_lossy(k).into_owned())
                .unwrap_or_default(),
            payload: msg.payload().map(|p| p.to_vec()).unwrap_or_default(),
            partition: msg.partition(),
            offset: msg.offset(),
        })
    }

    async fn commit(&self, msg: &StreamMessage) -> anyhow::Result<()> {
        let mut offsets = TopicPartitionList::new();
        offsets.add_partition_offset(&msg.topic, msg.partition, Offset::Offset(msg.offset + 1))?;
        self.consumer.commit(&offsets, CommitMode::Async)?;
        Ok(())
    }
}
