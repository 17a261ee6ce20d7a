mod inmemory;
mod kafka;

pub use inmemory::InMemoryStreamTransport;
pub use kafka::KafkaStreamTransport;
use std::sync::Arc;

/// One record fetched from a stream
#[derive(Debug, Clone)]
pub struct StreamMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub partition: i32,
    pub offset: i64,
}

/// Thin abstraction over a partitioned, append-only log. Records with the
/// same key land in the same partition, which is what gives one user's
/// events their consumption order. Delivery is at-least-once; consumers
/// commit offsets explicitly.
#[async_trait::async_trait]
pub trait IStreamTransport: Send + Sync {
    /// Publish one keyed record; resolves once the broker acknowledged it
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> anyhow::Result<()>;

    /// Join `group` on `topic`, resuming from the group's committed offset
    async fn subscribe(&self, topic: &str, group: &str)
        -> anyhow::Result<Arc<dyn IStreamConsumer>>;
}

#[async_trait::async_trait]
pub trait IStreamConsumer: Send + Sync {
    /// Next record in partition order; waits until one is available
    async fn fetch(&self) -> anyhow::Result<StreamMessage>;

    /// Commit the offset of `msg` for this consumer group
    async fn commit(&self, msg: &StreamMessage) -> anyhow::Result<()>;
}
