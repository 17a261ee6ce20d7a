mod config;
mod repos;
mod stream;
mod system;
pub mod telemetry;

pub use config::{
    Config, ANALYTICS_CONSUMER_GROUP, DEFAULT_LIFECYCLE_TOPIC, DEFAULT_NOTIFICATION_TOPIC,
    NOTIFICATION_CONSUMER_GROUP,
};
pub use repos::{
    IAnalyticsRepo, IOutboxBatch, IOutboxRepo, IReminderRepo, ProjectionOutcome, Repos,
};
use std::sync::Arc;
pub use stream::{
    IStreamConsumer, IStreamTransport, InMemoryStreamTransport, KafkaStreamTransport,
    StreamMessage,
};
pub use system::ISys;
use system::RealSys;
use tracing::{info, warn};

#[derive(Clone)]
pub struct RemraContext {
    pub repos: Repos,
    pub stream: Arc<dyn IStreamTransport>,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
}

struct ContextParams {
    pub postgres_connection_string: Option<String>,
    pub kafka_brokers: Option<String>,
}

impl RemraContext {
    pub fn create_inmemory() -> Self {
        Self {
            repos: Repos::create_inmemory(),
            stream: Arc::new(InMemoryStreamTransport::new()),
            config: Config::new(),
            sys: Arc::new(RealSys {}),
        }
    }

    async fn create(params: ContextParams) -> anyhow::Result<Self> {
        let config = Config::new();

        let repos = match &params.postgres_connection_string {
            Some(connection_string) => Repos::create_postgres(connection_string).await?,
            None => Repos::create_inmemory(),
        };

        let stream: Arc<dyn IStreamTransport> = match &params.kafka_brokers {
            Some(brokers) => Arc::new(KafkaStreamTransport::new(
                brokers,
                config.publish_timeout,
            )?),
            None => Arc::new(InMemoryStreamTransport::new()),
        };

        Ok(Self {
            repos,
            stream,
            config,
            sys: Arc::new(RealSys {}),
        })
    }
}

/// Will setup the correct Infra Context given the environment
pub async fn setup_context() -> anyhow::Result<RemraContext> {
    const DATABASE_URL: &str = "DATABASE_URL";
    const KAFKA_BROKERS: &str = "KAFKA_BROKERS";

    let postgres_connection_string = std::env::var(DATABASE_URL).ok();
    let kafka_brokers = std::env::var(KAFKA_BROKERS).ok();

    match &postgres_connection_string {
        Some(_) => info!("{} env var was provided. Going to use postgres.", DATABASE_URL),
        None => warn!(
            "{} env var was not provided. Going to use inmemory infra. This should only be used during testing!",
            DATABASE_URL
        ),
    }
    match &kafka_brokers {
        Some(_) => info!("{} env var was provided. Going to use kafka.", KAFKA_BROKERS),
        None => warn!(
            "{} env var was not provided. Going to use the inmemory stream. This should only be used during testing!",
            KAFKA_BROKERS
        ),
    }

    RemraContext::create(ContextParams {
        postgres_connection_string,
        kafka_brokers,
    })
    .await
}
