pub mod relay_outbox;

pub use relay_outbox::RelayOutboxUseCase;
