//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_provider_transport;
mod in_memory_consent_store;
mod postgres_consent_store;
mod tokio_event_channel;

pub use http_provider_transport::HttpProviderTransport;
pub use in_memory_consent_store::InMemoryConsentStore;
pub use postgres_consent_store::PostgresConsentStore;
pub use tokio_event_channel::{
    ChannelEventPublisher, EventConsumer, EventReceiver, TracingEventConsumer, event_channel,
};
