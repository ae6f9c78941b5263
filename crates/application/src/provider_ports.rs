mod account_source;
mod consent_store;
mod events;
mod transport;

pub use account_source::AccountSource;
pub use consent_store::ConsentStore;
pub use events::DomainEventPublisher;
pub use transport::{HttpMethod, ProviderTransport, UpstreamRequest, UpstreamResponse};
