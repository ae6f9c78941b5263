use multibank_domain::DomainEvent;

/// Outbound port for domain events.
///
/// Publishing never blocks and never fails the originating operation;
/// delivery problems are the publisher's to log.
pub trait DomainEventPublisher: Send + Sync {
    /// Hands one event to the downstream consumers.
    fn publish(&self, event: DomainEvent);
}
