//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns the event type name.
    ///
    /// Stored alongside the payload in the event log.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates in an event-sourced system.
///
/// In event sourcing, aggregates:
/// - Start from an initial empty state for their id
/// - Are rebuilt by replaying their events in persisted order
/// - Apply events to update state (pure, deterministic)
pub trait Aggregate: Send + Sync + Sized + 'static {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors (command rejections) this aggregate can produce.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the aggregate type name.
    fn aggregate_type() -> &'static str;

    /// Returns the initial state for the given id, before any event.
    fn initial(id: AggregateId) -> Self;

    /// Returns the aggregate's identifier.
    fn id(&self) -> &AggregateId;

    /// Returns the version of the last applied event (0 when none).
    fn version(&self) -> Version;

    /// Sets the aggregate version.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must be pure and must not fail: events are facts that have happened.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

/// Left-fold of `apply` over `events`, starting from the initial state.
pub fn replay<A: Aggregate>(id: AggregateId, events: impl IntoIterator<Item = A::Event>) -> A {
    let mut aggregate = A::initial(id);
    aggregate.apply_events(events);
    aggregate
}
