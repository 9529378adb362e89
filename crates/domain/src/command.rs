//! Loads aggregates from the event log and persists the events their
//! commands produce.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Event-sourced access to aggregates of type `A` stored in `S`.
///
/// State is only ever rebuilt from the log, and a command's events change
/// the in-memory aggregate only once the store has accepted them under an
/// optimistic version check.
pub struct CommandHandler<S: EventStore, A: Aggregate> {
    store: S,
    _aggregate: PhantomData<fn() -> A>,
}

impl<S: EventStore, A: Aggregate> CommandHandler<S, A> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            _aggregate: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Folds every persisted event of `aggregate_id`, in version order, over
    /// [`Aggregate::initial`]. An id with no events yields the initial state.
    pub async fn load(&self, aggregate_id: &AggregateId) -> Result<A, DomainError> {
        let history = self.store.get_events_for_aggregate(aggregate_id).await?;

        let mut aggregate = A::initial(aggregate_id.clone());
        for envelope in history {
            aggregate.apply(envelope.decode::<A::Event>()?);
            aggregate.set_version(envelope.version);
        }
        Ok(aggregate)
    }

    /// Decides `command` against the current state, appends the resulting
    /// events and only then applies them.
    ///
    /// A rejection or a failed append leaves `aggregate` untouched. A command
    /// that emits nothing does not touch the store.
    pub async fn execute<F>(
        &self,
        aggregate: &mut A,
        command: F,
    ) -> Result<Vec<A::Event>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let events = command(aggregate)?;
        if events.is_empty() {
            return Ok(events);
        }

        let expected = aggregate.version();
        let envelopes = Self::envelopes(aggregate.id(), expected, &events)?;
        let new_version = self
            .store
            .append(envelopes, AppendOptions::expect_version(expected))
            .await?;

        aggregate.apply_events(events.iter().cloned());
        aggregate.set_version(new_version);

        Ok(events)
    }

    fn envelopes(
        aggregate_id: &AggregateId,
        after: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut version = after;
        events
            .iter()
            .map(|event| {
                version = version.next();
                let envelope = EventEnvelope::builder()
                    .aggregate_id(aggregate_id.clone())
                    .aggregate_type(A::aggregate_type())
                    .event_type(event.event_type())
                    .version(version)
                    .payload(event)?
                    .build()?;
                Ok(envelope)
            })
            .collect()
    }
}
