use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Position, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

/// In-memory event store.
///
/// The log is a single vector in append order, so an event's position is its
/// 1-based index. Each aggregate keeps the indexes of its own events. Clones
/// share the same log.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    log: Arc<RwLock<Log>>,
}

#[derive(Default)]
struct Log {
    events: Vec<EventEnvelope>,
    by_aggregate: HashMap<AggregateId, Vec<usize>>,
}

impl Log {
    fn history<'a>(
        &'a self,
        aggregate_id: &AggregateId,
    ) -> impl Iterator<Item = &'a EventEnvelope> {
        self.by_aggregate
            .get(aggregate_id)
            .into_iter()
            .flatten()
            .map(|&index| &self.events[index])
    }

    fn version_of(&self, aggregate_id: &AggregateId) -> Option<Version> {
        self.history(aggregate_id).last().map(|e| e.version)
    }

    fn push(&mut self, mut event: EventEnvelope) {
        let index = self.events.len();
        event.position = Position::new(index as i64 + 1);
        self.by_aggregate
            .entry(event.aggregate_id.clone())
            .or_default()
            .push(index);
        self.events.push(event);
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events across all aggregates.
    pub async fn event_count(&self) -> usize {
        self.log.read().await.events.len()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let mut log = self.log.write().await;
        let aggregate_id = events[0].aggregate_id.clone();
        let current = log.version_of(&aggregate_id).unwrap_or_default();

        if let Some(expected) = options.expected_version
            && current != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current,
            });
        }

        // Same outcome as the (aggregate_id, version) unique constraint.
        if events[0].version != current.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current),
                actual: current,
            });
        }

        let mut last = current;
        for event in events {
            last = event.version;
            log.push(event);
        }
        let appended = (last.as_i64() - current.as_i64()) as u64;
        metrics::counter!("event_store_events_appended").increment(appended);

        Ok(last)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let log = self.log.read().await;
        Ok(log.history(aggregate_id).cloned().collect())
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: &AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let log = self.log.read().await;
        Ok(log
            .history(aggregate_id)
            .skip_while(|e| e.version < from_version)
            .cloned()
            .collect())
    }

    async fn stream_all_events_from(&self, after: Position) -> Result<EventStream> {
        let log = self.log.read().await;
        let skip = usize::try_from(after.as_i64()).unwrap_or(0);
        let tail: Vec<_> = log.events.iter().skip(skip).cloned().collect();

        Ok(Box::pin(stream::iter(tail.into_iter().map(Ok))))
    }

    async fn get_aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>> {
        Ok(self.log.read().await.version_of(aggregate_id))
    }
}
