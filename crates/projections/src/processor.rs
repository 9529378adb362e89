//! Projection processor for feeding events to projections.

use std::future::Future;
use std::time::Duration;

use event_store::{EventStore, Position};
use futures_util::StreamExt;

use crate::projection::Projection;
use crate::{ProjectionError, Result};

/// Processes events from an event store and delivers them to projections.
///
/// The processor supports:
/// - Catch-up: streams the events after each projection's cursor
/// - Rebuild: resets all projections and replays from the start of the log
/// - Tailing: repeated catch-up on an interval until shutdown
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    /// Creates a new processor with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
        }
    }

    /// Registers a projection with this processor.
    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
    }

    /// Returns the number of registered projections.
    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Delivers every event after each projection's cursor, in log order.
    ///
    /// Returns the number of events read from the log. Stops at the first
    /// failing event; its cursor is not advanced, so the next run retries it.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let mut cursors = Vec::with_capacity(self.projections.len());
        for projection in &self.projections {
            cursors.push(projection.position().await?);
        }

        let Some(from) = cursors.iter().min().copied() else {
            return Ok(0);
        };

        let mut stream = self.store.stream_all_events_from(from).await?;
        let mut events_read: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            events_read += 1;

            for (projection, cursor) in self.projections.iter().zip(cursors.iter_mut()) {
                if event.position <= *cursor {
                    continue;
                }

                if let Err(e) = projection.handle(&event).await {
                    if e.is_fatal() {
                        metrics::counter!(
                            "projections_consistency_violations_total",
                            "projection" => projection.name()
                        )
                        .increment(1);
                    }
                    tracing::error!(
                        projection = projection.name(),
                        position = %event.position,
                        cart_id = %event.aggregate_id,
                        event_type = %event.event_type,
                        error = %e,
                        "Projection failed to handle event"
                    );
                    return Err(e);
                }

                *cursor = event.position;
                metrics::counter!("projections_events_processed", "projection" => projection.name())
                    .increment(1);
            }
        }

        if events_read > 0 {
            tracing::info!(events_read, from = %from, "catch-up complete");
        }

        Ok(events_read)
    }

    /// Resets all projections and replays all events from the store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.run_catch_up().await
    }

    /// Tails the log until `shutdown` completes.
    ///
    /// Transient failures are retried on the next tick. A consistency
    /// violation halts the processor and is returned: the offending event
    /// stays unprocessed and no recovery is attempted.
    pub async fn run(
        &self,
        poll_interval: Duration,
        shutdown: impl Future<Output = ()> + Send,
    ) -> Result<()> {
        tokio::pin!(shutdown);
        tracing::info!(poll_interval_ms = poll_interval.as_millis() as u64, "Projector started");

        loop {
            match self.run_catch_up().await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    tracing::error!(error = %e, "Projector halted");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Catch-up failed, retrying");
                }
            }

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Projector stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }

    /// The smallest cursor across registered projections.
    pub async fn position(&self) -> Result<Position> {
        let mut lowest: Option<Position> = None;
        for projection in &self.projections {
            let position = projection.position().await?;
            lowest = Some(lowest.map_or(position, |p| p.min(position)));
        }
        Ok(lowest.unwrap_or_default())
    }
}
