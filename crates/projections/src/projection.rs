//! Core projection trait.

use async_trait::async_trait;
use event_store::{EventEnvelope, Position};

use crate::Result;

/// A projection that processes events and updates a read model.
///
/// Each projection owns a durable cursor: the position of the last event it
/// applied. `handle` must store the read-model change and the new cursor
/// atomically, so a restart resumes exactly after the last applied event.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Returns the name of this projection. Also the key of its cursor.
    fn name(&self) -> &'static str;

    /// Applies a single event and advances the cursor to `event.position`.
    ///
    /// On error nothing is stored and the cursor stays where it was.
    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    /// Returns the position of the last applied event.
    async fn position(&self) -> Result<Position>;

    /// Resets the projection to its initial state and rewinds its cursor.
    async fn reset(&self) -> Result<()>;
}
