//! Projection error types.

use common::AggregateId;
use event_store::Position;
use thiserror::Error;

/// Errors that can occur during projection processing.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// Failed to deserialize an event payload.
    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The report store failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A checkout arrived for a cart whose creation was never projected.
    #[error("Didn't find cart for checkout. CartID: {cart_id} (position {position})")]
    ConsistencyViolation {
        cart_id: AggregateId,
        position: Position,
    },

    /// A projection-specific error.
    #[error("Projection error: {0}")]
    Projection(String),
}

impl ProjectionError {
    /// True for errors that retrying the same event cannot fix.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProjectionError::ConsistencyViolation { .. })
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
