//! Domain error types.

use std::time::Duration;

use common::AggregateId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::cart::CartError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The cart rejected a command.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No reply arrived within the ask timeout. The command may still complete.
    #[error("Timed out after {timeout:?} waiting for cart {cart_id}")]
    Timeout {
        cart_id: AggregateId,
        timeout: Duration,
    },

    /// The cart entity had stopped; the message was never delivered.
    #[error("Cart entity {cart_id} stopped before the message was delivered")]
    EntityStopped { cart_id: AggregateId },

    /// The cart entity stopped before replying.
    #[error("Cart entity {cart_id} is unavailable")]
    EntityUnavailable { cart_id: AggregateId },
}

pub type Result<T> = std::result::Result<T, DomainError>;
