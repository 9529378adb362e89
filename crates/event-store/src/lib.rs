//! Append-only, per-aggregate ordered event log.
//!
//! The [`EventStore`] trait is the seam between the cart aggregate and the
//! durable journal. Two implementations ship with the crate:
//! [`InMemoryEventStore`] for tests and single-node runs, and
//! [`PostgresEventStore`] for durable deployments.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Position, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
