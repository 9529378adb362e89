//! Shared identifiers and routing primitives for the shopping-cart system.

pub mod shard;
pub mod types;

pub use shard::{java_string_hash, shard_id};
pub use types::AggregateId;
