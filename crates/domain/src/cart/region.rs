//! Routes cart ids to their entity through a fixed shard function.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::{AggregateId, shard_id};
use event_store::EventStore;
use tokio::sync::RwLock;

use crate::command::CommandHandler;

use super::{Cart, CartHandle};

/// How long an entity may go without messages before it stops.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

type Shard = HashMap<AggregateId, CartHandle>;

/// Owns the live cart entities, grouped by shard.
///
/// At most one running entity exists per cart id. An entity that stopped
/// (idle, failed recovery or failed persistence) is dropped from its shard
/// and replaced on the next access.
pub struct ShardRegion<S: EventStore> {
    handler: Arc<CommandHandler<S, Cart>>,
    number_of_shards: u32,
    idle_timeout: Duration,
    shards: RwLock<HashMap<String, Shard>>,
}

impl<S: EventStore + 'static> ShardRegion<S> {
    pub fn new(store: S, number_of_shards: u32) -> Self {
        Self {
            handler: Arc::new(CommandHandler::new(store)),
            number_of_shards: number_of_shards.max(1),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            shards: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn number_of_shards(&self) -> u32 {
        self.number_of_shards
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// The shard owning `cart_id`.
    pub fn shard_of(&self, cart_id: &AggregateId) -> String {
        shard_id(cart_id.as_str(), self.number_of_shards)
    }

    /// Returns the handle for `cart_id`, spawning its entity if needed.
    pub async fn entity(&self, cart_id: &AggregateId) -> CartHandle {
        let shard = self.shard_of(cart_id);

        // Fast path: live entity under the read lock.
        {
            let shards = self.shards.read().await;
            if let Some(handle) = shards.get(&shard).and_then(|s| s.get(cart_id))
                && !handle.is_closed()
            {
                return handle.clone();
            }
        }

        // Slow path: re-check under the write lock so only one entity is spawned.
        let mut shards = self.shards.write().await;
        let entities = shards.entry(shard).or_default();
        entities.retain(|_, handle| !handle.is_closed());
        if let Some(handle) = entities.get(cart_id) {
            return handle.clone();
        }

        tracing::debug!(cart_id = %cart_id, "Starting cart entity");
        let handle = CartHandle::spawn(
            cart_id.clone(),
            Arc::clone(&self.handler),
            self.idle_timeout,
        );
        entities.insert(cart_id.clone(), handle.clone());
        handle
    }

    /// Number of live entities across all shards. Drops stopped ones.
    pub async fn entity_count(&self) -> usize {
        let mut shards = self.shards.write().await;
        Self::prune(&mut shards);
        shards.values().map(HashMap::len).sum()
    }

    /// Number of shards hosting at least one live entity.
    pub async fn active_shard_count(&self) -> usize {
        let mut shards = self.shards.write().await;
        Self::prune(&mut shards);
        shards.len()
    }

    fn prune(shards: &mut HashMap<String, Shard>) {
        shards.retain(|_, entities| {
            entities.retain(|_, handle| !handle.is_closed());
            !entities.is_empty()
        });
    }
}
