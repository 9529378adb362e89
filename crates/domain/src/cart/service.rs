//! Cart service providing the command/query API used by transports.

use std::future::Future;
use std::time::Duration;

use common::AggregateId;
use event_store::EventStore;
use metrics::counter;

use crate::error::DomainError;

use super::{CartHandle, CartSnapshot, Checkout, OperationResult, ShardRegion, UpdateItem};

/// Shard count used when none is configured.
pub const DEFAULT_NUMBER_OF_SHARDS: u32 = 100;

/// Bounded wait for entity replies used when none is configured.
pub const DEFAULT_ASK_TIMEOUT: Duration = Duration::from_secs(3);

/// Service for managing carts.
///
/// Routes each command to the entity owning the cart id and waits for its
/// reply up to the ask timeout. A [`DomainError::Timeout`] does not mean the
/// command was dropped: it may still be persisted afterwards.
pub struct CartService<S: EventStore> {
    region: ShardRegion<S>,
    ask_timeout: Duration,
}

impl<S: EventStore + 'static> CartService<S> {
    /// Creates a service with the default shard count and ask timeout.
    pub fn new(store: S) -> Self {
        Self::with_settings(store, DEFAULT_NUMBER_OF_SHARDS, DEFAULT_ASK_TIMEOUT)
    }

    pub fn with_settings(store: S, number_of_shards: u32, ask_timeout: Duration) -> Self {
        Self {
            region: ShardRegion::new(store, number_of_shards),
            ask_timeout,
        }
    }

    /// Stops entities that receive nothing for `idle_timeout`.
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.region = self.region.with_idle_timeout(idle_timeout);
        self
    }

    pub fn region(&self) -> &ShardRegion<S> {
        &self.region
    }

    pub fn ask_timeout(&self) -> Duration {
        self.ask_timeout
    }

    /// Sets the quantity of a product in a cart.
    #[tracing::instrument(skip(self), fields(cart_id = %cmd.cart_id))]
    pub async fn update_item(&self, cmd: UpdateItem) -> Result<OperationResult, DomainError> {
        let (quantity, timeout) = (cmd.quantity, self.ask_timeout);
        let result = self
            .ask(&cmd.cart_id, |entity| {
                let product_id = cmd.product_id.clone();
                async move { entity.update_item(product_id, quantity, timeout).await }
            })
            .await;
        record("update_item", &result);
        result
    }

    /// Checks a cart out.
    #[tracing::instrument(skip(self), fields(cart_id = %cmd.cart_id))]
    pub async fn checkout(&self, cmd: Checkout) -> Result<OperationResult, DomainError> {
        let timeout = self.ask_timeout;
        let result = self
            .ask(&cmd.cart_id, |entity| async move { entity.checkout(timeout).await })
            .await;
        record("checkout", &result);
        result
    }

    /// Returns the current cart state. Unknown ids yield an empty open cart.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, cart_id: &AggregateId) -> Result<CartSnapshot, DomainError> {
        let timeout = self.ask_timeout;
        self.ask(cart_id, |entity| async move { entity.get(timeout).await })
            .await
    }

    /// Runs `ask` against the entity owning `cart_id`.
    ///
    /// An entity can stop while idle between lookup and send. Such a message
    /// was never handled, so it is sent once more to a freshly spawned entity.
    async fn ask<T, F, Fut>(&self, cart_id: &AggregateId, ask: F) -> Result<T, DomainError>
    where
        F: Fn(CartHandle) -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let entity = self.region.entity(cart_id).await;
        match ask(entity).await {
            Err(DomainError::EntityStopped { .. }) => {
                tracing::debug!(cart_id = %cart_id, "Cart entity stopped, resending");
                ask(self.region.entity(cart_id).await).await
            }
            other => other,
        }
    }
}

fn record(command: &'static str, result: &Result<OperationResult, DomainError>) {
    let outcome = match result {
        Ok(reply) => reply.outcome(),
        Err(DomainError::Timeout { .. }) => "timeout",
        Err(_) => "failed",
    };
    counter!("cart_commands_total", "command" => command, "outcome" => outcome).increment(1);
}
