//! Cart entity runtime: one task per live cart id.
//!
//! The task owns the cart state exclusively. It recovers the state from the
//! event log before reading its mailbox, then handles one message at a time,
//! so commands for the same cart are never validated concurrently. A task that
//! receives nothing for its idle timeout stops; the next access recovers a
//! fresh one from the log.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::AggregateId;
use event_store::EventStore;
use metrics::counter;
use tokio::sync::{mpsc, oneshot};

use crate::aggregate::Aggregate;
use crate::command::CommandHandler;
use crate::error::DomainError;

use super::{Cart, CartEvent, CartSnapshot, OperationResult};

const MAILBOX_CAPACITY: usize = 64;

/// Messages accepted by a cart entity.
enum CartMessage {
    UpdateItem {
        product_id: String,
        quantity: i32,
        reply: oneshot::Sender<OperationResult>,
    },
    Checkout {
        reply: oneshot::Sender<OperationResult>,
    },
    Get {
        reply: oneshot::Sender<CartSnapshot>,
    },
}

/// Cloneable address of a running cart entity.
#[derive(Debug, Clone)]
pub struct CartHandle {
    cart_id: AggregateId,
    sender: mpsc::Sender<CartMessage>,
}

impl CartHandle {
    /// Spawns the entity task for `cart_id` and returns its handle.
    pub(crate) fn spawn<S>(
        cart_id: AggregateId,
        handler: Arc<CommandHandler<S, Cart>>,
        idle_timeout: Duration,
    ) -> Self
    where
        S: EventStore + 'static,
    {
        let (sender, mailbox) = mpsc::channel(MAILBOX_CAPACITY);
        tokio::spawn(run(cart_id.clone(), handler, mailbox, idle_timeout));
        Self { cart_id, sender }
    }

    pub fn cart_id(&self) -> &AggregateId {
        &self.cart_id
    }

    /// True once the entity task has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn update_item(
        &self,
        product_id: impl Into<String>,
        quantity: i32,
        timeout: Duration,
    ) -> Result<OperationResult, DomainError> {
        let product_id = product_id.into();
        self.ask(
            |reply| CartMessage::UpdateItem {
                product_id,
                quantity,
                reply,
            },
            timeout,
        )
        .await
    }

    pub async fn checkout(&self, timeout: Duration) -> Result<OperationResult, DomainError> {
        self.ask(|reply| CartMessage::Checkout { reply }, timeout)
            .await
    }

    pub async fn get(&self, timeout: Duration) -> Result<CartSnapshot, DomainError> {
        self.ask(|reply| CartMessage::Get { reply }, timeout).await
    }

    /// Sends a message and waits up to `timeout` for the reply.
    ///
    /// A timeout only stops the wait. Once queued, the message is still
    /// processed and its events may be persisted after this returns
    /// [`DomainError::Timeout`]. A stopped entity yields
    /// [`DomainError::EntityStopped`] and never sees the message.
    async fn ask<R>(
        &self,
        message: impl FnOnce(oneshot::Sender<R>) -> CartMessage,
        timeout: Duration,
    ) -> Result<R, DomainError> {
        let (reply, response) = oneshot::channel();

        let exchange = async {
            self.sender
                .send(message(reply))
                .await
                .map_err(|_| DomainError::EntityStopped {
                    cart_id: self.cart_id.clone(),
                })?;
            response.await.map_err(|_| DomainError::EntityUnavailable {
                cart_id: self.cart_id.clone(),
            })
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::Timeout {
                cart_id: self.cart_id.clone(),
                timeout,
            }),
        }
    }
}

/// Entity main loop.
async fn run<S>(
    cart_id: AggregateId,
    handler: Arc<CommandHandler<S, Cart>>,
    mut mailbox: mpsc::Receiver<CartMessage>,
    idle_timeout: Duration,
) where
    S: EventStore,
{
    let mut cart = match handler.load(&cart_id).await {
        Ok(cart) => cart,
        Err(e) => {
            tracing::error!(cart_id = %cart_id, error = %e, "Cart recovery failed");
            return;
        }
    };
    counter!("cart_entities_recovered_total").increment(1);
    tracing::debug!(
        cart_id = %cart_id,
        version = cart.version().as_i64(),
        "Cart recovered"
    );

    loop {
        let message = match tokio::time::timeout(idle_timeout, mailbox.recv()).await {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(_) => {
                // Stop accepting; messages already queued are still handled.
                tracing::debug!(cart_id = %cart_id, "Cart entity idle, passivating");
                mailbox.close();
                continue;
            }
        };

        match message {
            CartMessage::UpdateItem {
                product_id,
                quantity,
                reply,
            } => {
                tracing::info!(
                    cart_id = %cart_id,
                    product_id = %product_id,
                    quantity,
                    "Updating cart"
                );
                let result = handler
                    .execute(&mut cart, |c| c.update_item(product_id, quantity, Utc::now()))
                    .await;
                let Some(outcome) = reply_for(&cart_id, result) else {
                    mailbox.close();
                    break;
                };
                let _ = reply.send(outcome);
            }
            CartMessage::Checkout { reply } => {
                tracing::info!(cart_id = %cart_id, "Checking out cart");
                let result = handler
                    .execute(&mut cart, |c| c.checkout(Utc::now()))
                    .await;
                let Some(outcome) = reply_for(&cart_id, result) else {
                    mailbox.close();
                    break;
                };
                let _ = reply.send(outcome);
            }
            CartMessage::Get { reply } => {
                tracing::debug!(cart_id = %cart_id, "Getting cart state");
                let _ = reply.send(cart.snapshot());
            }
        }
    }

    tracing::debug!(cart_id = %cart_id, "Cart entity stopped");
}

/// Maps a command result to its reply.
///
/// Returns None when the events could not be persisted. The caller then gets
/// no reply and the entity stops, since its state may no longer match the log.
fn reply_for(
    cart_id: &AggregateId,
    result: Result<Vec<CartEvent>, DomainError>,
) -> Option<OperationResult> {
    match result {
        Ok(events) => {
            counter!("cart_events_persisted_total").increment(events.len() as u64);
            Some(OperationResult::Confirmed)
        }
        Err(DomainError::Cart(rejection)) => {
            tracing::info!(cart_id = %cart_id, reason = %rejection, "Command rejected");
            Some(OperationResult::rejected(rejection.to_string()))
        }
        Err(e) => {
            tracing::error!(cart_id = %cart_id, error = %e, "Failed to persist cart events");
            None
        }
    }
}
