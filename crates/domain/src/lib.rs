//! Domain layer for the shopping cart.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits plus the replay fold
//! - CommandHandler for persist-before-apply command processing
//! - The Cart aggregate and its state machine
//! - The cart entity runtime (one task per cart id), the shard region that
//!   routes to it, and the CartService facade

pub mod aggregate;
pub mod cart;
pub mod command;
pub mod error;

pub use aggregate::{Aggregate, DomainEvent, replay};
pub use cart::{
    Cart, CartError, CartEvent, CartHandle, CartItem, CartService, CartSnapshot, CartStatus,
    CheckedOutData, Checkout, ItemUpdatedData, OperationResult, ShardRegion, UpdateItem,
};
pub use command::CommandHandler;
pub use error::{DomainError, Result};
