//! Shopping cart aggregate, its runtime and facade.

mod aggregate;
mod commands;
mod entity;
mod events;
mod region;
mod service;
mod state;

pub use aggregate::{Cart, CartItem, CartSnapshot};
pub use commands::{Checkout, OperationResult, UpdateItem};
pub use entity::CartHandle;
pub use events::{CartEvent, CheckedOutData, ItemUpdatedData};
pub use region::ShardRegion;
pub use service::CartService;
pub use state::CartStatus;

use thiserror::Error;

/// Reasons a cart command is rejected.
///
/// The display text is the reason returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Quantity must be greater than zero")]
    NegativeQuantity,

    #[error("Cannot delete item that is not already in cart")]
    ItemNotInCart,

    #[error("Cannot checkout empty cart")]
    EmptyCart,

    #[error("Can't update item on already checked out shopping cart")]
    UpdateAfterCheckout,

    #[error("Can't checkout on already checked out shopping cart")]
    CheckoutAfterCheckout,
}
