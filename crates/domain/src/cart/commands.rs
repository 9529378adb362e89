//! Cart commands and replies.

use common::AggregateId;
use serde::{Deserialize, Serialize};

/// Command to set the quantity of a product in a cart.
#[derive(Debug, Clone)]
pub struct UpdateItem {
    pub cart_id: AggregateId,
    pub product_id: String,

    /// Requested quantity; negative values are rejected, 0 removes the item.
    pub quantity: i32,
}

impl UpdateItem {
    pub fn new(
        cart_id: impl Into<AggregateId>,
        product_id: impl Into<String>,
        quantity: i32,
    ) -> Self {
        Self {
            cart_id: cart_id.into(),
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Command to check a cart out.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub cart_id: AggregateId,
}

impl Checkout {
    pub fn new(cart_id: impl Into<AggregateId>) -> Self {
        Self {
            cart_id: cart_id.into(),
        }
    }
}

/// Reply to a state-changing command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum OperationResult {
    /// The command's events were persisted and applied.
    Confirmed,

    /// The command was refused; nothing was persisted.
    Rejected { reason: String },
}

impl OperationResult {
    pub fn rejected(reason: impl Into<String>) -> Self {
        OperationResult::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, OperationResult::Confirmed)
    }

    /// Label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            OperationResult::Confirmed => "confirmed",
            OperationResult::Rejected { .. } => "rejected",
        }
    }
}
