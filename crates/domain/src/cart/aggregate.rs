//! Cart aggregate implementation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

use super::{
    CartError, CartEvent, CartStatus,
    events::{CheckedOutData, ItemUpdatedData},
};

/// Cart aggregate root.
///
/// Created implicitly by the first command for its id. State changes only
/// through [`Aggregate::apply`]; every stored quantity is positive.
#[derive(Debug, Clone)]
pub struct Cart {
    id: AggregateId,
    version: Version,
    items: BTreeMap<String, u32>,
    checked_out: bool,
}

impl Aggregate for Cart {
    type Event = CartEvent;
    type Error = CartError;

    fn aggregate_type() -> &'static str {
        "ShoppingCart"
    }

    fn initial(id: AggregateId) -> Self {
        Self {
            id,
            version: Version::initial(),
            items: BTreeMap::new(),
            checked_out: false,
        }
    }

    fn id(&self) -> &AggregateId {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            CartEvent::ItemUpdated(data) => {
                if data.quantity > 0 {
                    self.items.insert(data.product_id, data.quantity);
                } else {
                    self.items.remove(&data.product_id);
                }
            }
            CartEvent::CheckedOut(_) => {
                self.checked_out = true;
            }
        }
    }
}

// Query methods
impl Cart {
    /// Returns the current state.
    pub fn status(&self) -> CartStatus {
        if self.checked_out {
            CartStatus::CheckedOut
        } else {
            CartStatus::Open
        }
    }

    pub fn is_checked_out(&self) -> bool {
        self.checked_out
    }

    /// Items keyed by product id.
    pub fn items(&self) -> &BTreeMap<String, u32> {
        &self.items
    }

    pub fn quantity_of(&self, product_id: &str) -> Option<u32> {
        self.items.get(product_id).copied()
    }

    /// Returns a copy of the current state for replies.
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            id: self.id.clone(),
            items: self
                .items
                .iter()
                .map(|(product_id, quantity)| CartItem {
                    product_id: product_id.clone(),
                    quantity: *quantity,
                })
                .collect(),
            checked_out: self.checked_out,
        }
    }
}

// Command methods (return events or a rejection; never mutate)
impl Cart {
    /// Sets the quantity of a product. Quantity 0 removes it.
    pub fn update_item(
        &self,
        product_id: impl Into<String>,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<Vec<CartEvent>, CartError> {
        if !self.status().can_update_items() {
            return Err(CartError::UpdateAfterCheckout);
        }

        let product_id = product_id.into();
        let quantity = u32::try_from(quantity).map_err(|_| CartError::NegativeQuantity)?;

        if quantity == 0 && !self.items.contains_key(&product_id) {
            return Err(CartError::ItemNotInCart);
        }

        Ok(vec![CartEvent::ItemUpdated(ItemUpdatedData {
            cart_id: self.id.clone(),
            product_id,
            quantity,
            timestamp: now,
        })])
    }

    /// Checks the cart out.
    pub fn checkout(&self, now: DateTime<Utc>) -> Result<Vec<CartEvent>, CartError> {
        if !self.status().can_checkout() {
            return Err(CartError::CheckoutAfterCheckout);
        }

        if self.items.is_empty() {
            return Err(CartError::EmptyCart);
        }

        Ok(vec![CartEvent::CheckedOut(CheckedOutData {
            cart_id: self.id.clone(),
            timestamp: now,
        })])
    }
}

/// The `Get` reply: the full cart state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub id: AggregateId,
    pub items: Vec<CartItem>,
    pub checked_out: bool,
}

impl CartSnapshot {
    pub fn quantity_of(&self, product_id: &str) -> Option<u32> {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map(|item| item.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub quantity: u32,
}
