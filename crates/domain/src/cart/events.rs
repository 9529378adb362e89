//! Cart domain events.
//!
//! The persisted payload is `{"type": .., "data": {..}}`. Replay decodes
//! every historical record, so existing field names must not change.

use chrono::{DateTime, Utc};
use common::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    /// An item quantity was set. Quantity 0 removes the item.
    ItemUpdated(ItemUpdatedData),

    /// The cart was checked out.
    CheckedOut(CheckedOutData),
}

impl CartEvent {
    /// The cart this event belongs to.
    pub fn cart_id(&self) -> &AggregateId {
        match self {
            CartEvent::ItemUpdated(data) => &data.cart_id,
            CartEvent::CheckedOut(data) => &data.cart_id,
        }
    }

    /// When the event happened.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CartEvent::ItemUpdated(data) => data.timestamp,
            CartEvent::CheckedOut(data) => data.timestamp,
        }
    }
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemUpdated(_) => "ItemUpdated",
            CartEvent::CheckedOut(_) => "CheckedOut",
        }
    }
}

/// Data for ItemUpdated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdatedData {
    pub cart_id: AggregateId,
    pub product_id: String,
    pub quantity: u32,
    pub timestamp: DateTime<Utc>,
}

/// Data for CheckedOut event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckedOutData {
    pub cart_id: AggregateId,
    pub timestamp: DateTime<Utc>,
}
