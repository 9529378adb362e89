//! Cart report read model: creation and checkout dates per cart.

mod memory;
mod postgres;
mod projection;

pub use memory::{InMemoryReportStore, InMemoryReportTransaction};
pub use postgres::{PostgresReportStore, PostgresReportTransaction};
pub use projection::CartReportProjection;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Position;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartReport {
    pub id: AggregateId,

    /// Timestamp of the first projected ItemUpdated.
    pub creation_date: DateTime<Utc>,

    /// Timestamp of the CheckedOut event, once projected.
    pub checkout_date: Option<DateTime<Utc>>,
}

impl CartReport {
    pub fn created(id: AggregateId, creation_date: DateTime<Utc>) -> Self {
        Self {
            id,
            creation_date,
            checkout_date: None,
        }
    }
}

/// Storage for cart reports and projection cursors.
#[async_trait]
pub trait ReportStore: Send + Sync + 'static {
    type Transaction: ReportTransaction;

    /// Opens a unit of work. Dropping it without `commit` discards its writes.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Reads a committed report.
    async fn get(&self, cart_id: &AggregateId) -> Result<Option<CartReport>>;

    /// Cursor stored for `projection`, or the start of the log.
    async fn offset(&self, projection: &str) -> Result<Position>;

    /// Deletes every report and the cursor of `projection`.
    async fn reset(&self, projection: &str) -> Result<()>;
}

/// Writes performed while projecting one event.
#[async_trait]
pub trait ReportTransaction: Send {
    async fn find(&mut self, cart_id: &AggregateId) -> Result<Option<CartReport>>;

    /// Inserts a new report; an existing row for the id is left unchanged.
    async fn insert(&mut self, report: CartReport) -> Result<()>;

    async fn set_checkout_date(
        &mut self,
        cart_id: &AggregateId,
        checkout_date: DateTime<Utc>,
    ) -> Result<()>;

    async fn save_offset(&mut self, projection: &str, position: Position) -> Result<()>;

    /// Makes every write of this unit of work visible at once.
    async fn commit(self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_wire_shape() {
        let report = CartReport::created(
            AggregateId::new("c1"),
            "2024-05-01T10:00:00Z".parse().unwrap(),
        );

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "id": "c1",
                "creationDate": "2024-05-01T10:00:00Z",
                "checkoutDate": null
            })
        );
    }
}
