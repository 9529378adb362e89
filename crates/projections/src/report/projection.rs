//! Projection that maintains the cart report.

use async_trait::async_trait;
use domain::CartEvent;
use event_store::{EventEnvelope, Position};

use super::{CartReport, ReportStore, ReportTransaction};
use crate::projection::Projection;
use crate::{ProjectionError, Result};

/// Maintains one [`CartReport`] per cart.
///
/// - `ItemUpdated` creates the report with its timestamp as creation date,
///   unless a report already exists.
/// - `CheckedOut` sets the checkout date. A checkout with no report is a
///   [`ProjectionError::ConsistencyViolation`]: nothing is written and the
///   cursor does not move.
#[derive(Debug, Clone)]
pub struct CartReportProjection<R: ReportStore> {
    store: R,
}

impl<R: ReportStore> CartReportProjection<R> {
    pub const NAME: &'static str = "cart_report";

    pub fn new(store: R) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &R {
        &self.store
    }
}

#[async_trait]
impl<R: ReportStore> Projection for CartReportProjection<R> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[tracing::instrument(
        skip(self, event),
        fields(position = %event.position, cart_id = %event.aggregate_id)
    )]
    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        let mut tx = self.store.begin().await?;

        match event.decode::<CartEvent>()? {
            CartEvent::ItemUpdated(data) => {
                if tx.find(&data.cart_id).await?.is_none() {
                    tracing::debug!("Creating cart report");
                    tx.insert(CartReport::created(data.cart_id, data.timestamp))
                        .await?;
                }
            }
            CartEvent::CheckedOut(data) => {
                if tx.find(&data.cart_id).await?.is_none() {
                    return Err(ProjectionError::ConsistencyViolation {
                        cart_id: data.cart_id,
                        position: event.position,
                    });
                }
                tracing::debug!("Setting cart checkout date");
                tx.set_checkout_date(&data.cart_id, data.timestamp).await?;
            }
        }

        tx.save_offset(Self::NAME, event.position).await?;
        tx.commit().await
    }

    async fn position(&self) -> Result<Position> {
        self.store.offset(Self::NAME).await
    }

    async fn reset(&self) -> Result<()> {
        self.store.reset(Self::NAME).await
    }
}
