//! In-memory report store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Position;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{CartReport, ReportStore, ReportTransaction};
use crate::Result;

#[derive(Debug, Default)]
struct ReportState {
    reports: HashMap<AggregateId, CartReport>,
    offsets: HashMap<String, Position>,
}

/// Report store kept in process memory. Cloning shares the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReportStore {
    state: Arc<Mutex<ReportState>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed reports.
    pub async fn report_count(&self) -> usize {
        self.state.lock().await.reports.len()
    }
}

/// Holds the store lock until committed or dropped; writes are staged.
pub struct InMemoryReportTransaction {
    state: OwnedMutexGuard<ReportState>,
    reports: HashMap<AggregateId, CartReport>,
    offsets: HashMap<String, Position>,
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    type Transaction = InMemoryReportTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        Ok(InMemoryReportTransaction {
            state: Arc::clone(&self.state).lock_owned().await,
            reports: HashMap::new(),
            offsets: HashMap::new(),
        })
    }

    async fn get(&self, cart_id: &AggregateId) -> Result<Option<CartReport>> {
        Ok(self.state.lock().await.reports.get(cart_id).cloned())
    }

    async fn offset(&self, projection: &str) -> Result<Position> {
        let state = self.state.lock().await;
        Ok(state.offsets.get(projection).copied().unwrap_or_default())
    }

    async fn reset(&self, projection: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.reports.clear();
        state.offsets.remove(projection);
        Ok(())
    }
}

#[async_trait]
impl ReportTransaction for InMemoryReportTransaction {
    async fn find(&mut self, cart_id: &AggregateId) -> Result<Option<CartReport>> {
        Ok(self
            .reports
            .get(cart_id)
            .or_else(|| self.state.reports.get(cart_id))
            .cloned())
    }

    async fn insert(&mut self, report: CartReport) -> Result<()> {
        if !self.state.reports.contains_key(&report.id) {
            self.reports.entry(report.id.clone()).or_insert(report);
        }
        Ok(())
    }

    async fn set_checkout_date(
        &mut self,
        cart_id: &AggregateId,
        checkout_date: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(mut report) = self.find(cart_id).await? {
            report.checkout_date = Some(checkout_date);
            self.reports.insert(cart_id.clone(), report);
        }
        Ok(())
    }

    async fn save_offset(&mut self, projection: &str, position: Position) -> Result<()> {
        self.offsets.insert(projection.to_string(), position);
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        let reports = std::mem::take(&mut self.reports);
        let offsets = std::mem::take(&mut self.offsets);
        self.state.reports.extend(reports);
        self.state.offsets.extend(offsets);
        Ok(())
    }
}
