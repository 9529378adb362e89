//! PostgreSQL report store.
//!
//! Uses the `cart_reports` and `projection_offsets` tables created by the
//! workspace migrations (see `PostgresEventStore::run_migrations`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Position;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::{CartReport, ReportStore, ReportTransaction};
use crate::Result;

/// Report store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PostgresReportStore {
    pool: PgPool,
}

impl PostgresReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// A database transaction. Rolled back when dropped uncommitted.
pub struct PostgresReportTransaction {
    tx: Transaction<'static, Postgres>,
}

fn row_to_report(row: &PgRow) -> Result<CartReport> {
    Ok(CartReport {
        id: AggregateId::new(row.try_get::<String, _>("id")?),
        creation_date: row.try_get("creation_date")?,
        checkout_date: row.try_get("checkout_date")?,
    })
}

#[async_trait]
impl ReportStore for PostgresReportStore {
    type Transaction = PostgresReportTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        Ok(PostgresReportTransaction {
            tx: self.pool.begin().await?,
        })
    }

    async fn get(&self, cart_id: &AggregateId) -> Result<Option<CartReport>> {
        let row = sqlx::query(
            "SELECT id, creation_date, checkout_date FROM cart_reports WHERE id = $1",
        )
        .bind(cart_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_report).transpose()
    }

    async fn offset(&self, projection: &str) -> Result<Position> {
        let position: Option<i64> = sqlx::query_scalar(
            "SELECT position FROM projection_offsets WHERE projection_name = $1",
        )
        .bind(projection)
        .fetch_optional(&self.pool)
        .await?;

        Ok(position.map(Position::new).unwrap_or_default())
    }

    async fn reset(&self, projection: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cart_reports")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM projection_offsets WHERE projection_name = $1")
            .bind(projection)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ReportTransaction for PostgresReportTransaction {
    async fn find(&mut self, cart_id: &AggregateId) -> Result<Option<CartReport>> {
        let row = sqlx::query(
            "SELECT id, creation_date, checkout_date FROM cart_reports WHERE id = $1 FOR UPDATE",
        )
        .bind(cart_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_report).transpose()
    }

    async fn insert(&mut self, report: CartReport) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_reports (id, creation_date, checkout_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(report.id.as_str())
        .bind(report.creation_date)
        .bind(report.checkout_date)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn set_checkout_date(
        &mut self,
        cart_id: &AggregateId,
        checkout_date: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE cart_reports SET checkout_date = $2 WHERE id = $1")
            .bind(cart_id.as_str())
            .bind(checkout_date)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn save_offset(&mut self, projection: &str, position: Position) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projection_offsets (projection_name, position)
            VALUES ($1, $2)
            ON CONFLICT (projection_name) DO UPDATE SET position = EXCLUDED.position
            "#,
        )
        .bind(projection)
        .bind(position.as_i64())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
