//! Read side of the shopping cart.
//!
//! This crate provides:
//! - [`Projection`] trait for applying events to a read model with a durable cursor
//! - [`ProjectionProcessor`] for feeding the global event stream to projections
//! - The cart report read model ([`CartReport`]), its stores and the
//!   [`CartReportProjection`] that maintains it

pub mod error;
pub mod processor;
pub mod projection;
pub mod report;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::Projection;
pub use report::{
    CartReport, CartReportProjection, InMemoryReportStore, PostgresReportStore, ReportStore,
    ReportTransaction,
};
