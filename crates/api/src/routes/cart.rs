//! Shopping cart command and query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::AggregateId;
use domain::{CartService, CartSnapshot, Checkout, OperationResult, UpdateItem};
use event_store::EventStore;
use projections::{CartReport, ReportStore};
use serde::Deserialize;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore, R: ReportStore> {
    pub cart_service: CartService<S>,
    pub reports: R,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub product_id: String,
    pub quantity: i32,
}

/// GET /cart/{id}: current items and checkout flag.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + 'static, R: ReportStore>(
    State(state): State<Arc<AppState<S, R>>>,
    Path(id): Path<String>,
) -> Result<Json<CartSnapshot>, ApiError> {
    let cart = state.cart_service.get(&AggregateId::new(id)).await?;
    Ok(Json(cart))
}

/// GET /cart/{id}/report: creation and checkout dates, once projected.
#[tracing::instrument(skip(state))]
pub async fn report<S: EventStore + 'static, R: ReportStore>(
    State(state): State<Arc<AppState<S, R>>>,
    Path(id): Path<String>,
) -> Result<Json<CartReport>, ApiError> {
    let cart_id = AggregateId::new(id);
    state
        .reports
        .get(&cart_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "Couldn't find a shopping cart report for '{cart_id}'"
            ))
        })
}

/// POST /cart/{id}: sets the quantity of a product. Zero removes it.
///
/// A body that is not a valid item update is answered with 400.
#[tracing::instrument(skip(state, payload))]
pub async fn update_item<S: EventStore + 'static, R: ReportStore>(
    State(state): State<Arc<AppState<S, R>>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> Result<Json<OperationResult>, ApiError> {
    let Json(req) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    tracing::debug!(product_id = %req.product_id, quantity = req.quantity, "updating cart item");
    let reply = state
        .cart_service
        .update_item(UpdateItem::new(id, req.product_id, req.quantity))
        .await?;
    confirmed(reply)
}

/// POST /cart/{id}/checkout
#[tracing::instrument(skip(state))]
pub async fn checkout<S: EventStore + 'static, R: ReportStore>(
    State(state): State<Arc<AppState<S, R>>>,
    Path(id): Path<String>,
) -> Result<Json<OperationResult>, ApiError> {
    let reply = state.cart_service.checkout(Checkout::new(id)).await?;
    confirmed(reply)
}

fn confirmed(reply: OperationResult) -> Result<Json<OperationResult>, ApiError> {
    match reply {
        OperationResult::Confirmed => Ok(Json(reply)),
        OperationResult::Rejected { reason } => Err(ApiError::BadRequest(reason)),
    }
}
