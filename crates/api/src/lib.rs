//! HTTP API server for the event-sourced shopping cart.
//!
//! Exposes cart commands, cart state and the cart report over REST, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::CartService;
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{CartReportProjection, ProjectionProcessor, ReportStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::cart::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, R>(state: Arc<AppState<S, R>>, metrics_handle: PrometheusHandle) -> Router
where
    S: EventStore + 'static,
    R: ReportStore,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/cart/{id}",
            get(routes::cart::get::<S, R>).post(routes::cart::update_item::<S, R>),
        )
        .route("/cart/{id}/checkout", post(routes::cart::checkout::<S, R>))
        .route("/cart/{id}/report", get(routes::cart::report::<S, R>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the cart service and the report projector over the given stores.
pub fn create_state<S, R>(
    event_store: S,
    report_store: R,
    config: &Config,
) -> (Arc<AppState<S, R>>, Arc<ProjectionProcessor<S>>)
where
    S: EventStore + Clone + 'static,
    R: ReportStore + Clone,
{
    let cart_service = CartService::with_settings(
        event_store.clone(),
        config.number_of_shards,
        config.ask_timeout,
    )
    .with_idle_timeout(config.entity_idle_timeout);

    let mut processor = ProjectionProcessor::new(event_store);
    processor.register(Box::new(CartReportProjection::new(report_store.clone())));
    let processor = Arc::new(processor);

    let state = Arc::new(AppState {
        cart_service,
        reports: report_store,
    });

    (state, processor)
}
