//! API server entry point.

use api::config::{Config, LogFormat};
use event_store::{EventStore, InMemoryEventStore, PostgresEventStore};
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{InMemoryReportStore, PostgresReportStore, ReportStore};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Runs the projector in the background and serves HTTP until a shutdown signal.
async fn serve<S, R>(
    config: Config,
    event_store: S,
    report_store: R,
    metrics_handle: PrometheusHandle,
) where
    S: EventStore + Clone + 'static,
    R: ReportStore + Clone,
{
    let (state, processor) = api::create_state(event_store, report_store, &config);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let poll_interval = config.projection_poll_interval;
    let projector = tokio::spawn({
        let processor = processor.clone();
        async move {
            processor
                .run(poll_interval, async move {
                    let _ = stop_rx.await;
                })
                .await
        }
    });

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(
        %addr,
        shards = config.number_of_shards,
        ask_timeout_ms = config.ask_timeout.as_millis() as u64,
        "starting API server"
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    let _ = stop_tx.send(());
    match projector.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "projector stopped with an error"),
        Err(e) => tracing::error!(error = %e, "projector task failed"),
    }

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the stores and serve
    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to PostgreSQL");

            let event_store = PostgresEventStore::new(pool.clone());
            event_store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL stores");

            serve(
                config,
                event_store,
                PostgresReportStore::new(pool),
                metrics_handle,
            )
            .await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            serve(
                config,
                InMemoryEventStore::new(),
                InMemoryReportStore::new(),
                metrics_handle,
            )
            .await;
        }
    }
}
