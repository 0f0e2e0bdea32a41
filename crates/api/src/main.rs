//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::state::Store;
use domain::{Clock, SystemClock};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{
    EmailConfig, LogMailer, Mailer, NotificationDispatcher, OutboxRelay, SmtpMailer,
};
use store::{InMemoryStore, PostgresStore};
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

fn mailer() -> Arc<dyn Mailer> {
    let Some(email) = EmailConfig::from_env() else {
        tracing::warn!("SMTP_HOST not set, notifications will only be logged");
        return Arc::new(LogMailer);
    };

    match SmtpMailer::new(&email) {
        Ok(mailer) => {
            tracing::info!(
                host = %email.smtp_host,
                port = email.smtp_port,
                "SMTP mailer configured"
            );
            Arc::new(mailer)
        }
        Err(error) => {
            tracing::error!(
                %error,
                "invalid SMTP configuration, notifications will only be logged"
            );
            Arc::new(LogMailer)
        }
    }
}

async fn serve<S: Store>(config: Config, store: S, metrics_handle: PrometheusHandle) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Outbox relay
    let relay = OutboxRelay::new(
        store.clone(),
        store.clone(),
        NotificationDispatcher::new(mailer()),
        config.relay(),
    )
    .with_clock(Arc::clone(&clock));
    let state = api::create_state(store, clock, relay.waker());

    let (stop_relay, relay_stopped) = oneshot::channel::<()>();
    let relay_task = tokio::spawn(relay.run(async move {
        let _ = relay_stopped.await;
    }));

    // HTTP server
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Let the relay finish its current tick.
    let _ = stop_relay.send(());
    if let Err(error) = relay_task.await {
        tracing::error!(%error, "outbox relay task failed");
    }

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the store and run
    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresStore::connect(&url, config.database_max_connections)
                .await
                .expect("failed to connect to database");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL store");
            serve(config, store, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            serve(config, InMemoryStore::new(), metrics_handle).await;
        }
    }
}
