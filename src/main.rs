mod app;
mod auth;
mod client;
mod clock;
mod config;
mod constants;
mod error;
mod handlers;
mod models;
mod rate_limit;
mod store;
mod validate;

use log::{debug, error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use app::{build_router, Services};
use auth::Authenticator;
use clock::{Clock, SystemClock};
use config::load_config;
use constants::RATE_LIMIT_SWEEP_INTERVAL_SECS;
use rate_limit::{RateLimiter, WindowPolicy};
use store::{CustomerStore, PgCustomerStore};

#[tokio::main]
async fn main() {
    let config = load_config();
    init_logging(config.debug_mode);

    info!("apds-api starting up");
    debug!("Config: {:?}", config);

    // Without a reachable store the service must not start serving.
    let database_url = match config.database_url.as_deref() {
        Some(url) => url,
        None => {
            error!("DATABASE_URL must be set (environment or config file)");
            std::process::exit(1);
        }
    };
    let store = match PgCustomerStore::connect(database_url, config.db_max_connections).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = store.ensure_schema().await {
        error!("Failed to prepare database schema: {}", e);
        std::process::exit(1);
    }
    let store: Arc<dyn CustomerStore> = Arc::new(store);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let limiter = Arc::new(RateLimiter::new(
        WindowPolicy {
            max_requests: config.login_rate_limit_max,
            window_secs: config.login_rate_limit_window_secs,
        },
        WindowPolicy {
            max_requests: config.register_rate_limit_max,
            window_secs: config.register_rate_limit_window_secs,
        },
        clock,
    ));
    let authenticator = Arc::new(Authenticator::new(store.clone()));

    let app = build_router(
        Services {
            authenticator,
            limiter: limiter.clone(),
            store,
        },
        &config.cors_allowed_origin,
        config.trust_forwarded_for,
    );

    tokio::spawn(rate_limit::sweep_task(
        limiter,
        Duration::from_secs(RATE_LIMIT_SWEEP_INTERVAL_SECS),
    ));

    let addr: SocketAddr = match config.service_address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid service address {}: {}", config.service_address, e);
            std::process::exit(1);
        }
    };

    info!("Server listening on {}", addr);
    let server = axum::Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr, _>())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        error!("Server error: {}", e);
    }
}

/// Send `log` records to syslog, or to stderr through `tracing-subscriber`
/// when no syslog socket is available.
fn init_logging(debug_mode: bool) {
    let level = if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let formatter = syslog::Formatter3164 {
        facility: syslog::Facility::LOG_DAEMON,
        hostname: None,
        process: "apds-api".into(),
        pid: std::process::id(),
    };
    match syslog::unix(formatter) {
        Ok(logger) => {
            if log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger))).is_ok() {
                log::set_max_level(level);
            }
        }
        Err(e) => {
            eprintln!("Failed to connect to syslog: {}, falling back to stderr", e);
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => { info!("Received Ctrl+C, shutting down"); }
                    _ = sigterm.recv() => { info!("Received SIGTERM, shutting down"); }
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                let _ = ctrl_c.await;
                info!("Received Ctrl+C, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("Received Ctrl+C, shutting down");
    }
}
