//! My Cloud Monitor Daemon
//!
//! Polls a WD My Cloud NAS and serves its health as sensor entities over a
//! JSON web API.

mod config;
mod coordinator;
mod error;
mod registry;
mod sensors;
mod snapshot;
mod state;
#[cfg(test)]
mod testing;
mod web;

use anyhow::{Context, Result};
use mycloud_nas::NasApi;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use coordinator::Coordinator;
use state::Integration;

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());

    let config = Config::load(&config_path).context("Failed to load configuration")?;
    info!("Loaded configuration from: {}", config_path);

    // Setup Unix signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // Set up the integration, retrying until the first refresh succeeds
    let integration = match setup_with_retry(
        &config,
        || mycloud_nas::connect(config.nas.credentials()),
        shutdown_signal(&mut sigterm, &mut sigint),
    )
    .await?
    {
        Some(integration) => Arc::new(integration),
        None => return Ok(()),
    };

    // Start poll loop
    let poll_task = tokio::spawn(poll_loop(integration.clone()));

    let result = serve(
        &config,
        integration.clone(),
        shutdown_signal(&mut sigterm, &mut sigint),
    )
    .await;

    poll_task.abort();
    let _ = poll_task.await;
    integration.teardown().await;

    result
}

/// Resolves on the first SIGTERM or SIGINT.
async fn shutdown_signal(sigterm: &mut Signal, sigint: &mut Signal) {
    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
        }
    }
}

/// Repeats integration setup until it succeeds or `shutdown` resolves.
///
/// Client construction errors are configuration problems and are returned
/// immediately; connection and first-refresh errors are retried. Returns
/// `None` on shutdown, after closing any session the interrupted attempt
/// opened.
async fn setup_with_retry<F, S>(
    config: &Config,
    mut connect: F,
    shutdown: S,
) -> Result<Option<Integration>>
where
    F: FnMut() -> mycloud_nas::Result<Box<dyn NasApi>>,
    S: Future<Output = ()>,
{
    let retry = Duration::from_secs(config.setup_retry.max(1));
    tokio::pin!(shutdown);

    loop {
        let client = connect().context("Failed to create NAS client")?;
        let coordinator = Arc::new(Coordinator::new(client, config.endpoints.extended));

        tokio::select! {
            result = Integration::setup(coordinator.clone(), config) => match result {
                Ok(integration) => return Ok(Some(integration)),
                Err(e) => warn!("Setup failed: {}. Retrying in {:?}", e, retry),
            },
            _ = &mut shutdown => {
                if let Err(e) = coordinator.close().await {
                    warn!("Failed to close NAS client: {}", e);
                }
                return Ok(None);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(retry) => {}
            _ = &mut shutdown => return Ok(None),
        }
    }
}

/// Serves the web API, if enabled, until `shutdown` resolves.
async fn serve<S>(config: &Config, integration: Arc<Integration>, shutdown: S) -> Result<()>
where
    S: Future<Output = ()>,
{
    if !config.web.enable {
        info!("Web API disabled");
        shutdown.await;
        return Ok(());
    }

    let app = web::create_router(integration);
    let addr: SocketAddr = config
        .web
        .listen
        .parse()
        .context("Invalid listen address")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Web API listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("Web server failed")?;
        }
        _ = shutdown => {}
    }
    Ok(())
}

/// Runs one fetch cycle per update interval.
///
/// Each wait starts after the previous cycle finished, so cycles never
/// overlap and interval changes apply from the next wait on.
async fn poll_loop(integration: Arc<Integration>) {
    let mut consecutive_errors: u32 = 0;
    let mut last_error_log = Instant::now();

    loop {
        tokio::time::sleep(integration.update_interval()).await;
        if let Err(e) = integration.refresh().await {
            consecutive_errors += 1;
            // Only log errors once per minute or on first error
            let elapsed = last_error_log.elapsed();
            if consecutive_errors == 1 || elapsed >= Duration::from_secs(60) {
                if consecutive_errors > 1 {
                    warn!(
                        "Update failed (repeated {} times in {:?}): {}",
                        consecutive_errors, elapsed, e
                    );
                } else {
                    warn!("Update failed: {}", e);
                }
                last_error_log = Instant::now();
            }
        } else {
            if consecutive_errors > 0 {
                info!("Update recovered after {} failures", consecutive_errors);
            }
            consecutive_errors = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, FakeNas};

    #[tokio::test(start_paused = true)]
    async fn test_setup_retries_after_failed_first_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let config = testing::config(dir.path());
        let nas = FakeNas::new();
        nas.fail_endpoint_times("system_info", 1);

        let started = tokio::time::Instant::now();
        let mut attempts = 0;
        let integration = setup_with_retry(
            &config,
            || {
                attempts += 1;
                Ok(Box::new(nas.clone()) as Box<dyn NasApi>)
            },
            std::future::pending(),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(attempts, 2);
        assert!(started.elapsed() >= Duration::from_secs(config.setup_retry));
        // The failed attempt released its session.
        assert_eq!(nas.closed(), 1);
        assert_eq!(integration.registry().entities().len(), 21);
        assert!(integration.status().update.last_update_success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_setup_closes_client() {
        let dir = tempfile::tempdir().unwrap();
        let config = testing::config(dir.path());
        let nas = FakeNas::new();
        nas.set_latency(Duration::from_secs(3600));

        let outcome = setup_with_retry(
            &config,
            || Ok(Box::new(nas.clone()) as Box<dyn NasApi>),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await
        .unwrap();

        assert!(outcome.is_none());
        assert_eq!(nas.closed(), 1);
    }

    #[tokio::test]
    async fn test_client_construction_errors_are_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let config = testing::config(dir.path());
        let mut attempts = 0;

        let result = setup_with_retry(
            &config,
            || {
                attempts += 1;
                Err(mycloud_nas::Error::UnsupportedHost("fake".to_string()))
            },
            std::future::pending(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_never_overlaps_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = testing::config(dir.path());
        config.options.update_interval = 30;
        let nas = FakeNas::new();
        let integration = Arc::new(testing::setup_integration(&nas, &config).await.unwrap());

        // Each endpoint call outlasts the poll interval.
        nas.set_latency(Duration::from_secs(45));
        let poll = tokio::spawn(poll_loop(integration.clone()));

        // An on-demand refresh lands while the loop's first cycle runs.
        tokio::time::sleep(Duration::from_secs(40)).await;
        integration.refresh().await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;

        poll.abort();
        let _ = poll.await;

        // One cycle at a time: at most the five extended calls joined together.
        assert_eq!(nas.max_in_flight(), 5);
        let status = integration.status();
        assert!(status.update.cycles >= 4);
        assert_eq!(status.update.failures, 0);
    }
}
