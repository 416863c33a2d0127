use std::sync::Arc;

use acr_autologin::azure::build_http_client;
use acr_autologin::azure::exchange::AcrTokenExchange;
use acr_autologin::azure::identity::ServicePrincipalTokenProvider;
use acr_autologin::azure::registries::ArmRegistryEnumerator;
use acr_autologin::config::cli::Args;
use acr_autologin::errors::CycleError;
use acr_autologin::orchestrator::daemon::{shutdown_signal, Daemon, RunMode};
use acr_autologin::orchestrator::driver::CycleDriver;
use acr_autologin::orchestrator::scheduler::SchedulePolicy;
use acr_autologin::resilience::retry::RetrySettings;
use acr_autologin::server;
use acr_autologin::sinks::manager::SinkManager;
use acr_autologin::utils::logging;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read flags / env and init logging
    // -------------------------------

    let args = Args::parse();
    logging::init_logging(&args.logging_config());

    // -------------------------------
    // 2. Resolve and validate configuration, before any cycle
    // -------------------------------

    let service_config = args.into_config().inspect_err(|e| error!("{}", e))?;
    info!(config = ?service_config, "configuration loaded");

    // -------------------------------
    // 3. Build collaborators
    // -------------------------------

    let client = build_http_client(service_config.fetch.http_timeout).map_err(CycleError::from)?;
    let identity = &service_config.identity;

    let provider = ServicePrincipalTokenProvider::new(client.clone(), identity.clone());
    let enumerator =
        ArmRegistryEnumerator::new(client.clone(), &identity.resource_manager, &identity.tenant_id);
    let exchange = Arc::new(AcrTokenExchange::new(client));

    let sinks = SinkManager::from_config(&service_config.sinks);

    let driver = CycleDriver {
        provider,
        enumerator,
        exchange,
        subscriptions: service_config.subscriptions.clone(),
        max_concurrency: service_config.fetch.max_concurrency,
        sinks,
    };

    // -------------------------------
    // 4. Optional metrics endpoint
    // -------------------------------

    if let Some(listen) = service_config.metrics.listen.clone() {
        tokio::spawn(async move {
            if let Err(e) = server::server::start(&listen).await {
                error!("{:#}", e);
            }
        });
    }

    // -------------------------------
    // 5. Run once or keep refreshing
    // -------------------------------

    let mode = if service_config.schedule.daemon {
        RunMode::Daemon
    } else {
        RunMode::OneShot
    };
    let daemon = Daemon::new(
        driver,
        SchedulePolicy::from(&service_config.schedule),
        mode,
        RetrySettings::new(30_000, service_config.schedule.floor_seconds * 1000),
    );

    let shutdown = shutdown_signal().context("unable to install signal handlers")?;
    info!(mode = ?mode, "Service starting...");
    daemon.run(shutdown).await.inspect_err(|e| error!("{}", e))?;

    Ok(())
}
