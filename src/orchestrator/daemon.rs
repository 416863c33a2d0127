use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::select;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::credentials::RefreshCycleResult;
use crate::errors::CycleError;
use crate::helpers::time::{duration_until, now};
use crate::observability::metrics::{get_metrics, OUTCOME_FATAL, OUTCOME_SUCCESS};
use crate::orchestrator::scheduler::SchedulePolicy;
use crate::resilience::retry::RetrySettings;

/// One full refresh pass: authenticate, enumerate, fetch, publish.
pub trait CycleRunner: Send + Sync {
    fn run_once(&self) -> impl Future<Output = Result<RefreshCycleResult, CycleError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    OneShot,
    Daemon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Cycling,
    Idle { until: DateTime<Utc> },
}

pub struct Daemon<R: CycleRunner> {
    runner: R,
    policy: SchedulePolicy,
    mode: RunMode,
    retry: RetrySettings,
}

impl<R: CycleRunner> Daemon<R> {
    pub fn new(runner: R, policy: SchedulePolicy, mode: RunMode, retry: RetrySettings) -> Self {
        Self {
            runner,
            policy,
            mode,
            retry,
        }
    }

    /// Run cycles until `shutdown` resolves (daemon) or once (one-shot).
    ///
    /// A cycle in progress always finishes; `shutdown` is only observed while idle.
    /// In one-shot mode a fatal cycle error is returned, in daemon mode it is retried with backoff.
    pub async fn run<S>(&self, shutdown: S) -> Result<(), CycleError>
    where
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut state = DaemonState::Cycling;
        let mut failed_attempts = 0u32;

        loop {
            state = match state {
                DaemonState::Cycling => {
                    let wake = match self.cycle().await {
                        Ok(result) => {
                            failed_attempts = 0;
                            if self.mode == RunMode::OneShot {
                                return Ok(());
                            }
                            self.policy.next_wake(&result, now())
                        }
                        Err(err) if self.mode == RunMode::OneShot => return Err(err),
                        Err(err) => {
                            failed_attempts = failed_attempts.saturating_add(1);
                            let delay = self.retry.delay_for_attempt(failed_attempts);
                            error!(
                                error = %err,
                                attempt = failed_attempts,
                                retry_in_secs = delay.as_secs(),
                                "refresh cycle failed"
                            );
                            now() + TimeDelta::from_std(delay).unwrap_or(TimeDelta::seconds(1))
                        }
                    };
                    get_metrics().await.next_refresh_unix.set(wake.timestamp());
                    DaemonState::Idle { until: wake }
                }
                DaemonState::Idle { until } => {
                    let current = now();
                    let sleep_for = duration_until(until, current);
                    info!(
                        "Sleeping for {:.2} minutes ({})",
                        sleep_for.as_secs_f64() / 60.0,
                        until.to_rfc3339()
                    );
                    select! {
                        biased;
                        _ = &mut shutdown => {
                            info!("shutdown requested, stopping refresh loop");
                            return Ok(());
                        }
                        _ = tokio::time::sleep(sleep_for) => DaemonState::Cycling,
                    }
                }
            };
        }
    }

    async fn cycle(&self) -> Result<RefreshCycleResult, CycleError> {
        let metrics = get_metrics().await;
        match self.runner.run_once().await {
            Ok(result) => {
                metrics.refresh_cycles.with_label_values(&[OUTCOME_SUCCESS]).inc();
                Ok(result)
            }
            Err(err) => {
                metrics.refresh_cycles.with_label_values(&[OUTCOME_FATAL]).inc();
                Err(err)
            }
        }
    }
}

/// Resolves on SIGINT or SIGTERM. Handlers are installed before the first cycle,
/// so a signal arriving mid-cycle is seen once the loop goes idle.
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()> + Send> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    Ok(async move {
        select! {
            _ = sigint.recv() => info!("Received SIGINT (Ctrl+C). Initiating graceful shutdown..."),
            _ = sigterm.recv() => info!("Received SIGTERM. Initiating graceful shutdown..."),
        }
    })
}
