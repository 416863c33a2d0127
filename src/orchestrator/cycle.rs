use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::credentials::{
    CredentialEntry, CredentialSet, CredentialSetBuilder, RefreshCycleResult, RegistryIdentity,
};
use crate::errors::FetchError;
use crate::observability::metrics::get_metrics;
use crate::orchestrator::RegistryTokenFetcher;

/// Handed from a fetch task to the aggregator.
struct Completion {
    server: String,
    result: Result<CredentialEntry, FetchError>,
}

/// Run one refresh cycle over `identities`.
///
/// Every registry is fetched in its own task, at most `max_concurrency` at a time.
/// Failed fetches are logged and left out; they never affect other registries.
/// The result is only assembled once every launched task has terminated.
pub async fn run_cycle<F>(
    identities: Vec<RegistryIdentity>,
    fetcher: Arc<F>,
    max_concurrency: usize,
) -> RefreshCycleResult
where
    F: RegistryTokenFetcher,
{
    let identities = dedup_by_server(identities);
    let launched = identities.len();
    info!(registries = launched, max_concurrency, "refresh cycle start");

    let (tx, rx) = mpsc::channel::<Completion>(launched.max(1));
    let aggregator = tokio::spawn(aggregate(rx));

    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut servers_by_task = HashMap::with_capacity(launched);

    for identity in identities {
        let tx = tx.clone();
        let fetcher = fetcher.clone();
        let semaphore = semaphore.clone();
        let server = identity.login_server.clone();

        let handle = tasks.spawn(async move {
            // the semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            let start = Instant::now();
            let result = fetcher.fetch(&identity).await;

            get_metrics()
                .await
                .registry_fetch_duration
                .with_label_values(&[identity.login_server.as_str()])
                .observe(start.elapsed().as_secs_f64());

            let _ = tx
                .send(Completion {
                    server: identity.login_server,
                    result,
                })
                .await;
        });
        servers_by_task.insert(handle.id(), server);
    }
    // the aggregator sees the channel close only after the last task drops its sender
    drop(tx);

    let mut aborted = 0usize;
    while let Some(joined) = tasks.join_next().await {
        if let Err(join_error) = joined {
            let server = servers_by_task
                .get(&join_error.id())
                .cloned()
                .unwrap_or_default();
            let err = FetchError::Aborted {
                server: server.to_owned(),
                reason: join_error.to_string(),
            };
            error!(server = %server, error = %err, "fetch task did not complete");
            record_failure(&err, &server).await;
            aborted += 1;
        }
    }

    let (credentials, failures) = match aggregator.await {
        Ok(aggregated) => aggregated,
        Err(join_error) => {
            error!("credential aggregation aborted: {}", join_error);
            (CredentialSet::default(), launched.saturating_sub(aborted))
        }
    };

    let result = RefreshCycleResult::new(credentials, failures + aborted, launched);
    info!(
        refreshed = result.credentials.len(),
        failed = result.failure_count,
        unknown_expiry = result.unknown_expiry_count,
        min_valid_until = ?result.min_valid_until,
        "refresh cycle complete"
    );
    result
}

/// Single writer of the in-progress set.
async fn aggregate(mut rx: mpsc::Receiver<Completion>) -> (CredentialSet, usize) {
    let mut builder = CredentialSetBuilder::new();
    let mut failures = 0usize;

    while let Some(Completion { server, result }) = rx.recv().await {
        match result {
            Ok(entry) => {
                debug!(server = %server, valid_until = ?entry.valid_until, "registry refreshed");
                if builder.insert(entry).is_some() {
                    warn!(server = %server, "duplicate credential replaced");
                }
            }
            Err(err) => {
                warn!(server = %server, error = %err, "failed to fetch registry refresh token");
                record_failure(&err, &server).await;
                failures += 1;
            }
        }
    }

    (builder.finish(), failures)
}

async fn record_failure(err: &FetchError, server: &str) {
    get_metrics()
        .await
        .registry_fetch_failures
        .with_label_values(&[server, err.reason()])
        .inc();
}

/// The same registry can be visible from several subscriptions; fetch it once.
fn dedup_by_server(identities: Vec<RegistryIdentity>) -> Vec<RegistryIdentity> {
    let mut seen = HashSet::with_capacity(identities.len());
    identities
        .into_iter()
        .filter(|identity| {
            let first = seen.insert(identity.login_server.clone());
            if !first {
                debug!(server = %identity.login_server, subscription = %identity.subscription_id, "registry already scheduled");
            }
            first
        })
        .collect()
}
