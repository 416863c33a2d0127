use std::sync::Arc;

use tracing::info;

use crate::azure::fetcher::AcrRegistryFetcher;
use crate::azure::{BearerTokenProvider, RegistryEnumerator, TokenExchange};
use crate::credentials::RefreshCycleResult;
use crate::errors::CycleError;
use crate::observability::metrics::get_metrics;
use crate::orchestrator::cycle::run_cycle;
use crate::orchestrator::daemon::CycleRunner;
use crate::sinks::manager::SinkManager;

/// Wires the collaborators into one refresh pass.
pub struct CycleDriver<P, E, X> {
    pub provider: P,
    pub enumerator: E,
    pub exchange: Arc<X>,
    pub subscriptions: Vec<String>,
    pub max_concurrency: usize,
    pub sinks: SinkManager,
}

impl<P, E, X> CycleRunner for CycleDriver<P, E, X>
where
    P: BearerTokenProvider,
    E: RegistryEnumerator,
    X: TokenExchange + 'static,
{
    async fn run_once(&self) -> Result<RefreshCycleResult, CycleError> {
        let bearer = self.provider.bearer_token().await?;

        // every subscription must enumerate, a partial registry list would drop credentials silently
        let mut identities = Vec::new();
        for subscription in &self.subscriptions {
            let registries = self.enumerator.list_registries(subscription, &bearer).await?;
            identities.extend(registries);
        }

        let fetcher = Arc::new(AcrRegistryFetcher::new(self.exchange.clone(), bearer));
        let result = run_cycle(identities, fetcher, self.max_concurrency).await;

        let metrics = get_metrics().await;
        metrics.credentials_published.set(result.credentials.len() as i64);
        if let Some(min) = result.min_valid_until {
            metrics.credential_min_expiry_unix.set(min.timestamp());
        }

        let report = self.sinks.publish(&result.credentials).await;
        info!(
            registries = result.credentials.len(),
            failures = result.failure_count,
            sinks_ok = report.succeeded.len(),
            sinks_failed = report.failed.len(),
            "credentials published"
        );

        Ok(result)
    }
}
