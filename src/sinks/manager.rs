use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::settings::SinksConfig;
use crate::credentials::CredentialSet;
use crate::errors::SinkError;
use crate::observability::metrics::get_metrics;
use crate::sinks::sink_file::FileSink;
use crate::sinks::sink_secret::SecretSink;

pub enum SinkKind {
    File(FileSink),
    Secret(SecretSink),
}

impl SinkKind {
    pub fn name(&self) -> String {
        match self {
            SinkKind::File(s) => s.name(),
            SinkKind::Secret(s) => s.name(),
        }
    }

    pub async fn write(&self, content: &[u8]) -> Result<(), SinkError> {
        match self {
            SinkKind::File(s) => s.write(content).await,
            SinkKind::Secret(s) => s.write(content).await,
        }
    }
}

/// Outcome of publishing one credential set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

pub struct SinkManager {
    sinks: Vec<SinkKind>,
}

impl SinkManager {
    pub fn new(sinks: Vec<SinkKind>) -> Self {
        Self { sinks }
    }

    pub fn from_config(config: &SinksConfig) -> Self {
        let mut sinks = Vec::new();
        if let Some(path) = &config.docker_config_path {
            sinks.push(SinkKind::File(FileSink::new(path)));
        }
        if let Some(secret) = &config.kubernetes_secret {
            sinks.push(SinkKind::Secret(SecretSink::new(secret.clone())));
        }
        Self::new(sinks)
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Serialize once and hand the document to every sink.
    ///
    /// Sinks are independent: a failure is logged and counted, the others still run.
    pub async fn publish(&self, credentials: &CredentialSet) -> PublishReport {
        let metrics = get_metrics().await;
        let mut report = PublishReport::default();

        if self.is_empty() {
            warn!("no sink configured, credentials are not persisted");
            return report;
        }

        let document = match credentials.to_docker_config().to_json_pretty() {
            Ok(document) => document,
            Err(err) => {
                error!("failed to serialize docker config: {}", err);
                for sink in &self.sinks {
                    let name = sink.name();
                    metrics.sink_failures.with_label_values(&[name.as_str()]).inc();
                    report.failed.push(name);
                }
                return report;
            }
        };

        for sink in &self.sinks {
            let name = sink.name();
            let start = Instant::now();
            info!(sink = %name, registries = credentials.len(), "publishing credentials");

            match sink.write(&document).await {
                Ok(()) => {
                    metrics.sink_propagations.with_label_values(&[name.as_str()]).inc();
                    metrics
                        .sink_duration
                        .with_label_values(&[name.as_str()])
                        .observe(start.elapsed().as_secs_f64());
                    report.succeeded.push(name);
                }
                Err(err) => {
                    error!(sink = %name, error = %err, "unable to publish credentials");
                    metrics.sink_failures.with_label_values(&[name.as_str()]).inc();
                    report.failed.push(name);
                }
            }
        }

        report
    }
}
