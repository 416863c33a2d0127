use std::path::PathBuf;

use clap::Parser;

use crate::config::duration::parse_duration;
use crate::config::settings::{
    FetchConfig, IdentityConfig, KubernetesSecretConfig, LogFormat, LoggingConfig, MetricsConfig,
    ScheduleConfig, ServiceConfig, SinksConfig, AUTHORITY_HOST_DEFAULT, HTTP_TIMEOUT_DEFAULT,
    MAX_CONCURRENCY_DEFAULT, REFRESH_ADVANCE_SECONDS_DEFAULT, REFRESH_FLOOR_SECONDS,
    RESOURCE_MANAGER_DEFAULT,
};
use crate::config::validator;
use crate::errors::ConfigError;
use crate::utils::logging::LogLevel;

/// Command line flags. Every flag falls back to an environment variable; flags win.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// docker config file to write, e.g. ~/.docker/config.json
    #[arg(long, env = "DOCKER_CONFIG_PATH")]
    pub docker_config: Option<PathBuf>,

    /// keep running and refresh credentials before they expire
    #[arg(short, long, env = "DAEMON")]
    pub daemon: bool,

    #[arg(long, env = "AZURE_TENANT")]
    pub tenant: Option<String>,

    /// one or more subscriptions, repeat the flag or separate with commas
    #[arg(long, env = "AZURE_SUBSCRIPTION", value_delimiter = ',')]
    pub subscription: Vec<String>,

    #[arg(long, env = "AZURE_CLIENT")]
    pub client_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    #[arg(long, env = "KUBERNETES_SECRET_NAMESPACE")]
    pub k8s_secret_namespace: Option<String>,

    #[arg(long, env = "KUBERNETES_SECRET_NAME")]
    pub k8s_secret_name: Option<String>,

    #[arg(long, env = "KUBERNETES_SECRET_FILENAME")]
    pub k8s_secret_filename: Option<String>,

    /// fixed refresh interval (e.g. 30m, 1h30m), never later than the earliest expiry
    #[arg(long, env = "REFRESH_INTERVAL")]
    pub refresh: Option<String>,

    /// seconds to refresh before the earliest credential expires
    #[arg(long, env = "REFRESH_ADVANCE_SECONDS", default_value_t = REFRESH_ADVANCE_SECONDS_DEFAULT)]
    pub refresh_advance: u64,

    /// maximum number of registries fetched in parallel
    #[arg(long, env = "MAX_CONCURRENCY", default_value_t = MAX_CONCURRENCY_DEFAULT)]
    pub max_concurrency: usize,

    #[arg(long, env = "HTTP_TIMEOUT", default_value = HTTP_TIMEOUT_DEFAULT)]
    pub http_timeout: String,

    #[arg(long, env = "AZURE_AUTHORITY_HOST", default_value = AUTHORITY_HOST_DEFAULT)]
    pub authority_host: String,

    #[arg(long, env = "AZURE_RESOURCE_MANAGER_ENDPOINT", default_value = RESOURCE_MANAGER_DEFAULT)]
    pub resource_manager: String,

    /// serve prometheus metrics on host:port
    #[arg(long, env = "METRICS_LISTEN")]
    pub metrics_listen: Option<String>,

    #[arg(long, env = "LOG_LEVEL", value_enum, ignore_case = true)]
    pub log_level: Option<LogLevel>,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "compact")]
    pub log_format: LogFormat,
}

impl Args {
    /// Logging settings alone, so tracing can be up before the rest is validated.
    pub fn logging_config(&self) -> LoggingConfig {
        let level = self.log_level.unwrap_or(LogLevel::Info);
        LoggingConfig::new(level.as_str().to_owned(), self.log_format)
    }

    /// Resolve flags into the immutable service configuration.
    ///
    /// All problems are collected and reported together.
    pub fn into_config(self) -> Result<ServiceConfig, ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let logging = self.logging_config();

        let refresh_interval = match self.refresh.as_deref() {
            Some(raw) => parse_duration(raw)
                .map_err(|e| errors.push(format!("--refresh: {}", e)))
                .ok(),
            None => None,
        };
        let http_timeout = parse_duration(&self.http_timeout)
            .map_err(|e| errors.push(format!("--http-timeout: {}", e)))
            .unwrap_or_default();

        let kubernetes_secret = match (
            self.k8s_secret_namespace,
            self.k8s_secret_name,
            self.k8s_secret_filename,
        ) {
            (None, None, None) => None,
            (Some(namespace), Some(name), Some(key)) => Some(KubernetesSecretConfig { namespace, name, key }),
            _ => {
                errors.push(
                    "kubernetes secret sink needs namespace, name and filename together".to_owned(),
                );
                None
            }
        };

        let subscriptions: Vec<String> = self
            .subscription
            .into_iter()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();

        let config = ServiceConfig {
            identity: IdentityConfig {
                tenant_id: self.tenant.unwrap_or_default(),
                client_id: self.client_id.unwrap_or_default(),
                client_secret: self.client_secret.unwrap_or_default(),
                authority_host: self.authority_host,
                resource_manager: self.resource_manager,
            },
            subscriptions,
            schedule: ScheduleConfig {
                daemon: self.daemon,
                refresh_advance_seconds: self.refresh_advance,
                refresh_interval,
                floor_seconds: REFRESH_FLOOR_SECONDS,
            },
            fetch: FetchConfig {
                max_concurrency: self.max_concurrency,
                http_timeout,
            },
            sinks: SinksConfig {
                docker_config_path: self.docker_config,
                kubernetes_secret,
            },
            metrics: MetricsConfig {
                listen: self.metrics_listen,
            },
            logging,
        };

        validator::validate_service_config(&config, &mut errors);

        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
