use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Fallback sleep used when no usable expiry is known.
pub const REFRESH_FLOOR_SECONDS: u64 = 600;
/// Margin subtracted from the earliest expiry.
pub const REFRESH_ADVANCE_SECONDS_DEFAULT: u64 = 600;
pub const MAX_CONCURRENCY_DEFAULT: usize = 8;
pub const HTTP_TIMEOUT_DEFAULT: &str = "30s";
pub const AUTHORITY_HOST_DEFAULT: &str = "https://login.microsoftonline.com";
pub const RESOURCE_MANAGER_DEFAULT: &str = "https://management.azure.com/";

/// ================================
/// Full service configuration
/// ================================
///
/// Resolved once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub identity: IdentityConfig,
    pub subscriptions: Vec<String>,
    pub schedule: ScheduleConfig,
    pub fetch: FetchConfig,
    pub sinks: SinksConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// ================================
/// Azure identity
/// ================================
#[derive(Clone)]
pub struct IdentityConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// e.g. https://login.microsoftonline.com
    pub authority_host: String,
    /// ARM endpoint, also used as the token resource
    pub resource_manager: String,
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("authority_host", &self.authority_host)
            .field("resource_manager", &self.resource_manager)
            .finish()
    }
}

/// ================================
/// Refresh scheduling
/// ================================
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub daemon: bool,
    pub refresh_advance_seconds: u64,
    /// explicit interval override, never extends past the earliest expiry
    pub refresh_interval: Option<Duration>,
    pub floor_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            daemon: false,
            refresh_advance_seconds: REFRESH_ADVANCE_SECONDS_DEFAULT,
            refresh_interval: None,
            floor_seconds: REFRESH_FLOOR_SECONDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// invariant: > 0
    pub max_concurrency: usize,
    pub http_timeout: Duration,
}

/// ================================
/// Sinks
/// ================================
#[derive(Debug, Clone, Default)]
pub struct SinksConfig {
    pub docker_config_path: Option<PathBuf>,
    pub kubernetes_secret: Option<KubernetesSecretConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubernetesSecretConfig {
    pub namespace: String,
    pub name: String,
    /// data key the document is stored under
    pub key: String,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsConfig {
    /// host:port, metrics endpoint disabled when absent
    pub listen: Option<String>,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Json,
    Compact,
}
