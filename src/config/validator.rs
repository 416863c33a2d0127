//! Configuration validation with aggregated errors.
//! - required identity fields
//! - at least one subscription
//! - scheduling and concurrency bounds

use crate::config::settings::{ScheduleConfig, ServiceConfig};

pub fn validate_service_config(cfg: &ServiceConfig, errors: &mut Vec<String>) {
    let identity = &cfg.identity;
    for (field, value) in [
        ("tenant (AZURE_TENANT)", &identity.tenant_id),
        ("client id (AZURE_CLIENT)", &identity.client_id),
        ("client secret (AZURE_CLIENT_SECRET)", &identity.client_secret),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{} is required", field));
        }
    }

    if cfg.subscriptions.is_empty() {
        errors.push("at least one subscription (AZURE_SUBSCRIPTION) is required".to_owned());
    }

    for (field, url) in [
        ("authority host", &identity.authority_host),
        ("resource manager endpoint", &identity.resource_manager),
    ] {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            errors.push(format!("{} '{}' must be an http(s) url", field, url));
        }
    }

    if cfg.fetch.max_concurrency == 0 {
        errors.push("max concurrency must be > 0".to_owned());
    }
    if cfg.fetch.http_timeout.is_zero() {
        errors.push("http timeout must be > 0".to_owned());
    }

    validate_schedule(&cfg.schedule, errors);
}

fn validate_schedule(schedule: &ScheduleConfig, errors: &mut Vec<String>) {
    if schedule.refresh_advance_seconds > 60 * 60 * 24 {
        errors.push(format!(
            "refresh advance ({}s) is unreasonably large",
            schedule.refresh_advance_seconds
        ));
    }
    if let Some(interval) = schedule.refresh_interval {
        if interval.is_zero() {
            errors.push("refresh interval must be > 0".to_owned());
        }
    }
}
