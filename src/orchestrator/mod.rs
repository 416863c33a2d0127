//! Credential refresh orchestration: one cycle fans out a fetch per registry, a single
//! aggregator folds the results into a `CredentialSet`, and the daemon loop sleeps until
//! shortly before the earliest expiry.

use std::future::Future;

use crate::credentials::{CredentialEntry, RegistryIdentity};
use crate::errors::FetchError;

pub mod cycle;
pub mod daemon;
pub mod driver;
pub mod scheduler;

/// Produces the credential of one registry. Must eventually complete or fail.
pub trait RegistryTokenFetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        identity: &RegistryIdentity,
    ) -> impl Future<Output = Result<CredentialEntry, FetchError>> + Send;
}
