pub mod entry;
pub mod identity;
pub mod set;

pub use entry::CredentialEntry;
pub use identity::{BearerToken, RegistryIdentity};
pub use set::{CredentialSet, CredentialSetBuilder, DockerConfig, RefreshCycleResult};
