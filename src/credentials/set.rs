use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::credentials::entry::CredentialEntry;

/// All credentials produced by one cycle, keyed by server.
///
/// Only the aggregator builds one; afterwards it is read-only.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    entries: HashMap<String, CredentialEntry>,
}

impl CredentialSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, server: &str) -> Option<&CredentialEntry> {
        self.entries.get(server)
    }

    pub fn contains(&self, server: &str) -> bool {
        self.entries.contains_key(server)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CredentialEntry> {
        self.entries.values()
    }

    /// Servers in sorted order.
    pub fn servers(&self) -> Vec<&str> {
        let mut servers: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        servers.sort_unstable();
        servers
    }

    /// Earliest known expiry among present entries.
    pub fn min_valid_until(&self) -> Option<DateTime<Utc>> {
        self.entries.values().filter_map(|e| e.valid_until).min()
    }

    pub fn unknown_expiry_count(&self) -> usize {
        self.entries.values().filter(|e| e.valid_until.is_none()).count()
    }

    pub fn to_docker_config(&self) -> DockerConfig {
        DockerConfig {
            auths: self
                .entries
                .iter()
                .map(|(server, entry)| {
                    (
                        server.to_owned(),
                        DockerConfigEntry {
                            auth: entry.auth_blob.to_owned(),
                            identitytoken: entry.refresh_token.to_owned(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Mutable side of a `CredentialSet`, owned by the single aggregation task.
#[derive(Debug, Default)]
pub struct CredentialSetBuilder {
    entries: HashMap<String, CredentialEntry>,
}

impl CredentialSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry it replaced, if the server was already present.
    pub fn insert(&mut self, entry: CredentialEntry) -> Option<CredentialEntry> {
        self.entries.insert(entry.server.to_owned(), entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> CredentialSet {
        CredentialSet {
            entries: self.entries,
        }
    }
}

impl FromIterator<CredentialEntry> for CredentialSet {
    fn from_iter<I: IntoIterator<Item = CredentialEntry>>(iter: I) -> Self {
        let mut builder = CredentialSetBuilder::new();
        for entry in iter {
            builder.insert(entry);
        }
        builder.finish()
    }
}

/// Output of one orchestration pass.
#[derive(Debug, Clone, Default)]
pub struct RefreshCycleResult {
    pub credentials: CredentialSet,
    /// `None` when no present entry has a known expiry
    pub min_valid_until: Option<DateTime<Utc>>,
    pub failure_count: usize,
    pub unknown_expiry_count: usize,
    /// registries fetched this cycle
    pub launched: usize,
}

impl RefreshCycleResult {
    pub fn new(credentials: CredentialSet, failure_count: usize, launched: usize) -> Self {
        Self {
            min_valid_until: credentials.min_valid_until(),
            unknown_expiry_count: credentials.unknown_expiry_count(),
            credentials,
            failure_count,
            launched,
        }
    }
}

/// ================================
/// Docker registry credential file
/// ================================
///
/// `{"auths": {"<server>": {"auth": "...", "identitytoken": "..."}}}`
#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct DockerConfig {
    pub auths: BTreeMap<String, DockerConfigEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DockerConfigEntry {
    pub auth: String,
    pub identitytoken: String,
}

impl DockerConfig {
    pub fn to_json_pretty(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::{json, Value};

    fn entry(server: &str, valid_until: Option<DateTime<Utc>>) -> CredentialEntry {
        CredentialEntry::build(server, format!("token-{}", server), |_| {
            valid_until.ok_or(crate::errors::DecodeError::SegmentCount(1))
        })
    }

    #[test]
    fn min_valid_until_ignores_unknown_expiry() {
        let now = Utc::now();
        let set: CredentialSet = vec![
            entry("a.azurecr.io", Some(now + Duration::seconds(7200))),
            entry("b.azurecr.io", None),
            entry("c.azurecr.io", Some(now + Duration::seconds(3600))),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 3);
        assert_eq!(set.min_valid_until(), Some(now + Duration::seconds(3600)));
        assert_eq!(set.unknown_expiry_count(), 1);
    }

    #[test]
    fn empty_set_has_no_expiry_and_empty_auths() {
        let result = RefreshCycleResult::new(CredentialSet::default(), 2, 2);
        assert!(result.min_valid_until.is_none());

        let doc: Value =
            serde_json::from_slice(&result.credentials.to_docker_config().to_json_pretty().unwrap())
                .unwrap();
        assert_eq!(doc, json!({"auths": {}}));
    }

    #[test]
    fn docker_config_uses_fixed_field_names() {
        let set: CredentialSet = vec![entry("a.azurecr.io", None)].into_iter().collect();
        let doc: Value =
            serde_json::from_slice(&set.to_docker_config().to_json_pretty().unwrap()).unwrap();

        let a = &doc["auths"]["a.azurecr.io"];
        assert_eq!(a["identitytoken"], "token-a.azurecr.io");
        assert_eq!(a["auth"], "MDAwMDAwMDAtMDAwMC0wMDAwLTAwMDAtMDAwMDAwMDAwMDAwOg==");
        assert_eq!(a.as_object().unwrap().len(), 2);
    }

    #[test]
    fn document_is_pretty_printed() {
        let set: CredentialSet = vec![entry("a.azurecr.io", None)].into_iter().collect();
        let text = String::from_utf8(set.to_docker_config().to_json_pretty().unwrap()).unwrap();
        assert!(text.starts_with("{\n  \"auths\": {\n"));
    }
}
