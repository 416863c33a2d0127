// tests/common/mod.rs
pub use axum::Router;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::json;

use crate::credentials::{CredentialEntry, RegistryIdentity};
use crate::errors::FetchError;
use crate::orchestrator::RegistryTokenFetcher;
use crate::parser::payload::{decode_expiry, encode_test_token};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

pub fn identity(server: &str) -> RegistryIdentity {
    RegistryIdentity::new(server, "tenant-1", "sub-1")
}

/// Token whose payload carries `exp` only.
pub fn token_expiring_at(exp: DateTime<Utc>) -> String {
    encode_test_token(&json!({ "exp": exp.timestamp(), "tenant": "tenant-1" }))
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Expires(DateTime<Utc>),
    Opaque,
    Fail,
    Panic,
}

/// In-memory fetcher: answers per server and tracks how many fetches overlap.
pub struct ScriptedFetcher {
    outcomes: HashMap<String, Outcome>,
    delay: Duration,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(outcomes: impl IntoIterator<Item = (&'static str, Outcome)>) -> Self {
        Self {
            outcomes: outcomes
                .into_iter()
                .map(|(server, outcome)| (server.to_owned(), outcome))
                .collect(),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl RegistryTokenFetcher for ScriptedFetcher {
    async fn fetch(&self, identity: &RegistryIdentity) -> Result<CredentialEntry, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let server = identity.login_server.clone();
        match self.outcomes.get(&server).cloned().unwrap_or(Outcome::Fail) {
            Outcome::Expires(exp) => Ok(CredentialEntry::build(
                server,
                token_expiring_at(exp),
                decode_expiry,
            )),
            Outcome::Opaque => Ok(CredentialEntry::build(server, "not-a-jwt", decode_expiry)),
            Outcome::Fail => Err(FetchError::Status {
                server,
                status: http::StatusCode::UNAUTHORIZED,
            }),
            Outcome::Panic => panic!("fetch for {} blew up", server),
        }
    }
}
