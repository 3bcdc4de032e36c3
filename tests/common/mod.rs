//! Shared fixtures for integration tests
//!
//! Provides a wiremock-backed Vault server and loader wiring that never
//! touches the real process environment or the network beyond localhost.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use vaultenv::vault::{HttpTransport, MetadataProbe, ReqwestTransport};
use vaultenv::{Loader, MapEnv};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "s.test-token";

/// Metadata probe with a fixed answer.
#[derive(Debug)]
pub struct StaticProbe(pub bool);

#[async_trait]
impl MetadataProbe for StaticProbe {
    async fn is_reachable(&self) -> bool {
        self.0
    }
}

/// Mock Vault server
pub struct MockVault {
    pub server: MockServer,
}

impl MockVault {
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    /// Locator pointing at this server
    pub fn locator(&self, query: &str) -> String {
        format!("{}/?{}", self.server.uri(), query)
    }

    /// Login on `mount` succeeds once with [`TOKEN`]
    pub async fn accept_login(&self, mount: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/auth/{}/login", mount)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth": { "client_token": TOKEN, "lease_duration": 3600 }
            })))
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// `GET /v1{secret_path}` answers with `body` when called with [`TOKEN`]
    pub async fn secret(&self, secret_path: &str, body: JsonValue) {
        Mock::given(method("GET"))
            .and(path(format!("/v1{}", secret_path)))
            .and(header("X-Vault-Token", TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// `GET /v1{secret_path}` answers with a bare status and `body`
    pub async fn secret_status(&self, secret_path: &str, status: u16, body: JsonValue) {
        Mock::given(method("GET"))
            .and(path(format!("/v1{}", secret_path)))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }
}

pub fn transport() -> Arc<dyn HttpTransport> {
    Arc::new(ReqwestTransport::builder().max_retries(0).build().expect("transport"))
}

/// Loader over `env` with a localhost-only transport and no metadata service
pub fn loader(env: Arc<MapEnv>) -> Loader {
    Loader::new(env).with_transport(transport()).with_probe(Arc::new(StaticProbe(false)))
}
