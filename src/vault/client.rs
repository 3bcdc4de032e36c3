//! Login exchange and secret retrieval against the store's HTTP API.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::Value as JsonValue;
use tracing::{debug, Instrument};

use super::locator::Locator;
use super::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::errors::{Error, Result};
use crate::secrets::SecretString;

/// Raw secrets keyed as stored.
pub type SecretMap = HashMap<String, String>;

/// Store client bound to one locator.
#[derive(Debug, Clone)]
pub struct VaultClient {
    locator: Locator,
    transport: Arc<dyn HttpTransport>,
}

impl VaultClient {
    pub fn new(locator: Locator, transport: Arc<dyn HttpTransport>) -> Self {
        Self { locator, transport }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Posts `payload` to the login endpoint of `mount_path` and returns the
    /// access token.
    pub async fn login(&self, mount_path: &str, payload: &JsonValue) -> Result<SecretString> {
        let span = crate::vault_span!("login", self.locator.host, mount_path = %mount_path);
        async {
            let request = HttpRequest::new(Method::POST, self.locator.login_url(mount_path))
                .json(payload)?;
            let response =
                self.transport.send(request).await.map_err(|e| Error::auth(e.to_string()))?;

            let body = response.json();
            if let Some(message) = body.as_ref().and_then(first_error) {
                return Err(Error::auth(message));
            }
            if !response.status.is_success() {
                return Err(Error::auth(unexpected_status(&response)));
            }

            let token = body
                .as_ref()
                .and_then(|b| b.pointer("/auth/client_token"))
                .and_then(JsonValue::as_str)
                .filter(|token| !token.is_empty())
                .ok_or_else(|| Error::auth("token not found"))?;

            debug!("Logged in to Vault");
            Ok(SecretString::new(token))
        }
        .instrument(span)
        .await
    }

    /// Reads every locator path in order. Later paths overwrite earlier ones
    /// on key collisions; any failure discards everything read so far.
    pub async fn read_secrets(&self, token: &SecretString) -> Result<SecretMap> {
        let span = crate::vault_span!("read", self.locator.host, paths = self.locator.paths.len());
        async {
            let mut secrets = SecretMap::new();
            for path in &self.locator.paths {
                let values = self.read_path(token, path).await?;
                debug!(path = %path, keys = values.len(), "Read secret path");
                secrets.extend(values);
            }
            Ok::<_, Error>(secrets)
        }
        .instrument(span)
        .await
    }

    /// Reads one path. A 404 yields an empty map.
    pub async fn read_path(&self, token: &SecretString, path: &str) -> Result<SecretMap> {
        let request = HttpRequest::get(self.locator.secret_url(path))
            .header("X-Vault-Token", token.expose_secret())
            .header("Accept", "application/json");
        let response =
            self.transport.send(request).await.map_err(|e| Error::retrieval(e.to_string()))?;

        let body = response.json();
        if let Some(message) = body.as_ref().and_then(first_error) {
            return Err(Error::retrieval(message));
        }
        if response.status == StatusCode::NOT_FOUND {
            debug!(path = %path, "Secret path not found, treating as empty");
            return Ok(SecretMap::new());
        }
        if !response.status.is_success() {
            return Err(Error::retrieval(unexpected_status(&response)));
        }

        match body {
            Some(JsonValue::Object(mut object)) => {
                let data = match object.remove("data") {
                    Some(JsonValue::Object(inner)) => inner,
                    Some(other) => {
                        object.insert("data".to_string(), other);
                        object
                    }
                    None => object,
                };
                Ok(data.into_iter().map(|(key, value)| (key, flatten(value))).collect())
            }
            _ => Err(Error::retrieval("response is not a JSON object")),
        }
    }
}

/// First entry of a non-empty top-level `errors` array.
fn first_error(body: &JsonValue) -> Option<String> {
    let first = body.get("errors")?.as_array()?.first()?;
    Some(match first {
        JsonValue::String(message) => message.clone(),
        other => other.to_string(),
    })
}

fn unexpected_status(response: &HttpResponse) -> String {
    format!("unexpected status code {}", response.status.as_u16())
}

/// String form of a stored value: strings as is, everything else as
/// compact JSON text.
pub fn flatten(value: JsonValue) -> String {
    match value {
        JsonValue::String(s) => s,
        other => other.to_string(),
    }
}
