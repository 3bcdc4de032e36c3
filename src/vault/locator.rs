//! Store locator parsing.
//!
//! A locator is a URL whose query string carries every store-specific
//! setting:
//!
//! ```text
//! https://vault.internal:8200/?path=/secret/app&path=/secret/shared&method=k8s&roleName=app
//! ```

use std::collections::HashSet;
use std::time::Duration;

use sha2::{Digest, Sha256};
use url::Url;

use super::auth::MethodKind;
use crate::errors::{Error, Result};
use crate::secrets::SecretString;
use crate::vars::parse_bool;

/// Request timeout when the locator does not set one.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
/// Lowest accepted request timeout; smaller values are raised to it.
pub const MIN_TIMEOUT_MS: u64 = 100;

/// Parsed store locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// `http://host[:port]` or `https://host[:port]`, no trailing slash.
    pub base_url: String,
    pub host: String,
    /// Normalized, de-duplicated secret paths in declaration order.
    pub paths: Vec<String>,
    pub method: Option<MethodKind>,
    pub mount_path: Option<String>,
    pub role_name: Option<String>,
    pub role_id: Option<String>,
    pub secret_id: Option<SecretString>,
    pub region: Option<String>,
    pub server_id: Option<String>,
    pub timeout: Duration,
    pub allow_untrusted: bool,
}

impl Locator {
    /// Parses a locator string. Every failure is a configuration error.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|_| Error::config("Invalid Vault url"))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::config("Unsupported Vault url protocol"));
        }
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(Error::config("Invalid Vault url")),
        };
        if !url.path().is_empty() && url.path() != "/" {
            return Err(Error::config("Invalid Vault url"));
        }

        let base_url = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        let mut raw_paths = Vec::new();
        let mut locator = Self {
            base_url,
            host,
            paths: Vec::new(),
            method: None,
            mount_path: None,
            role_name: None,
            role_id: None,
            secret_id: None,
            region: None,
            server_id: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            allow_untrusted: false,
        };

        let mut seen = HashSet::new();
        for (key, value) in url.query_pairs() {
            if key == "path" {
                raw_paths.push(value.into_owned());
                continue;
            }
            // The first occurrence of a repeated key wins.
            if !seen.insert(key.clone()) || value.is_empty() {
                continue;
            }
            let value = value.into_owned();
            match key.as_ref() {
                "mountPath" => locator.mount_path = Some(value),
                "roleName" => locator.role_name = Some(value),
                "roleId" => locator.role_id = Some(value),
                "secretId" => locator.secret_id = Some(SecretString::new(value)),
                "region" => locator.region = Some(value),
                "serverId" => locator.server_id = Some(value),
                "method" => {
                    locator.method = Some(value.parse().map_err(|_| {
                        Error::config("Invalid Vault url (method not supported)")
                    })?)
                }
                "timeout" => locator.timeout = parse_timeout(&value)?,
                "allowUntrusted" => {
                    locator.allow_untrusted = parse_bool(&value).ok_or_else(|| {
                        Error::config("Invalid Vault url (invalid allowUntrusted value)")
                    })?
                }
                _ => {}
            }
        }

        locator.paths = normalize_paths(&raw_paths)
            .ok_or_else(|| Error::config("Invalid Vault url (path not specified or invalid)"))?;

        Ok(locator)
    }

    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// `{base}/v1/auth/{mount}/login`
    pub fn login_url(&self, mount_path: &str) -> String {
        format!("{}/v1/auth/{}/login", self.base_url, mount_path.trim_matches('/'))
    }

    /// `{base}/v1{path}` for an already-normalized path.
    pub fn secret_url(&self, path: &str) -> String {
        format!("{}/v1{}", self.base_url, path)
    }
}

fn parse_timeout(value: &str) -> Result<Duration> {
    let ms: i64 = value
        .trim()
        .parse()
        .map_err(|_| Error::config("Invalid Vault url (invalid timeout value)"))?;
    Ok(Duration::from_millis(ms.max(MIN_TIMEOUT_MS as i64) as u64))
}

/// Normalizes one secret path: backslashes become slashes, slash runs
/// collapse, a trailing slash is dropped. Returns `None` when the result is
/// relative, empty, or the root.
pub fn normalize_path(raw: &str) -> Option<String> {
    let mut normalized = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    if normalized.ends_with('/') {
        normalized.pop();
    }

    if !normalized.starts_with('/') {
        return None;
    }
    Some(normalized)
}

/// Normalizes every path and drops repeats, keeping first occurrences in
/// order. Returns `None` if the list is empty or any entry is invalid.
pub fn normalize_paths(raw: &[String]) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for path in raw {
        let path = normalize_path(path)?;
        let digest = hex::encode(Sha256::digest(path.as_bytes()));
        if seen.insert(digest) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        None
    } else {
        Some(paths)
    }
}
