use std::path::{Path, PathBuf};

use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::errors::{Error, Result};

/// Service-account token locations, searched in order.
pub const DEFAULT_TOKEN_PATHS: [&str; 2] = [
    "/var/run/secrets/kubernetes.io/serviceaccount/token",
    "/run/secrets/kubernetes.io/serviceaccount/token",
];

/// `{role, jwt}` with the token of the first existing file in `token_paths`.
pub(super) fn payload(role: &str, token_paths: &[PathBuf]) -> Result<JsonValue> {
    let jwt = read_token(token_paths)?;
    Ok(json!({ "role": role, "jwt": jwt }))
}

fn read_token(token_paths: &[PathBuf]) -> Result<String> {
    let path = token_paths
        .iter()
        .map(PathBuf::as_path)
        .find(|path| path.is_file())
        .ok_or_else(|| Error::auth("Unable to locate K8S service account token file"))?;
    debug!(path = %path.display(), "Using service account token");
    read_trimmed(path)
}

fn read_trimmed(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path)
        .map_err(|e| Error::io(e, format!("reading {}", path.display())))?;
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::auth(format!("service account token {} is empty", path.display())));
    }
    Ok(token.to_string())
}
