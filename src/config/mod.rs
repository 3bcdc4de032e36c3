//! # Configuration
//!
//! Options controlling how a load reaches the secrets store. Everything the
//! store needs beyond these names is carried by the locator string itself
//! (see [`crate::vault::Locator`]).

mod tls;

pub use tls::TlsMaterial;

use serde::{Deserialize, Serialize};

use crate::env::EnvSource;

/// Environment variable holding the store locator by default.
pub const DEFAULT_URL_ENV_VAR: &str = "VAULT_URL";
/// Environment variable naming the CA certificate file by default.
pub const DEFAULT_CA_CERT_ENV_VAR: &str = "VAULT_SSL_CACERT";
/// Environment variable naming the client certificate file by default.
pub const DEFAULT_CLIENT_CERT_ENV_VAR: &str = "VAULT_SSL_CLIENT_CERT";
/// Environment variable naming the client private key file by default.
pub const DEFAULT_CLIENT_KEY_ENV_VAR: &str = "VAULT_SSL_CLIENT_KEY";

/// Secrets-store options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VaultOptions {
    /// Skip the store entirely even when a locator is set.
    pub disable: bool,
    pub url_env_var: String,
    pub ca_cert_env_var: String,
    pub client_cert_env_var: String,
    pub client_key_env_var: String,
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            disable: false,
            url_env_var: DEFAULT_URL_ENV_VAR.to_string(),
            ca_cert_env_var: DEFAULT_CA_CERT_ENV_VAR.to_string(),
            client_cert_env_var: DEFAULT_CLIENT_CERT_ENV_VAR.to_string(),
            client_key_env_var: DEFAULT_CLIENT_KEY_ENV_VAR.to_string(),
        }
    }
}

impl VaultOptions {
    pub fn disabled() -> Self {
        Self { disable: true, ..Self::default() }
    }

    /// Overrides the locator variable name.
    pub fn with_url_env_var(mut self, name: impl Into<String>) -> Self {
        self.url_env_var = name.into();
        self
    }

    /// The locator string, if the store is enabled and the variable is set
    /// to a non-empty value.
    pub fn locator(&self, env: &dyn EnvSource) -> Option<String> {
        if self.disable {
            return None;
        }
        env.non_empty(&self.url_env_var)
    }
}
