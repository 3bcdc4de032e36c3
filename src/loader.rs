//! # Loader
//!
//! Orchestrates one load: secrets from the store, environment overlay,
//! validation, then optional republication into the environment. Nothing
//! is written to the environment unless every earlier step succeeded.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::VaultOptions;
use crate::env::{EnvSource, ProcessEnv};
use crate::errors::Result;
use crate::validation::{validate_values, Values};
use crate::vars::Variable;
use crate::vault::aws::CredentialsProvider;
use crate::vault::{HttpTransport, MetadataProbe, SecretMap, VaultLoader};

/// How environment variables combine with secrets from the store. Applied
/// only to names declared by the descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvOverride {
    /// Secrets only; the environment is not consulted.
    Ignore,
    /// The environment fills names the store did not provide.
    #[default]
    MergeMissing,
    /// A set environment variable always wins.
    Overwrite,
}

/// What to load and how.
#[derive(Debug, Clone)]
pub struct Options {
    pub vars: Vec<Arc<dyn Variable>>,
    /// Store settings; `None` skips the store.
    pub vault: Option<VaultOptions>,
    pub env_override: EnvOverride,
    /// Write validated values back into the environment.
    pub modify_env: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            vars: Vec::new(),
            vault: None,
            env_override: EnvOverride::default(),
            modify_env: true,
        }
    }
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }
}

/// Builder for [`Options`].
#[derive(Debug, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Adds one descriptor.
    pub fn var(mut self, var: impl Variable + 'static) -> Self {
        self.options.vars.push(Arc::new(var));
        self
    }

    /// Adds already shared descriptors.
    pub fn vars(mut self, vars: impl IntoIterator<Item = Arc<dyn Variable>>) -> Self {
        self.options.vars.extend(vars);
        self
    }

    pub fn vault(mut self, vault: VaultOptions) -> Self {
        self.options.vault = Some(vault);
        self
    }

    pub fn env_override(mut self, policy: EnvOverride) -> Self {
        self.options.env_override = policy;
        self
    }

    pub fn modify_env(mut self, modify: bool) -> Self {
        self.options.modify_env = modify;
        self
    }

    pub fn build(self) -> Options {
        self.options
    }
}

/// Runs loads against an injectable environment and store collaborators.
#[derive(Debug, Clone)]
pub struct Loader {
    env: Arc<dyn EnvSource>,
    vault: VaultLoader,
}

impl Loader {
    pub fn new(env: Arc<dyn EnvSource>) -> Self {
        Self { vault: VaultLoader::new(env.clone()), env }
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.vault = self.vault.with_transport(transport);
        self
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialsProvider>) -> Self {
        self.vault = self.vault.with_credentials(credentials);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.vault = self.vault.with_probe(probe);
        self
    }

    pub fn with_token_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.vault = self.vault.with_token_paths(paths);
        self
    }

    pub async fn load(&self, options: &Options) -> Result<Values> {
        let secrets = match &options.vault {
            Some(vault) => self.vault.load(vault).await?.unwrap_or_default(),
            None => SecretMap::new(),
        };

        let raw = overlay(secrets, &options.vars, self.env.as_ref(), options.env_override);
        let values = validate_values(&raw, &options.vars).await?;

        if options.modify_env {
            for (name, value) in &values {
                self.env.set_var(name, &value.to_env_string());
            }
            debug!(count = values.len(), "Republished validated values");
        }

        info!(count = values.len(), "Configuration loaded");
        Ok(values)
    }
}

/// Loads using the real process environment.
pub async fn load(options: &Options) -> Result<Values> {
    Loader::new(Arc::new(ProcessEnv)).load(options).await
}

/// Combines store secrets with environment values for the declared names.
/// An environment variable set to the empty string counts as present.
pub fn overlay(
    mut secrets: SecretMap,
    vars: &[Arc<dyn Variable>],
    env: &dyn EnvSource,
    policy: EnvOverride,
) -> HashMap<String, String> {
    if policy == EnvOverride::Ignore {
        return secrets;
    }
    for var in vars {
        let name = var.name();
        let Some(value) = env.var(name) else {
            continue;
        };
        if policy == EnvOverride::Overwrite || !secrets.contains_key(name) {
            secrets.insert(name.to_string(), value);
        }
    }
    secrets
}
