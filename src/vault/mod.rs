//! # Secrets Store Client
//!
//! Reads raw secrets for a load: parse the locator, pick and run a login
//! method, then read every configured path with the issued token.
//!
//! All collaborators that touch the network or the filesystem are injectable
//! on [`VaultLoader`] so the pipeline can run against a mock store.

pub mod auth;
pub mod aws;
pub mod client;
pub mod locator;
pub mod transport;

pub use auth::{AuthMethod, MethodKind, ResolvedAuth};
pub use client::{SecretMap, VaultClient};
pub use locator::Locator;
pub use transport::{
    HttpRequest, HttpResponse, HttpTransport, ImdsProbe, MetadataProbe, ReqwestTransport,
    METADATA_PROBE_TIMEOUT, METADATA_PROBE_URL,
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, Instrument};

use self::auth::LoginContext;
use self::aws::CredentialsProvider;
use crate::config::{TlsMaterial, VaultOptions};
use crate::env::EnvSource;
use crate::errors::Result;

/// Upper bound for the AWS credential endpoints; a shorter locator timeout
/// wins.
const CREDENTIALS_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs the secrets-store half of a load.
#[derive(Debug, Clone)]
pub struct VaultLoader {
    env: Arc<dyn EnvSource>,
    transport: Option<Arc<dyn HttpTransport>>,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    probe: Option<Arc<dyn MetadataProbe>>,
    probe_url: String,
    token_paths: Vec<PathBuf>,
}

impl VaultLoader {
    pub fn new(env: Arc<dyn EnvSource>) -> Self {
        Self {
            env,
            transport: None,
            credentials: None,
            probe: None,
            probe_url: METADATA_PROBE_URL.to_string(),
            token_paths: auth::DEFAULT_TOKEN_PATHS.iter().map(PathBuf::from).collect(),
        }
    }

    /// Replaces the reqwest transport built from the locator. The injected
    /// transport is also used for AWS credential endpoints.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the default AWS credential chain.
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Metadata URL probed during autodetection when no probe is injected.
    pub fn with_probe_url(mut self, url: impl Into<String>) -> Self {
        self.probe_url = url.into();
        self
    }

    /// Replaces the service-account token search list.
    pub fn with_token_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.token_paths = paths;
        self
    }

    /// Returns `None` when the store is disabled or no locator is set.
    pub async fn load(&self, options: &VaultOptions) -> Result<Option<SecretMap>> {
        let Some(raw) = options.locator(self.env.as_ref()) else {
            return Ok(None);
        };
        let locator = Locator::parse(&raw)?;
        let span = crate::vault_span!("load", locator.host, paths = locator.paths.len());
        self.load_locator(locator, options).instrument(span).await.map(Some)
    }

    async fn load_locator(&self, locator: Locator, options: &VaultOptions) -> Result<SecretMap> {
        let (transport, credential_transport) = match &self.transport {
            Some(transport) => (transport.clone(), transport.clone()),
            None => (
                self.store_transport(&locator, options)?,
                credential_transport(locator.timeout)?,
            ),
        };

        let probe: Arc<dyn MetadataProbe> = match &self.probe {
            Some(probe) => probe.clone(),
            None => Arc::new(ImdsProbe::new(
                self.probe_url.clone(),
                locator.timeout.min(METADATA_PROBE_TIMEOUT),
            )),
        };
        let resolved = auth::resolve(&locator, self.env.as_ref(), probe.as_ref()).await?;
        let payload = resolved
            .method
            .login_payload(&LoginContext {
                env: &self.env,
                transport: &credential_transport,
                token_paths: &self.token_paths,
                credentials: self.credentials.as_ref(),
            })
            .await?;

        let client = VaultClient::new(locator, transport);
        let token = client.login(&resolved.mount_path, &payload).await?;
        let secrets = client.read_secrets(&token).await?;

        info!(
            method = %resolved.method.kind(),
            keys = secrets.len(),
            "Loaded secrets from Vault"
        );
        Ok(secrets)
    }

    fn store_transport(
        &self,
        locator: &Locator,
        options: &VaultOptions,
    ) -> Result<Arc<dyn HttpTransport>> {
        let tls = if locator.is_https() {
            TlsMaterial::from_env(self.env.as_ref(), options)?
        } else {
            TlsMaterial::default()
        };
        let transport = ReqwestTransport::builder()
            .timeout(locator.timeout)
            .tls(tls)
            .allow_untrusted(locator.allow_untrusted)
            .build()?;
        Ok(Arc::new(transport))
    }
}

fn credential_transport(timeout: Duration) -> Result<Arc<dyn HttpTransport>> {
    let transport =
        ReqwestTransport::builder().timeout(timeout.min(CREDENTIALS_TIMEOUT)).build()?;
    Ok(Arc::new(transport))
}
