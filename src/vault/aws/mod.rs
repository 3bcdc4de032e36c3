//! AWS support for the IAM login method: request signing and the
//! credential-provider chain.

mod credentials;
pub mod sigv4;

pub use credentials::{
    ContainerProvider, CredentialsChain, InstanceMetadataProvider, WebIdentityProvider,
};

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::secrets::SecretString;

/// Time-bounded AWS credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
    pub expiration: Option<DateTime<Utc>>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key),
            session_token: None,
            expiration: None,
        }
    }

    pub fn with_session_token<T: Into<String>>(mut self, token: Option<T>) -> Self {
        self.session_token = token.map(SecretString::new);
        self
    }

    pub fn with_expiration(mut self, expiration: Option<DateTime<Utc>>) -> Self {
        self.expiration = expiration;
        self
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key)
            .field("session_token", &self.session_token)
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// A source of AWS credentials.
#[async_trait]
pub trait CredentialsProvider: Send + Sync + fmt::Debug {
    /// Short label used in logs and chain errors.
    fn name(&self) -> &'static str;

    async fn credentials(&self) -> Result<AwsCredentials>;
}

/// Fixed credentials, mostly for tests and embedders that already hold keys.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub AwsCredentials);

#[async_trait]
impl CredentialsProvider for StaticCredentials {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn credentials(&self) -> Result<AwsCredentials> {
        Ok(self.0.clone())
    }
}
