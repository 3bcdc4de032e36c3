//! # Authentication
//!
//! Picks one of the supported login methods for a locator and builds its
//! login payload. Resolution happens once per load; there is no fallback to
//! another method after a failed login.
//!
//! Without an explicit `method`, detection checks in order:
//! 1. AppRole credentials in the locator
//! 2. `KUBERNETES_SERVICE_HOST` in the environment
//! 3. `EC2_INSTANCE_ID` or `ECS_CONTAINER_METADATA_URI_V4` in the environment
//! 4. any answer from the instance metadata service

mod approle;
mod iam;
mod kubernetes;

pub use kubernetes::DEFAULT_TOKEN_PATHS;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use super::aws::CredentialsProvider;
use super::locator::Locator;
use super::transport::{HttpTransport, MetadataProbe};
use crate::env::EnvSource;
use crate::errors::{Error, Result};
use crate::secrets::SecretString;

/// Login method tokens accepted in a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    AppRole,
    Kubernetes,
    Iam,
}

impl MethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppRole => "approle",
            Self::Kubernetes => "k8s",
            Self::Iam => "iam",
        }
    }

    /// Mount path used when the locator does not name one.
    pub fn default_mount(&self) -> &'static str {
        match self {
            Self::AppRole => "approle",
            Self::Kubernetes => "kubernetes",
            Self::Iam => "aws",
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approle" => Ok(Self::AppRole),
            "k8s" => Ok(Self::Kubernetes),
            "iam" => Ok(Self::Iam),
            other => Err(Error::config(format!("unsupported auth method '{}'", other))),
        }
    }
}

/// A fully parameterized login method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    AppRole { role_id: String, secret_id: SecretString },
    Kubernetes { role: String },
    Iam { role: String, region: String, server_id: Option<String> },
}

impl AuthMethod {
    pub fn kind(&self) -> MethodKind {
        match self {
            Self::AppRole { .. } => MethodKind::AppRole,
            Self::Kubernetes { .. } => MethodKind::Kubernetes,
            Self::Iam { .. } => MethodKind::Iam,
        }
    }

    /// Builds the JSON body for the login endpoint.
    pub async fn login_payload(&self, ctx: &LoginContext<'_>) -> Result<JsonValue> {
        match self {
            Self::AppRole { role_id, secret_id } => Ok(approle::payload(role_id, secret_id)),
            Self::Kubernetes { role } => kubernetes::payload(role, ctx.token_paths),
            Self::Iam { role, region, server_id } => {
                let provider: Arc<dyn CredentialsProvider> = match ctx.credentials {
                    Some(provider) => provider.clone(),
                    None => Arc::new(super::aws::CredentialsChain::default_chain(
                        ctx.env.clone(),
                        ctx.transport.clone(),
                        region,
                    )),
                };
                iam::payload(role, region, server_id.as_deref(), provider.as_ref()).await
            }
        }
    }
}

/// Method plus the mount it logs in through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAuth {
    pub method: AuthMethod,
    pub mount_path: String,
}

/// Collaborators a login payload may need.
#[derive(Debug)]
pub struct LoginContext<'a> {
    pub env: &'a Arc<dyn EnvSource>,
    pub transport: &'a Arc<dyn HttpTransport>,
    pub token_paths: &'a [PathBuf],
    pub credentials: Option<&'a Arc<dyn CredentialsProvider>>,
}

/// Chooses the login method for `locator` and checks its parameters.
/// Parameter problems are configuration errors; a failed detection is an
/// authentication error.
pub async fn resolve(
    locator: &Locator,
    env: &dyn EnvSource,
    probe: &dyn MetadataProbe,
) -> Result<ResolvedAuth> {
    let kind = match locator.method {
        Some(kind) => kind,
        None => detect(locator, env, probe).await?,
    };

    let method = match kind {
        MethodKind::AppRole => match (&locator.role_id, &locator.secret_id) {
            (Some(role_id), Some(secret_id)) => {
                AuthMethod::AppRole { role_id: role_id.clone(), secret_id: secret_id.clone() }
            }
            _ => {
                return Err(Error::config(
                    "Invalid Vault url (both roleId and secretId parameters are required)",
                ))
            }
        },
        MethodKind::Kubernetes => AuthMethod::Kubernetes { role: required_role(locator)? },
        MethodKind::Iam => {
            let role = required_role(locator)?;
            let region = locator
                .region
                .clone()
                .or_else(|| env.non_empty("AWS_REGION"))
                .or_else(|| env.non_empty("AWS_DEFAULT_REGION"))
                .ok_or_else(|| {
                    Error::config("AWS region not provided and not defined in environment variables")
                })?;
            AuthMethod::Iam { role, region, server_id: locator.server_id.clone() }
        }
    };

    let mount_path =
        locator.mount_path.clone().unwrap_or_else(|| kind.default_mount().to_string());

    info!(method = %kind, mount_path = %mount_path, "Resolved Vault auth method");
    Ok(ResolvedAuth { method, mount_path })
}

fn required_role(locator: &Locator) -> Result<String> {
    locator.role_name.clone().ok_or_else(|| Error::config("Invalid Vault url (roleName not provided)"))
}

async fn detect(
    locator: &Locator,
    env: &dyn EnvSource,
    probe: &dyn MetadataProbe,
) -> Result<MethodKind> {
    if locator.role_id.is_some() || locator.secret_id.is_some() {
        return Ok(MethodKind::AppRole);
    }
    if env.non_empty("KUBERNETES_SERVICE_HOST").is_some() {
        return Ok(MethodKind::Kubernetes);
    }
    if env.non_empty("EC2_INSTANCE_ID").is_some()
        || env.non_empty("ECS_CONTAINER_METADATA_URI_V4").is_some()
    {
        return Ok(MethodKind::Iam);
    }
    if probe.is_reachable().await {
        debug!("Instance metadata service answered, assuming AWS");
        return Ok(MethodKind::Iam);
    }
    Err(Error::auth("unable to determine authentication method"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct FakeProbe {
        reachable: bool,
        calls: AtomicUsize,
    }

    impl FakeProbe {
        fn reachable(reachable: bool) -> Self {
            Self { reachable, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl MetadataProbe for FakeProbe {
        async fn is_reachable(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable
        }
    }

    fn locator(query: &str) -> Locator {
        Locator::parse(&format!("https://vault:8200/?path=/secret/app&{}", query)).unwrap()
    }

    #[test]
    fn test_method_tokens() {
        assert_eq!("approle".parse::<MethodKind>().unwrap(), MethodKind::AppRole);
        assert_eq!("k8s".parse::<MethodKind>().unwrap(), MethodKind::Kubernetes);
        assert_eq!("iam".parse::<MethodKind>().unwrap(), MethodKind::Iam);
        assert!("AppRole".parse::<MethodKind>().is_err());
        assert_eq!(MethodKind::Kubernetes.default_mount(), "kubernetes");
    }

    #[tokio::test]
    async fn test_approle_detected_from_credentials() {
        let probe = FakeProbe::default();
        let resolved =
            resolve(&locator("roleId=r&secretId=s"), &MapEnv::new(), &probe).await.unwrap();
        assert_eq!(
            resolved.method,
            AuthMethod::AppRole { role_id: "r".into(), secret_id: SecretString::new("s") }
        );
        assert_eq!(resolved.mount_path, "approle");
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_half_approle_credentials_rejected() {
        let err = resolve(&locator("roleId=r"), &MapEnv::new(), &FakeProbe::default())
            .await
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("roleId and secretId"));
    }

    #[tokio::test]
    async fn test_kubernetes_detected_before_aws() {
        let env = MapEnv::new()
            .with("KUBERNETES_SERVICE_HOST", "10.0.0.1")
            .with("EC2_INSTANCE_ID", "i-123");
        let resolved =
            resolve(&locator("roleName=app&mountPath=k8s-prod"), &env, &FakeProbe::default())
                .await
                .unwrap();
        assert_eq!(resolved.method.kind(), MethodKind::Kubernetes);
        assert_eq!(resolved.mount_path, "k8s-prod");
    }

    #[tokio::test]
    async fn test_aws_detected_from_environment() {
        let env = MapEnv::new()
            .with("ECS_CONTAINER_METADATA_URI_V4", "http://169.254.170.2/v4")
            .with("AWS_DEFAULT_REGION", "eu-west-1");
        let resolved =
            resolve(&locator("roleName=app&serverId=vault.example.com"), &env, &FakeProbe::default())
                .await
                .unwrap();
        assert_eq!(
            resolved.method,
            AuthMethod::Iam {
                role: "app".into(),
                region: "eu-west-1".into(),
                server_id: Some("vault.example.com".into())
            }
        );
        assert_eq!(resolved.mount_path, "aws");
    }

    #[tokio::test]
    async fn test_region_precedence() {
        let env = MapEnv::new().with("AWS_REGION", "us-east-2").with("AWS_DEFAULT_REGION", "eu-west-1");
        let probe = FakeProbe::default();

        let resolved = resolve(&locator("method=iam&roleName=app"), &env, &probe).await.unwrap();
        assert!(matches!(resolved.method, AuthMethod::Iam { ref region, .. } if region == "us-east-2"));

        let resolved =
            resolve(&locator("method=iam&roleName=app&region=ap-south-1"), &env, &probe).await.unwrap();
        assert!(matches!(resolved.method, AuthMethod::Iam { ref region, .. } if region == "ap-south-1"));
    }

    #[tokio::test]
    async fn test_iam_without_region_rejected() {
        let err = resolve(&locator("method=iam&roleName=app"), &MapEnv::new(), &FakeProbe::default())
            .await
            .unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_probe_decides_last() {
        let env = MapEnv::new().with("AWS_REGION", "us-east-1");
        let probe = FakeProbe::reachable(true);
        let resolved = resolve(&locator("roleName=app"), &env, &probe).await.unwrap();
        assert_eq!(resolved.method.kind(), MethodKind::Iam);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_undetectable_method() {
        let err = resolve(&locator("roleName=app"), &MapEnv::new(), &FakeProbe::reachable(false))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth { .. }));
        assert!(err.to_string().contains("unable to determine authentication method"));
    }

    #[tokio::test]
    async fn test_explicit_method_skips_detection() {
        let env = MapEnv::new().with("KUBERNETES_SERVICE_HOST", "10.0.0.1");
        let probe = FakeProbe::reachable(true);
        let err = resolve(&locator("method=k8s"), &env, &probe).await.unwrap_err();
        assert!(err.to_string().contains("roleName not provided"));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }
}
