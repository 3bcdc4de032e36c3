//! Credential providers tried, in order, by the IAM login method.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::Method;
use serde::Deserialize;
use tracing::debug;

use super::{AwsCredentials, CredentialsProvider};
use crate::env::EnvSource;
use crate::errors::{Error, Result};
use crate::vault::transport::{HttpRequest, HttpTransport};

const CONTAINER_ENDPOINT: &str = "http://169.254.170.2";
const INSTANCE_METADATA_ENDPOINT: &str = "http://169.254.169.254";
const IMDS_TOKEN_TTL_SECONDS: &str = "21600";
const DEFAULT_SESSION_NAME: &str = "vaultenv-session";

/// Tries each provider in turn; the first success wins.
#[derive(Debug)]
pub struct CredentialsChain {
    providers: Vec<Arc<dyn CredentialsProvider>>,
}

impl CredentialsChain {
    pub fn new(providers: Vec<Arc<dyn CredentialsProvider>>) -> Self {
        Self { providers }
    }

    /// Web identity token file, container endpoint, then instance metadata.
    pub fn default_chain(
        env: Arc<dyn EnvSource>,
        transport: Arc<dyn HttpTransport>,
        region: &str,
    ) -> Self {
        Self::new(vec![
            Arc::new(WebIdentityProvider::new(env.clone(), transport.clone(), region)),
            Arc::new(ContainerProvider::new(env.clone(), transport.clone())),
            Arc::new(InstanceMetadataProvider::new(env, transport)),
        ])
    }
}

#[async_trait]
impl CredentialsProvider for CredentialsChain {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn credentials(&self) -> Result<AwsCredentials> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.credentials().await {
                Ok(credentials) => {
                    debug!(provider = provider.name(), "Loaded AWS credentials");
                    return Ok(credentials);
                }
                Err(e) => {
                    debug!(provider = provider.name(), error = %e, "Credential provider failed");
                    failures.push(format!("{}: {}", provider.name(), e));
                }
            }
        }
        Err(Error::auth(format!(
            "could not load credentials from any providers ({})",
            failures.join("; ")
        )))
    }
}

/// Exchanges a projected web identity token for role credentials through
/// STS `AssumeRoleWithWebIdentity`.
#[derive(Debug)]
pub struct WebIdentityProvider {
    env: Arc<dyn EnvSource>,
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
}

impl WebIdentityProvider {
    pub fn new(env: Arc<dyn EnvSource>, transport: Arc<dyn HttpTransport>, region: &str) -> Self {
        Self { env, transport, endpoint: format!("https://sts.{}.amazonaws.com/", region) }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl CredentialsProvider for WebIdentityProvider {
    fn name(&self) -> &'static str {
        "web-identity"
    }

    async fn credentials(&self) -> Result<AwsCredentials> {
        let (token_file, role_arn) = match (
            self.env.non_empty("AWS_WEB_IDENTITY_TOKEN_FILE"),
            self.env.non_empty("AWS_ROLE_ARN"),
        ) {
            (Some(file), Some(arn)) => (PathBuf::from(file), arn),
            _ => return Err(Error::auth("web identity token file or role ARN not set")),
        };
        let session_name = self
            .env
            .non_empty("AWS_ROLE_SESSION_NAME")
            .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string());

        let token = std::fs::read_to_string(&token_file)
            .map_err(|e| Error::io(e, format!("reading {}", token_file.display())))?;

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "AssumeRoleWithWebIdentity")
            .append_pair("Version", "2011-06-15")
            .append_pair("RoleArn", &role_arn)
            .append_pair("RoleSessionName", &session_name)
            .append_pair("WebIdentityToken", token.trim())
            .finish();

        let response = self
            .transport
            .send(
                HttpRequest::new(Method::POST, &self.endpoint)
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(body),
            )
            .await?;
        let text = response.text();
        if !response.status.is_success() {
            return Err(Error::auth(format!(
                "AssumeRoleWithWebIdentity returned status {}",
                response.status.as_u16()
            )));
        }

        let credentials = xml_element(&text, "Credentials")
            .ok_or_else(|| Error::auth("AssumeRoleWithWebIdentity response lacks Credentials"))?;
        let field = |tag: &str| {
            xml_tag(credentials, tag).ok_or_else(|| {
                Error::auth(format!("AssumeRoleWithWebIdentity response lacks {}", tag))
            })
        };
        Ok(AwsCredentials::new(field("AccessKeyId")?, field("SecretAccessKey")?)
            .with_session_token(xml_tag(credentials, "SessionToken"))
            .with_expiration(xml_tag(credentials, "Expiration").as_deref().and_then(parse_time)))
    }
}

/// Container credentials endpoint (ECS task roles, EKS pod identity).
#[derive(Debug)]
pub struct ContainerProvider {
    env: Arc<dyn EnvSource>,
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
}

impl ContainerProvider {
    pub fn new(env: Arc<dyn EnvSource>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { env, transport, endpoint: CONTAINER_ENDPOINT.to_string() }
    }

    /// Base used with `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl CredentialsProvider for ContainerProvider {
    fn name(&self) -> &'static str {
        "container"
    }

    async fn credentials(&self) -> Result<AwsCredentials> {
        let relative = self.env.non_empty("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI");
        let url = if let Some(relative) = relative {
            format!("{}{}", self.endpoint.trim_end_matches('/'), relative)
        } else if let Some(full) = self.env.non_empty("AWS_CONTAINER_CREDENTIALS_FULL_URI") {
            full
        } else {
            return Err(Error::auth("container credentials endpoint not set"));
        };

        let mut request = HttpRequest::get(url).header("Accept", "application/json");
        if let Some(token) = self.env.non_empty("AWS_CONTAINER_AUTHORIZATION_TOKEN") {
            request = request.header("Authorization", token);
        }

        let response = self.transport.send(request).await?;
        if !response.status.is_success() {
            return Err(Error::auth(format!(
                "container credentials endpoint returned status {}",
                response.status.as_u16()
            )));
        }
        let document: CredentialsDocument = serde_json::from_slice(&response.body)?;
        Ok(document.into())
    }
}

/// EC2 instance metadata service, using an IMDSv2 session token when the
/// service issues one.
#[derive(Debug)]
pub struct InstanceMetadataProvider {
    env: Arc<dyn EnvSource>,
    transport: Arc<dyn HttpTransport>,
    endpoint: String,
}

impl InstanceMetadataProvider {
    pub fn new(env: Arc<dyn EnvSource>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { env, transport, endpoint: INSTANCE_METADATA_ENDPOINT.to_string() }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn session_token(&self) -> Option<String> {
        let request =
            HttpRequest::new(Method::PUT, format!("{}/latest/api/token", self.endpoint))
                .header("X-aws-ec2-metadata-token-ttl-seconds", IMDS_TOKEN_TTL_SECONDS);
        match self.transport.send(request).await {
            Ok(response) if response.status.is_success() => Some(response.text()),
            Ok(response) => {
                debug!(status = response.status.as_u16(), "IMDSv2 token not issued");
                None
            }
            Err(e) => {
                debug!(error = %e, "IMDSv2 token request failed");
                None
            }
        }
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<String> {
        let mut request = HttpRequest::get(format!("{}{}", self.endpoint, path));
        if let Some(token) = token {
            request = request.header("X-aws-ec2-metadata-token", token);
        }
        let response = self.transport.send(request).await?;
        if !response.status.is_success() {
            return Err(Error::auth(format!(
                "instance metadata returned status {} for {}",
                response.status.as_u16(),
                path
            )));
        }
        Ok(response.text())
    }
}

#[async_trait]
impl CredentialsProvider for InstanceMetadataProvider {
    fn name(&self) -> &'static str {
        "instance-metadata"
    }

    async fn credentials(&self) -> Result<AwsCredentials> {
        if self.env.non_empty("AWS_EC2_METADATA_DISABLED").is_some() {
            return Err(Error::auth("EC2 Instance Metadata Service access disabled"));
        }

        let token = self.session_token().await;
        let roles =
            self.get("/latest/meta-data/iam/security-credentials/", token.as_deref()).await?;
        let role = roles
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| Error::auth("no instance profile role attached"))?;

        let body = self
            .get(&format!("/latest/meta-data/iam/security-credentials/{}", role), token.as_deref())
            .await?;
        let document: CredentialsDocument = serde_json::from_str(&body)?;
        Ok(document.into())
    }
}

/// JSON credentials served by the container and instance metadata endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CredentialsDocument {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    expiration: Option<String>,
}

impl From<CredentialsDocument> for AwsCredentials {
    fn from(document: CredentialsDocument) -> Self {
        AwsCredentials::new(document.access_key_id, document.secret_access_key)
            .with_session_token(document.token)
            .with_expiration(document.expiration.as_deref().and_then(parse_time))
    }
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).ok().map(|t| t.with_timezone(&Utc))
}

/// Raw content of the first `<tag>` element.
fn xml_element<'a>(document: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = document.find(&open)? + open.len();
    let end = start + document[start..].find(&close)?;
    Some(&document[start..end])
}

/// Text of the first `<tag>` element, with the predefined XML entities
/// decoded.
fn xml_tag(document: &str, tag: &str) -> Option<String> {
    xml_element(document, tag).map(|text| decode_entities(text.trim()))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnv;
    use crate::vault::transport::ReqwestTransport;
    use std::io::Write;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CREDENTIALS_JSON: &str = r#"{"Code":"Success","AccessKeyId":"AKIDIMDS",
        "SecretAccessKey":"imds-secret","Token":"imds-session","Expiration":"2030-01-01T00:00:00Z"}"#;

    fn transport() -> Arc<dyn HttpTransport> {
        Arc::new(ReqwestTransport::builder().max_retries(0).build().unwrap())
    }

    #[test]
    fn test_xml_tag() {
        let xml = "<Credentials><AccessKeyId>AKID</AccessKeyId>\
                   <SessionToken> a&amp;b&lt;c&gt;&quot;&apos; </SessionToken></Credentials>";
        assert_eq!(xml_tag(xml, "AccessKeyId").as_deref(), Some("AKID"));
        assert_eq!(xml_tag(xml, "SessionToken").as_deref(), Some("a&b<c>\"'"));
        assert_eq!(xml_tag(xml, "Expiration"), None);
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_credentials_document() {
        let document: CredentialsDocument = serde_json::from_str(CREDENTIALS_JSON).unwrap();
        let credentials = AwsCredentials::from(document);
        assert_eq!(credentials.access_key_id, "AKIDIMDS");
        assert_eq!(credentials.secret_access_key.expose_secret(), "imds-secret");
        assert_eq!(credentials.session_token.unwrap().expose_secret(), "imds-session");
        assert!(credentials.expiration.is_some());
    }

    #[tokio::test]
    async fn test_web_identity_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("Action=AssumeRoleWithWebIdentity"))
            .and(body_string_contains("RoleArn=arn%3Aaws%3Aiam%3A%3A123%3Arole%2Fapp"))
            .and(body_string_contains("RoleSessionName=ci"))
            .and(body_string_contains("WebIdentityToken=jwt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<AssumeRoleWithWebIdentityResponse><AssumeRoleWithWebIdentityResult>\
                 <SourceIdentity><AccessKeyId>not-this-one</AccessKeyId></SourceIdentity>\
                 <Credentials>\
                 <AccessKeyId>ASIAWEB</AccessKeyId>\
                 <SecretAccessKey>web&amp;secret</SecretAccessKey>\
                 <SessionToken>web-session</SessionToken>\
                 <Expiration>2030-01-01T00:00:00Z</Expiration>\
                 </Credentials>\
                 </AssumeRoleWithWebIdentityResult></AssumeRoleWithWebIdentityResponse>",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut token_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(token_file, "jwt-token").unwrap();
        let env = Arc::new(
            MapEnv::new()
                .with("AWS_WEB_IDENTITY_TOKEN_FILE", token_file.path().to_str().unwrap())
                .with("AWS_ROLE_ARN", "arn:aws:iam::123:role/app")
                .with("AWS_ROLE_SESSION_NAME", "ci"),
        );

        let provider = WebIdentityProvider::new(env, transport(), "us-east-1")
            .with_endpoint(format!("{}/", server.uri()));
        let credentials = provider.credentials().await.unwrap();

        assert_eq!(credentials.access_key_id, "ASIAWEB");
        assert_eq!(credentials.secret_access_key.expose_secret(), "web&secret");
        assert_eq!(credentials.session_token.unwrap().expose_secret(), "web-session");
        assert!(credentials.expiration.is_some());
    }

    #[tokio::test]
    async fn test_web_identity_requires_credentials_element() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<AccessKeyId>stray</AccessKeyId>"),
            )
            .mount(&server)
            .await;

        let token_file = tempfile::NamedTempFile::new().unwrap();
        let env = Arc::new(
            MapEnv::new()
                .with("AWS_WEB_IDENTITY_TOKEN_FILE", token_file.path().to_str().unwrap())
                .with("AWS_ROLE_ARN", "arn:aws:iam::123:role/app"),
        );
        let err = WebIdentityProvider::new(env, transport(), "us-east-1")
            .with_endpoint(server.uri())
            .credentials()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("lacks Credentials"));
    }

    #[tokio::test]
    async fn test_instance_metadata_with_session_token() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/latest/api/token"))
            .and(header("X-aws-ec2-metadata-token-ttl-seconds", IMDS_TOKEN_TTL_SECONDS))
            .respond_with(ResponseTemplate::new(200).set_body_string("imds-token"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/iam/security-credentials/"))
            .and(header("X-aws-ec2-metadata-token", "imds-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("app-role\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/iam/security-credentials/app-role"))
            .and(header("X-aws-ec2-metadata-token", "imds-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CREDENTIALS_JSON))
            .mount(&server)
            .await;

        let credentials = InstanceMetadataProvider::new(Arc::new(MapEnv::new()), transport())
            .with_endpoint(server.uri())
            .credentials()
            .await
            .unwrap();
        assert_eq!(credentials.access_key_id, "AKIDIMDS");
        assert_eq!(credentials.session_token.unwrap().expose_secret(), "imds-session");
    }

    #[tokio::test]
    async fn test_instance_metadata_falls_back_to_v1() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/latest/api/token"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/iam/security-credentials/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("app-role"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/iam/security-credentials/app-role"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CREDENTIALS_JSON))
            .mount(&server)
            .await;

        let credentials = InstanceMetadataProvider::new(Arc::new(MapEnv::new()), transport())
            .with_endpoint(server.uri())
            .credentials()
            .await
            .unwrap();
        assert_eq!(credentials.access_key_id, "AKIDIMDS");

        let requests = server.received_requests().await.unwrap();
        assert!(requests
            .iter()
            .filter(|r| r.method.as_str() == "GET")
            .all(|r| !r.headers.contains_key("x-aws-ec2-metadata-token")));
    }

    #[tokio::test]
    async fn test_instance_metadata_disabled() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let env = Arc::new(MapEnv::new().with("AWS_EC2_METADATA_DISABLED", "true"));
        let err = InstanceMetadataProvider::new(env, transport())
            .with_endpoint(server.uri())
            .credentials()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test]
    async fn test_chain_falls_through_failed_provider() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/container-credentials"))
            .and(header("Authorization", "container-token"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/iam/security-credentials/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("app-role"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/meta-data/iam/security-credentials/app-role"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CREDENTIALS_JSON))
            .mount(&server)
            .await;

        let env: Arc<dyn EnvSource> = Arc::new(
            MapEnv::new()
                .with(
                    "AWS_CONTAINER_CREDENTIALS_FULL_URI",
                    format!("{}/container-credentials", server.uri()),
                )
                .with("AWS_CONTAINER_AUTHORIZATION_TOKEN", "container-token"),
        );
        let chain = CredentialsChain::new(vec![
            Arc::new(WebIdentityProvider::new(env.clone(), transport(), "us-east-1")),
            Arc::new(ContainerProvider::new(env.clone(), transport())),
            Arc::new(InstanceMetadataProvider::new(env, transport()).with_endpoint(server.uri())),
        ]);

        let credentials = chain.credentials().await.unwrap();
        assert_eq!(credentials.access_key_id, "AKIDIMDS");
    }

    #[tokio::test]
    async fn test_chain_reports_every_failure() {
        let env: Arc<dyn EnvSource> =
            Arc::new(MapEnv::new().with("AWS_EC2_METADATA_DISABLED", "1"));
        let err = CredentialsChain::default_chain(env, transport(), "us-east-1")
            .credentials()
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("could not load credentials from any providers"));
        assert!(message.contains("web-identity"));
        assert!(message.contains("container"));
        assert!(message.contains("instance-metadata"));
    }
}
