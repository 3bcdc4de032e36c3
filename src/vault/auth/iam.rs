use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use http::Method;
use serde_json::{json, Map, Value as JsonValue};
use url::Url;

use crate::errors::{Error, Result};
use crate::vault::aws::sigv4::{self, SigningParams};
use crate::vault::aws::{AwsCredentials, CredentialsProvider};

const STS_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";
const STS_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
const SERVER_ID_HEADER: &str = "X-Vault-AWS-IAM-Server-ID";

/// Signs an STS `GetCallerIdentity` request with credentials from
/// `provider` and packs it for the `aws` login endpoint. The STS request
/// itself is never sent from here.
pub(super) async fn payload(
    role: &str,
    region: &str,
    server_id: Option<&str>,
    provider: &dyn CredentialsProvider,
) -> Result<JsonValue> {
    let credentials = provider.credentials().await?;
    signed_payload(role, region, server_id, &credentials, Utc::now())
}

fn signed_payload(
    role: &str,
    region: &str,
    server_id: Option<&str>,
    credentials: &AwsCredentials,
    time: DateTime<Utc>,
) -> Result<JsonValue> {
    let sts_host = format!("sts.{}.amazonaws.com", region);
    let request_url = format!("https://{}/", sts_host);
    let url = Url::parse(&request_url)
        .map_err(|e| Error::config(format!("invalid AWS region '{}': {}", region, e)))?;

    let mut headers = Vec::new();
    if let Some(server_id) = server_id {
        headers.push((SERVER_ID_HEADER.to_string(), server_id.to_string()));
    }
    headers.push(("Content-Type".to_string(), STS_CONTENT_TYPE.to_string()));
    headers.push(("host".to_string(), sts_host));

    sigv4::sign(
        &Method::POST,
        &url,
        &mut headers,
        STS_BODY.as_bytes(),
        &SigningParams {
            credentials,
            region,
            service: "sts",
            time,
            content_sha256_header: true,
        },
    )?;

    let header_map: Map<String, JsonValue> =
        headers.into_iter().map(|(name, value)| (name, JsonValue::String(value))).collect();
    let encoded_headers = serde_json::to_string(&header_map)?;

    Ok(json!({
        "role": role,
        "iam_http_request_method": "POST",
        "iam_request_url": STANDARD.encode(request_url),
        "iam_request_body": STANDARD.encode(STS_BODY),
        "iam_request_headers": STANDARD.encode(encoded_headers),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::aws::StaticCredentials;
    use chrono::TimeZone;

    fn decode(value: &JsonValue) -> String {
        String::from_utf8(STANDARD.decode(value.as_str().unwrap()).unwrap()).unwrap()
    }

    #[test]
    fn test_payload_fields() {
        let credentials = AwsCredentials::new("AKID", "secret").with_session_token(Some("session"));
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let body =
            signed_payload("app", "eu-west-1", Some("vault.example.com"), &credentials, time)
                .unwrap();

        assert_eq!(body["role"], "app");
        assert_eq!(body["iam_http_request_method"], "POST");
        assert_eq!(decode(&body["iam_request_url"]), "https://sts.eu-west-1.amazonaws.com/");
        assert_eq!(decode(&body["iam_request_body"]), STS_BODY);

        let headers: serde_json::Map<String, JsonValue> =
            serde_json::from_str(&decode(&body["iam_request_headers"])).unwrap();
        assert_eq!(headers["X-Vault-AWS-IAM-Server-ID"], "vault.example.com");
        assert_eq!(headers["host"], "sts.eu-west-1.amazonaws.com");
        assert_eq!(headers["x-amz-date"], "20240501T080000Z");
        assert_eq!(headers["x-amz-security-token"], "session");
        let authorization = headers["authorization"].as_str().unwrap();
        assert!(authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKID/20240501/eu-west-1/sts/aws4_request"
        ));
        assert!(authorization.contains("x-vault-aws-iam-server-id"));
    }

    #[test]
    fn test_server_id_optional() {
        let credentials = AwsCredentials::new("AKID", "secret");
        let body = signed_payload("app", "us-east-1", None, &credentials, Utc::now()).unwrap();
        let headers: serde_json::Map<String, JsonValue> =
            serde_json::from_str(&decode(&body["iam_request_headers"])).unwrap();
        assert!(!headers.contains_key(SERVER_ID_HEADER));
        assert!(!headers.contains_key("x-amz-security-token"));
    }

    #[tokio::test]
    async fn test_uses_provider_credentials() {
        let provider = StaticCredentials(AwsCredentials::new("AKIDPROVIDED", "secret"));
        let body = payload("app", "us-east-1", None, &provider).await.unwrap();
        assert!(decode(&body["iam_request_headers"]).contains("Credential=AKIDPROVIDED/"));
    }
}
