use serde_json::{json, Value as JsonValue};

use crate::secrets::SecretString;

/// `{role_id, secret_id}`
pub(super) fn payload(role_id: &str, secret_id: &SecretString) -> JsonValue {
    json!({
        "role_id": role_id,
        "secret_id": secret_id.expose_secret(),
    })
}
