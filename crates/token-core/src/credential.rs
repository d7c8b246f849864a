//! The credential handed back to clients.

use serde::Serialize;

use crate::identity::NormalizedIdentity;

/// Platform key + signed token + identity, enough to join the video platform.
///
/// A value object: built once per successful request, serialized, and dropped.
/// The wire shape is `{ "apiKey", "token", "userId" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    /// Public platform API key.
    #[serde(rename = "apiKey")]
    pub platform_key: String,
    /// Token produced by the signing primitive.
    #[serde(rename = "token")]
    pub signed_token: String,
    /// Normalized identity the token was signed for.
    #[serde(rename = "userId")]
    pub identity: NormalizedIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::normalize;

    #[test]
    fn serializes_with_wire_field_names() {
        let credential = Credential {
            platform_key: "key123".to_string(),
            signed_token: "tok".to_string(),
            identity: normalize("Bob Smith").unwrap(),
        };

        let json = serde_json::to_value(&credential).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"apiKey": "key123", "token": "tok", "userId": "bob_smith"})
        );
    }
}
