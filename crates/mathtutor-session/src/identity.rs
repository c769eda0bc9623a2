//! Identity derived from the stored token
//!
//! The token is never verified here. Signature checks belong to the
//! backend; the client only reads the payload as an identity hint.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend user ids arrive either as numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(id) => write!(f, "{}", id),
            UserId::Text(id) => write!(f, "{}", id),
        }
    }
}

/// The `user` object returned by sign-in and sign-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Claims read from the token payload. Unknown claims are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub id: UserId,
    pub role: String,
    #[serde(rename = "sessionToken")]
    pub session_token: String,
}

/// Derived Identity View, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    pub role: String,
    pub session_token: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// Decode the payload segment of a three-part token.
///
/// Returns `None` for anything that is not exactly three dot-separated
/// segments or whose middle segment is not a JSON object carrying the
/// expected claims.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let payload = decode_segment(segments[1])?;
    serde_json::from_slice(&payload).ok()
}

/// Build the identity view from the stored token and display name.
pub fn derive_identity(token: &str, username: &str) -> Option<Identity> {
    let claims = decode_claims(token)?;

    Some(Identity {
        id: claims.id,
        username: username.to_string(),
        role: claims.role,
        session_token: claims.session_token,
    })
}

// Accepts base64url with or without padding, and tolerates the standard
// alphabet some issuers still emit.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    URL_SAFE_NO_PAD.decode(normalized).ok()
}


#[cfg(test)]
mod tests {
    use super::test_tokens::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_claims() {
        let claims = decode_claims(&student_token()).unwrap();
        assert_eq!(claims.id, UserId::Numeric(42));
        assert_eq!(claims.role, "student");
        assert_eq!(claims.session_token, "sess-abc");

        let claims = decode_claims(&admin_token()).unwrap();
        assert_eq!(claims.id, UserId::Text("u-1".to_string()));
    }

    #[test]
    fn test_wrong_segment_counts() {
        let valid = student_token();
        let parts: Vec<&str> = valid.split('.').collect();

        assert!(decode_claims("").is_none());
        assert!(decode_claims(parts[1]).is_none());
        assert!(decode_claims(&format!("{}.{}", parts[0], parts[1])).is_none());
        assert!(decode_claims(&format!("{}.extra", valid)).is_none());
    }

    #[test]
    fn test_garbage_payloads() {
        assert!(decode_claims("a.!!!notbase64!!!.c").is_none());

        let not_json = URL_SAFE_NO_PAD.encode("not json at all");
        assert!(decode_claims(&format!("a.{}.c", not_json)).is_none());

        // Valid JSON, but not a record with the required claims
        assert!(decode_claims(&token_for(&json!([1, 2, 3]))).is_none());
        assert!(decode_claims(&token_for(&json!({"id": 1, "role": "student"}))).is_none());
    }

    #[test]
    fn test_padded_standard_alphabet_payload() {
        use base64::engine::general_purpose::STANDARD;

        let payload = json!({"id": 7, "role": "instructor", "sessionToken": "s?>"}).to_string();
        let token = format!("h.{}.s", STANDARD.encode(payload));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.role, "instructor");
    }

    #[test]
    fn test_derive_identity() {
        let identity = derive_identity(&admin_token(), "Grace Hopper").unwrap();
        assert_eq!(identity.username, "Grace Hopper");
        assert!(identity.is_admin());

        let identity = derive_identity(&student_token(), "Ada").unwrap();
        assert!(!identity.is_admin());
    }

    #[test]
    fn test_user_data_accepts_backend_shape() {
        let user: UserData = serde_json::from_value(json!({
            "id": 42,
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "role": "student",
            "createdAt": "2024-01-01"
        }))
        .unwrap();

        assert_eq!(user.id.to_string(), "42");
        assert_eq!(user.name, "Ada Lovelace");
    }
}
