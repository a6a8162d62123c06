//! Session context - token plus the identity used for membership checks
//!
//! The session is an explicit value handed to every API call and render;
//! nothing reads the token store behind the caller's back.

use base64::Engine;
use serde::Deserialize;

/// What an API call needs to authenticate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    /// Cookie mirror, sent alongside the bearer header while valid
    pub cookie: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSession {
    pub token: String,
    /// Trimmed; empty when no identity could be resolved
    pub identity: String,
}

impl ClientSession {
    /// Prefer the configured username, fall back to the token's `sub` claim
    pub fn resolve(token: String, configured: Option<&str>) -> Self {
        let configured = configured.map(str::trim).filter(|u| !u.is_empty());
        let identity = match configured {
            Some(user) => user.to_string(),
            None => {
                let sub = decode_token_subject(&token).unwrap_or_default();
                if sub.is_empty() {
                    tracing::warn!("No identity configured and token carries no subject");
                }
                sub
            }
        };
        tracing::debug!(identity = %identity, "Session resolved");
        ClientSession {
            token,
            identity: identity.trim().to_string(),
        }
    }

    /// `cookie` is read from the store per request, so an elapsed mirror
    /// stops being sent mid-session
    pub fn credentials(&self, cookie: Option<String>) -> Credentials {
        Credentials {
            token: self.token.clone(),
            cookie,
        }
    }
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
}

/// Read the `sub` claim from a JWT payload without verifying it
pub fn decode_token_subject(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    // Tolerate padded and unpadded base64url
    let payload = payload.trim_end_matches('=');
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    claims.sub.map(|s| s.trim().to_string())
}

/// Trimmed membership test shared by the table renderer and the dispatcher
pub fn is_member(users: &[String], identity: &str) -> bool {
    let me = identity.trim();
    users.iter().any(|u| u.trim() == me)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(json: &str) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!("{}.{}.sig", engine.encode(r#"{"alg":"HS256"}"#), engine.encode(json))
    }

    #[test]
    fn test_decode_subject() {
        let token = token_with_payload(r#"{"sub":"alice","exp":1900000000}"#);
        assert_eq!(decode_token_subject(&token).as_deref(), Some("alice"));
    }

    #[test]
    fn test_decode_subject_non_ascii() {
        let token = token_with_payload(r#"{"sub":"김철수"}"#);
        assert_eq!(decode_token_subject(&token).as_deref(), Some("김철수"));
    }

    #[test]
    fn test_decode_garbage() {
        assert_eq!(decode_token_subject("not-a-jwt"), None);
        assert_eq!(decode_token_subject("a.%%%.c"), None);
        assert_eq!(decode_token_subject(&token_with_payload(r#"{"exp":1}"#)), None);
    }

    #[test]
    fn test_configured_identity_wins() {
        let token = token_with_payload(r#"{"sub":"alice"}"#);
        let session = ClientSession::resolve(token, Some("  bob "));
        assert_eq!(session.identity, "bob");
    }

    #[test]
    fn test_blank_configured_identity_falls_back_to_token() {
        let token = token_with_payload(r#"{"sub":" alice "}"#);
        let session = ClientSession::resolve(token, Some(""));
        assert_eq!(session.identity, "alice");
    }

    #[test]
    fn test_membership_is_whitespace_insensitive() {
        let users = vec![" alice ".to_string()];
        assert!(is_member(&users, "alice"));
        assert!(is_member(&users, "alice\t"));
        assert!(!is_member(&users, "alic"));
        assert!(!is_member(&["bob".to_string()], "alice"));
    }
}
