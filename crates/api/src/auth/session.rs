//! HMAC-authenticated session cookie.
//!
//! The session is a JSON payload signed with HMAC-SHA256 and carried in a
//! single cookie: `base64url(payload) "." base64url(tag)`. The server keeps
//! no session state; identity comes entirely from the verified payload.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::ServerConfig;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

/// Session lifetime: 30 days.
const MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;

/// The values carried by a session cookie.
///
/// Before login completes only `state` (and `pkce_verifier` when PKCE is
/// on) are set; a full login carries the identity fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// OAuth2 state parameter, set between login redirect and callback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkce_verifier: Option<String>,
}

/// Sign a session payload into a cookie value.
pub fn seal(data: &SessionData, key: &[u8]) -> String {
    let payload = serde_json::to_vec(data).unwrap_or_default();
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(&payload);
    let tag = mac.finalize().into_bytes();

    format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(&payload),
        URL_SAFE_NO_PAD.encode(tag)
    )
}

/// Verify and decode a cookie value. Returns `None` for anything that is
/// not a validly signed payload.
pub fn open(value: &str, key: &[u8]) -> Option<SessionData> {
    let (payload_b64, tag_b64) = value.split_once('.')?;
    let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
    let tag = URL_SAFE_NO_PAD.decode(tag_b64).ok()?;

    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(&payload);
    mac.verify_slice(&tag).ok()?;

    serde_json::from_slice(&payload).ok()
}

/// Extract and verify the session from a request's cookie headers.
pub fn read(headers: &HeaderMap, key: &[u8]) -> Option<SessionData> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else { continue };
        for cookie in value.split(';') {
            let Some((name, cookie_value)) = cookie.trim().split_once('=') else {
                continue;
            };
            if name == SESSION_COOKIE {
                return open(cookie_value, key);
            }
        }
    }
    None
}

/// `Set-Cookie` value carrying a freshly signed session.
pub fn set_cookie(data: &SessionData, config: &ServerConfig) -> String {
    let secure = if config.use_secure_cookies {
        "; Secure"
    } else {
        ""
    };
    format!(
        "{SESSION_COOKIE}={}; Max-Age={MAX_AGE_SECS}; Path=/; HttpOnly; SameSite=Lax{secure}",
        seal(data, &config.sessions_key)
    )
}

/// `Set-Cookie` value that removes the session cookie.
pub fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; Max-Age=0; Path=/; HttpOnly")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test-signing-key";

    fn sample() -> SessionData {
        SessionData {
            email: Some("s@x.edu".to_string()),
            name: Some("Student Example".to_string()),
            first_name: Some("Student".to_string()),
            groups: vec!["students".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn seal_and_open_round_trip() {
        let sealed = seal(&sample(), KEY);
        let opened = open(&sealed, KEY).expect("valid cookie should open");
        assert_eq!(opened.email.as_deref(), Some("s@x.edu"));
        assert_eq!(opened.groups, vec!["students"]);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let sealed = seal(&sample(), KEY);
        let (payload, tag) = sealed.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"email":"admin@x.edu"}"#);
        assert!(open(&format!("{forged_payload}.{tag}"), KEY).is_none());
        assert!(open(&format!("{payload}."), KEY).is_none());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let sealed = seal(&sample(), KEY);
        assert!(open(&sealed, b"some-other-key").is_none());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(open("", KEY).is_none());
        assert!(open("not-a-cookie", KEY).is_none());
        assert!(open("a.b", KEY).is_none());
    }

    #[test]
    fn read_finds_the_session_among_other_cookies() {
        let sealed = seal(&sample(), KEY);
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            format!("theme=dark; {SESSION_COOKIE}={sealed}; lang=en")
                .parse()
                .unwrap(),
        );
        let data = read(&headers, KEY).expect("session cookie should be found");
        assert_eq!(data.email.as_deref(), Some("s@x.edu"));
    }

    #[test]
    fn read_without_session_cookie_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "theme=dark".parse().unwrap());
        assert!(read(&headers, KEY).is_none());
    }

    #[test]
    fn expired_cookie_clears_immediately() {
        assert!(expired_cookie().contains("Max-Age=0"));
    }
}
