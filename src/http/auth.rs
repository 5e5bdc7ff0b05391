//! HTTP Basic credential check.
//!
//! A presence-and-match check only; there are no sessions or tokens.

use base64::prelude::*;

use crate::config::AuthConfig;
use crate::error::ProtocolError;

/// Verify an `Authorization` header against the configured pair.
///
/// Always passes when auth is disabled.
pub fn check_basic(authorization: Option<&str>, expected: &AuthConfig) -> Result<(), ProtocolError> {
    if !expected.enabled {
        return Ok(());
    }

    let (username, password) = authorization
        .and_then(decode_basic)
        .ok_or(ProtocolError::Unauthorized)?;

    if username == expected.username && password == expected.password {
        Ok(())
    } else {
        Err(ProtocolError::Unauthorized)
    }
}

/// Split a `Basic <base64(user:pass)>` header into its credentials.
fn decode_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = BASE64_STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", BASE64_STANDARD.encode(format!("{user}:{pass}")))
    }

    #[test]
    fn accepts_configured_pair() {
        let auth = AuthConfig::default();
        assert!(check_basic(Some(&basic("admin", "admin123")), &auth).is_ok());
        assert!(check_basic(Some(&basic("admin", "admin123").replace("Basic", "basic")), &auth).is_ok());
    }

    #[test]
    fn rejects_missing_wrong_and_garbled() {
        let auth = AuthConfig::default();
        for header in [
            None,
            Some(basic("admin", "nope")),
            Some(basic("root", "admin123")),
            Some("Bearer abc".to_string()),
            Some("Basic !!!not-base64".to_string()),
            Some(format!("Basic {}", BASE64_STANDARD.encode("no-colon"))),
        ] {
            assert!(
                matches!(check_basic(header.as_deref(), &auth), Err(ProtocolError::Unauthorized)),
                "{header:?}"
            );
        }
    }

    #[test]
    fn password_may_contain_colons() {
        let auth = AuthConfig {
            password: "a:b:c".into(),
            ..AuthConfig::default()
        };
        assert!(check_basic(Some(&basic("admin", "a:b:c")), &auth).is_ok());
    }

    #[test]
    fn disabled_auth_lets_everything_through() {
        let auth = AuthConfig {
            enabled: false,
            ..AuthConfig::default()
        };
        assert!(check_basic(None, &auth).is_ok());
    }
}
