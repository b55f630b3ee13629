//! Session URL validation.
//!
//! A WebTransport session is addressed with an `https` URL. The socket
//! underneath speaks WebSocket, so a valid address is rewritten to `wss`
//! with every other component preserved.
//!
//! # Rules
//!
//! | Input | Result |
//! |-------|--------|
//! | Not an absolute URL | [`SyntaxError::InvalidUrl`] |
//! | Scheme other than `https` (including `wss`) | [`SyntaxError::InvalidProtocol`] |
//! | Any fragment, even an empty one | [`SyntaxError::FragmentNotPermitted`] |
//! | `https://host/path?q` | `wss://host/path?q` |

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Result, SyntaxError};

// ============================================================================
// Constants
// ============================================================================

/// The only scheme a session URL may use.
pub const SESSION_SCHEME: &str = "https";

/// The scheme the WebSocket is dialed with.
pub const SOCKET_SCHEME: &str = "wss";

// ============================================================================
// Validation
// ============================================================================

/// Validates a session URL and rewrites it for the WebSocket.
///
/// # Errors
///
/// Returns [`Error::Syntax`](crate::Error::Syntax) when the input is not an
/// absolute URL, does not use `https`, or carries a fragment.
///
/// # Example
///
/// ```
/// use webtransport_ws::address::validate;
///
/// let url = validate("https://example.com:8443/v1?room=1").unwrap();
/// assert_eq!(url.as_str(), "wss://example.com:8443/v1?room=1");
/// ```
pub fn validate(input: &str) -> Result<Url> {
    let mut url = Url::parse(input).map_err(|_| SyntaxError::InvalidUrl)?;

    if url.scheme() != SESSION_SCHEME {
        return Err(SyntaxError::InvalidProtocol.into());
    }

    if url.fragment().is_some() {
        return Err(SyntaxError::FragmentNotPermitted.into());
    }

    // https and wss are both special schemes, so the switch is always allowed.
    url.set_scheme(SOCKET_SCHEME)
        .map_err(|()| SyntaxError::InvalidProtocol)?;

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::Error;

    fn syntax(input: &str) -> SyntaxError {
        match validate(input) {
            Err(Error::Syntax(kind)) => kind,
            other => panic!("expected SyntaxError for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unparsable() {
        assert_eq!(syntax("oooo"), SyntaxError::InvalidUrl);
        assert_eq!(syntax(""), SyntaxError::InvalidUrl);
        assert_eq!(syntax("/relative/path"), SyntaxError::InvalidUrl);
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(syntax("http://api.example.com"), SyntaxError::InvalidProtocol);
        assert_eq!(syntax("wss://lo.example.dev:8443"), SyntaxError::InvalidProtocol);
        assert_eq!(syntax("ws://api.example.com"), SyntaxError::InvalidProtocol);
        assert_eq!(syntax("HTTPS:"), SyntaxError::InvalidUrl);
    }

    #[test]
    fn test_rejects_fragment() {
        assert_eq!(
            syntax("https://api.example.com/#abced"),
            SyntaxError::FragmentNotPermitted
        );
        assert_eq!(
            syntax("https://api.example.com/#"),
            SyntaxError::FragmentNotPermitted
        );
    }

    #[test]
    fn test_rewrites_scheme() {
        let url = validate("https://api.example.com").expect("valid");
        assert_eq!(url.as_str(), "wss://api.example.com/");

        let url = validate("https://h/p").expect("valid");
        assert_eq!(url.as_str(), "wss://h/p");
    }

    #[test]
    fn test_preserves_components() {
        let url = validate("https://lo.example.dev:8443/v1/chat?token=abc").expect("valid");
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.port(), Some(8443));
        assert_eq!(url.path(), "/v1/chat");
        assert_eq!(url.query(), Some("token=abc"));
    }

    #[test]
    fn test_default_port_dropped() {
        let url = validate("https://example.com:443/x").expect("valid");
        assert_eq!(url.as_str(), "wss://example.com/x");
    }

    #[test]
    fn test_uppercase_scheme_normalized() {
        let url = validate("HTTPS://Example.COM/Path").expect("valid");
        assert_eq!(url.as_str(), "wss://example.com/Path");
    }

    proptest! {
        #[test]
        fn prop_result_is_wss_or_syntax_error(input in ".*") {
            match validate(&input) {
                Ok(url) => {
                    prop_assert_eq!(url.scheme(), "wss");
                    prop_assert!(url.fragment().is_none());
                }
                Err(err) => prop_assert!(err.is_syntax_error()),
            }
        }

        #[test]
        fn prop_fragment_always_rejected(
            host in "[a-z]{1,12}\\.[a-z]{2,4}",
            path in "(/[a-z0-9]{0,8}){0,3}",
            fragment in "[a-zA-Z0-9]{0,10}",
        ) {
            let input = format!("https://{host}{path}#{fragment}");
            prop_assert_eq!(syntax(&input), SyntaxError::FragmentNotPermitted);
        }

        #[test]
        fn prop_non_https_rejected(
            scheme in "(http|ws|wss|ftp|file)",
            host in "[a-z]{1,12}\\.[a-z]{2,4}",
        ) {
            let input = format!("{scheme}://{host}/");
            prop_assert_eq!(syntax(&input), SyntaxError::InvalidProtocol);
        }

        #[test]
        fn prop_https_rewritten(
            host in "[a-z]{1,12}\\.[a-z]{2,4}",
            path in "(/[a-z0-9]{1,8}){0,3}",
        ) {
            let url = validate(&format!("https://{host}{path}")).expect("valid");
            let expected_path = if path.is_empty() { "/".to_string() } else { path.clone() };
            prop_assert_eq!(url.as_str(), format!("wss://{host}{expected_path}"));
        }
    }
}
