//! Close parameters.
//!
//! WebTransport close codes are 32-bit application codes; a WebSocket only
//! accepts 1000 or a code in the 3000–4999 band. Anything else is coerced
//! to [`COERCED_CLOSE_CODE`] before it reaches the socket.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Close code used when none is given.
pub const DEFAULT_CLOSE_CODE: u32 = 1000;

/// Close reason used when none is given.
pub const DEFAULT_CLOSE_REASON: &str = "Closed by client";

/// Private-use code substituted for codes a WebSocket would refuse.
pub const COERCED_CLOSE_CODE: u16 = 4000;

/// Longest reason a WebSocket close frame can carry, in bytes.
pub const MAX_REASON_BYTES: usize = 123;

// ============================================================================
// CloseInfo
// ============================================================================

/// Code and reason passed to [`Session::close`](crate::Session::close).
///
/// Deserializes from the W3C dictionary shape:
///
/// ```
/// # use webtransport_ws::CloseInfo;
/// let info: CloseInfo = serde_json::from_str(r#"{"closeCode":4321,"reason":"test"}"#).unwrap();
/// assert_eq!(info, CloseInfo::new(4321, "test"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloseInfo {
    /// Application close code.
    pub close_code: u32,
    /// Human-readable reason.
    pub reason: String,
}

impl Default for CloseInfo {
    fn default() -> Self {
        Self {
            close_code: DEFAULT_CLOSE_CODE,
            reason: DEFAULT_CLOSE_REASON.to_string(),
        }
    }
}

impl CloseInfo {
    /// Creates close parameters.
    #[inline]
    #[must_use]
    pub fn new(close_code: u32, reason: impl Into<String>) -> Self {
        Self {
            close_code,
            reason: reason.into(),
        }
    }

    /// Returns the code the WebSocket is closed with.
    ///
    /// `1000` and `3000..=4999` pass through; everything else becomes
    /// [`COERCED_CLOSE_CODE`].
    #[must_use]
    pub fn wire_code(&self) -> u16 {
        match self.close_code {
            1000 | 3000..=4999 => u16::try_from(self.close_code).unwrap_or(COERCED_CLOSE_CODE),
            _ => COERCED_CLOSE_CODE,
        }
    }

    /// Returns the reason cut to fit a close frame, on a character boundary.
    #[must_use]
    pub fn wire_reason(&self) -> &str {
        let reason = self.reason.as_str();
        if reason.len() <= MAX_REASON_BYTES {
            return reason;
        }

        let mut end = MAX_REASON_BYTES;
        while !reason.is_char_boundary(end) {
            end -= 1;
        }
        &reason[..end]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let info = CloseInfo::default();
        assert_eq!(info.wire_code(), 1000);
        assert_eq!(info.wire_reason(), DEFAULT_CLOSE_REASON);
    }

    #[test]
    fn test_wire_code_passthrough() {
        for code in [1000, 3000, 3500, 4000, 4321, 4999] {
            assert_eq!(u32::from(CloseInfo::new(code, "").wire_code()), code);
        }
    }

    #[test]
    fn test_wire_code_coerced() {
        for code in [0, 500, 999, 1001, 1006, 2999, 5000, 65535, 70000, u32::MAX] {
            assert_eq!(
                CloseInfo::new(code, "").wire_code(),
                COERCED_CLOSE_CODE,
                "code {code}"
            );
        }
    }

    #[test]
    fn test_reason_truncated_on_char_boundary() {
        let info = CloseInfo::new(4000, "é".repeat(100));
        let reason = info.wire_reason();
        assert!(reason.len() <= MAX_REASON_BYTES);
        assert_eq!(reason.len(), 122);
        assert!(reason.chars().all(|c| c == 'é'));

        let short = CloseInfo::new(4000, "bye");
        assert_eq!(short.wire_reason(), "bye");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&CloseInfo::new(4321, "test")).expect("serialize");
        assert_eq!(json, r#"{"closeCode":4321,"reason":"test"}"#);

        let info: CloseInfo = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(info, CloseInfo::default());
    }
}
