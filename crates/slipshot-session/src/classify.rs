//! Classification of renewal responses.
//!
//! The mapping from server codes and messages to failure kinds lives in
//! explicit tables so it can be inspected and tested on its own.

use std::fmt;

use serde::Deserialize;

use crate::renewer::RenewalResponse;

/// Why a renewal did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Refresh credential past its lifetime.
    Expired,
    /// Refresh credential revoked (blacklisted / rotated away).
    Revoked,
    /// No refresh credential was presented.
    Missing,
    /// Credential or response malformed.
    Invalid,
    /// No usable response reached the client.
    Network,
}

impl FailureKind {
    /// Terminal kinds cannot recover without a fresh interactive login.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FailureKind::Expired | FailureKind::Revoked | FailureKind::Missing
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Expired => "expired",
            FailureKind::Revoked => "revoked",
            FailureKind::Missing => "missing",
            FailureKind::Invalid => "invalid",
            FailureKind::Network => "network",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome category of a renewal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Renewed,
    Failed(FailureKind),
}

/// Server error codes, matched case-insensitively against the `code` field.
pub const CODE_TABLE: &[(&str, FailureKind)] = &[
    ("REFRESH_TOKEN_EXPIRED", FailureKind::Expired),
    ("REFRESH_TOKEN_REVOKED", FailureKind::Revoked),
    ("REFRESH_TOKEN_MISSING", FailureKind::Missing),
    ("REFRESH_TOKEN_INVALID", FailureKind::Invalid),
    ("token_not_valid", FailureKind::Invalid),
];

/// Message fragments, matched against the lowercased `error` / `detail` text
/// when no code matched. First match wins.
pub const MESSAGE_TABLE: &[(&str, FailureKind)] = &[
    ("expired", FailureKind::Expired),
    ("revoked", FailureKind::Revoked),
    ("blacklisted", FailureKind::Revoked),
    ("not found", FailureKind::Missing),
    ("missing", FailureKind::Missing),
    ("invalid", FailureKind::Invalid),
];

/// Error body returned by the renewal endpoint.
#[derive(Debug, Default, Deserialize)]
struct RenewalErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Look up a server error code.
pub fn kind_for_code(code: &str) -> Option<FailureKind> {
    CODE_TABLE
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, kind)| *kind)
}

/// Look up a free-form error message.
pub fn kind_for_message(message: &str) -> Option<FailureKind> {
    let message = message.to_lowercase();
    MESSAGE_TABLE
        .iter()
        .find(|(fragment, _)| message.contains(fragment))
        .map(|(_, kind)| *kind)
}

/// Classify a renewal response.
///
/// - 2xx: renewed
/// - no response, 5xx or 429: network (transient)
/// - other statuses: code table, then message table, else invalid
pub fn classify(response: &RenewalResponse) -> Classification {
    let (status, body) = match response {
        RenewalResponse::Unreachable { .. } => {
            return Classification::Failed(FailureKind::Network);
        }
        RenewalResponse::Completed { status, body } => (*status, body.as_str()),
    };

    if (200..300).contains(&status) {
        return Classification::Renewed;
    }
    if status >= 500 || status == 429 {
        return Classification::Failed(FailureKind::Network);
    }

    let parsed: RenewalErrorBody = serde_json::from_str(body).unwrap_or_default();

    let kind = parsed
        .code
        .as_deref()
        .and_then(kind_for_code)
        .or_else(|| parsed.error.as_deref().and_then(kind_for_message))
        .or_else(|| parsed.detail.as_deref().and_then(kind_for_message))
        .unwrap_or(FailureKind::Invalid);

    Classification::Failed(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(status: u16, body: &str) -> RenewalResponse {
        RenewalResponse::Completed {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_terminal_kinds() {
        assert!(FailureKind::Expired.is_terminal());
        assert!(FailureKind::Revoked.is_terminal());
        assert!(FailureKind::Missing.is_terminal());
        assert!(!FailureKind::Invalid.is_terminal());
        assert!(!FailureKind::Network.is_terminal());
    }

    #[test]
    fn test_success_statuses() {
        assert_eq!(
            classify(&completed(200, r#"{"detail":"Token refreshed"}"#)),
            Classification::Renewed
        );
        assert_eq!(classify(&completed(204, "")), Classification::Renewed);
    }

    #[test]
    fn test_code_table() {
        let cases = [
            ("REFRESH_TOKEN_MISSING", FailureKind::Missing),
            ("REFRESH_TOKEN_EXPIRED", FailureKind::Expired),
            ("REFRESH_TOKEN_REVOKED", FailureKind::Revoked),
            ("REFRESH_TOKEN_INVALID", FailureKind::Invalid),
        ];
        for (code, expected) in cases {
            let body = format!(r#"{{"error":"whatever","code":"{}"}}"#, code);
            assert_eq!(
                classify(&completed(401, &body)),
                Classification::Failed(expected),
                "code {code}"
            );
        }
    }

    #[test]
    fn test_code_wins_over_message() {
        let body = r#"{"error":"Refresh token has expired","code":"REFRESH_TOKEN_INVALID"}"#;
        assert_eq!(
            classify(&completed(401, body)),
            Classification::Failed(FailureKind::Invalid)
        );
    }

    #[test]
    fn test_message_fallback() {
        assert_eq!(
            classify(&completed(401, r#"{"error":"Refresh token has been revoked"}"#)),
            Classification::Failed(FailureKind::Revoked)
        );
        assert_eq!(
            classify(&completed(401, r#"{"detail":"Token is blacklisted"}"#)),
            Classification::Failed(FailureKind::Revoked)
        );
        assert_eq!(
            classify(&completed(401, r#"{"error":"Refresh token not found"}"#)),
            Classification::Failed(FailureKind::Missing)
        );
    }

    #[test]
    fn test_malformed_body_is_invalid() {
        assert_eq!(
            classify(&completed(401, "<html>nope</html>")),
            Classification::Failed(FailureKind::Invalid)
        );
        assert_eq!(
            classify(&completed(400, "")),
            Classification::Failed(FailureKind::Invalid)
        );
    }

    #[test]
    fn test_network_failures() {
        assert_eq!(
            classify(&RenewalResponse::Unreachable {
                reason: "connection refused".to_string()
            }),
            Classification::Failed(FailureKind::Network)
        );
        assert_eq!(
            classify(&completed(502, "bad gateway")),
            Classification::Failed(FailureKind::Network)
        );
    }

    #[test]
    fn test_lookup_helpers() {
        assert_eq!(kind_for_code("refresh_token_missing"), Some(FailureKind::Missing));
        assert_eq!(kind_for_code("SOMETHING_ELSE"), None);
        assert_eq!(kind_for_message("TOKEN EXPIRED"), Some(FailureKind::Expired));
        assert_eq!(kind_for_message("teapot"), None);
    }
}
