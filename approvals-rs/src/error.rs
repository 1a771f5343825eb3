use serde::Serialize;
use thiserror::Error;

/// Recoverable conditions encountered during an analysis. These are
/// aggregated into the report's diagnostics list rather than aborting it;
/// nothing is dropped uncounted.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    /// A rule line that could not be parsed at all. Skipped; rule order of
    /// the surrounding lines is unaffected.
    #[error("malformed rule on line {line}: {reason}")]
    #[serde(rename_all = "camelCase")]
    MalformedRule { line: usize, reason: String },

    /// A team lookup failed (permission, rate limit, not found, upstream).
    /// Only that team's member-level detail degrades.
    #[error("could not resolve team {slug}: {reason}")]
    #[serde(rename_all = "camelCase")]
    UnresolvedTeam { slug: String, reason: String },
}

/// The single fatal error kind. Changed files and rules come from the same
/// upstream source, so if that source is unreachable no report can be
/// produced at all. Raised by the layer that acquires inputs, never by the
/// engine once inputs are in hand.
#[derive(Debug, Error)]
pub enum Error {
    #[error("upstream unavailable: {0}")]
    Upstream(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_serialization() {
        let diag = Diagnostic::MalformedRule {
            line: 3,
            reason: "pattern contains a NUL byte".to_string(),
        };
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"kind\":\"malformedRule\""));
        assert!(json.contains("\"line\":3"));

        let diag = Diagnostic::UnresolvedTeam {
            slug: "org/team-x".to_string(),
            reason: "insufficient permission to list members".to_string(),
        };
        assert_eq!(
            diag.to_string(),
            "could not resolve team org/team-x: insufficient permission to list members"
        );
    }
}
