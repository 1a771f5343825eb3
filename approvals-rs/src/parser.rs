use log::debug;

use crate::error::Diagnostic;
use crate::owner::OwnerRef;

/// A single ownership rule: one pattern and the owners who can approve
/// changes to paths it matches. Rule order is significant and preserved
/// from source. An empty owner list marks the rule's paths as explicitly
/// requiring no owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: String,
    pub owners: Vec<OwnerRef>,
    /// 1-based source line, kept for diagnostics and file detail output.
    pub line: usize,
}

/// The result of parsing an ownership-rules file. Parsing never fails hard:
/// lines that cannot be parsed are skipped and surfaced as diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    pub rules: Vec<Rule>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse ownership-rule text. Blank lines and `#` comments are ignored;
/// each remaining line splits on whitespace into one pattern token and
/// zero-or-more owner tokens.
pub fn parse(source: &str) -> ParseResult {
    let mut rules = Vec::new();
    let mut diagnostics = Vec::new();

    for (idx, raw_line) in source.lines().enumerate() {
        let line = idx + 1;
        // Everything from the first '#' onwards is a comment, including
        // trailing comments on rule lines.
        let content = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };

        let mut tokens = content.split_whitespace();
        let Some(pattern) = tokens.next() else {
            continue;
        };

        if pattern.contains('\0') {
            diagnostics.push(Diagnostic::MalformedRule {
                line,
                reason: "pattern contains a NUL byte".to_string(),
            });
            continue;
        }

        let mut owners: Vec<OwnerRef> = Vec::new();
        for token in tokens {
            let owner = OwnerRef::from_token(token);
            // Owners form an ordered set: repeats keep their first position.
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }

        rules.push(Rule {
            pattern: pattern.to_owned(),
            owners,
            line,
        });
    }

    debug!(
        "parsed {} rules, {} unparsable lines",
        rules.len(),
        diagnostics.len()
    );

    ParseResult { rules, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, owners: &[&str], line: usize) -> Rule {
        Rule {
            pattern: pattern.to_string(),
            owners: owners.iter().map(|o| OwnerRef::from_token(o)).collect(),
            line,
        }
    }

    #[test]
    fn test_parser() {
        let examples = vec![
            ("", vec![], 0),
            ("# just a comment\n\n   \n", vec![], 0),
            ("*.md @alice", vec![rule("*.md", &["@alice"], 1)], 0),
            (
                "docs/ @bob @org/team-x",
                vec![rule("docs/", &["@bob", "@org/team-x"], 1)],
                0,
            ),
            (
                "# header\n*.rs @carol\n\nsrc/** @org/rust e@f.co\n",
                vec![
                    rule("*.rs", &["@carol"], 2),
                    rule("src/**", &["@org/rust", "e@f.co"], 4),
                ],
                0,
            ),
            // A pattern with zero owners is kept: it explicitly marks its
            // paths as requiring no owner, and later rules may override it.
            ("build/", vec![rule("build/", &[], 1)], 0),
            // Trailing comments end the owner list.
            (
                "*.js @dave # and a note",
                vec![rule("*.js", &["@dave"], 1)],
                0,
            ),
            ("foo#abc", vec![rule("foo", &[], 1)], 0),
            // Repeated owners collapse, case-insensitively, keeping the
            // first occurrence.
            (
                "*.go @eve @EVE @frank",
                vec![rule("*.go", &["@eve", "@frank"], 1)],
                0,
            ),
            // NUL bytes make a line unparsable: skipped and counted.
            ("f\0oo @alice\n*.md @bob", vec![rule("*.md", &["@bob"], 2)], 1),
        ];

        for (source, rules, diagnostic_count) in examples {
            let result = parse(source);
            assert_eq!(result.rules, rules, "rules mismatch for `{}`", source);
            assert_eq!(
                result.diagnostics.len(),
                diagnostic_count,
                "diagnostics mismatch for `{}`",
                source
            );
        }
    }

    #[test]
    fn test_rule_order_preserved() {
        let result = parse("* @a\n*.js @b\nsrc/ @c\n");
        let patterns: Vec<&str> = result.rules.iter().map(|r| r.pattern.as_str()).collect();
        assert_eq!(patterns, vec!["*", "*.js", "src/"]);
        assert_eq!(
            result.rules.iter().map(|r| r.line).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_malformed_line_is_counted_not_fatal() {
        let result = parse("ok/ @a\nbad\0pattern @b\nalso-ok @c\n");
        assert_eq!(result.rules.len(), 2);
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic::MalformedRule {
                line: 2,
                reason: "pattern contains a NUL byte".to_string(),
            }]
        );
    }
}
