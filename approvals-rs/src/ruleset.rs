use crate::owner::OwnerRef;
use crate::parser::Rule;
use crate::pattern::PatternCache;

/// The resolved ownership of a single changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOwnership {
    pub path: String,
    /// Index into the rule list of the rule that decided ownership, if any.
    pub rule: Option<usize>,
    pub owners: Vec<OwnerRef>,
}

impl FileOwnership {
    /// A file matched by no rule, or by an explicit empty-owner rule.
    pub fn is_unowned(&self) -> bool {
        self.owners.is_empty()
    }
}

/// An ordered list of ownership rules plus the compiled-pattern cache
/// shared across lookups within one analysis.
pub struct RuleSet {
    rules: Vec<Rule>,
    patterns: PatternCache,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            patterns: PatternCache::new(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve ownership for one path. Rules are scanned in declaration
    /// order and the last match wins: later, more specific rules override
    /// earlier broader ones. An explicit empty-owner rule is authoritative
    /// and yields an unowned file rather than falling back to earlier rules.
    pub fn resolve(&self, path: &str) -> FileOwnership {
        let mut matched = None;
        for (idx, rule) in self.rules.iter().enumerate() {
            if self.patterns.compiled(&rule.pattern).matches(path) {
                matched = Some(idx);
            }
        }

        FileOwnership {
            path: path.to_owned(),
            rule: matched,
            owners: matched
                .map(|idx| self.rules[idx].owners.clone())
                .unwrap_or_default(),
        }
    }

    pub fn resolve_all(&self, paths: &[String]) -> Vec<FileOwnership> {
        paths.iter().map(|path| self.resolve(path)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn ruleset(source: &str) -> RuleSet {
        RuleSet::new(parse(source).rules)
    }

    #[test]
    fn test_last_match_wins() {
        let rules = ruleset("*.js @a\nsrc/** @b\n");

        let ownership = rules.resolve("src/a.js");
        assert_eq!(ownership.rule, Some(1));
        assert_eq!(ownership.owners, vec![OwnerRef::from_token("@b")]);

        // Only the first rule matches outside src.
        let ownership = rules.resolve("web/a.js");
        assert_eq!(ownership.rule, Some(0));
        assert_eq!(ownership.owners, vec![OwnerRef::from_token("@a")]);
    }

    #[test]
    fn test_unmatched_file_is_unowned() {
        let rules = ruleset("*.md @alice\n");
        let ownership = rules.resolve("src/main.rs");
        assert_eq!(ownership.rule, None);
        assert!(ownership.is_unowned());
    }

    #[test]
    fn test_explicit_empty_owner_rule_is_authoritative() {
        // The later owner-less rule overrides the broader owned rule; it
        // does not fall back.
        let rules = ruleset("src/** @a\nsrc/generated/\n");

        let ownership = rules.resolve("src/generated/schema.rs");
        assert_eq!(ownership.rule, Some(1));
        assert!(ownership.is_unowned());

        assert_eq!(
            rules.resolve("src/main.rs").owners,
            vec![OwnerRef::from_token("@a")]
        );
    }

    #[test]
    fn test_resolve_all_keeps_input_order() {
        let rules = ruleset("*.md @alice\n");
        let paths = vec![
            "b.md".to_string(),
            "a.md".to_string(),
            "zzz.rs".to_string(),
        ];
        let ownerships = rules.resolve_all(&paths);
        let resolved_paths: Vec<&str> = ownerships.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(resolved_paths, vec!["b.md", "a.md", "zzz.rs"]);
    }
}
