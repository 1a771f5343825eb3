use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A compiled ownership pattern, matched against repository-relative paths
/// with the usual directory-ownership glob semantics: `*` matches within a
/// path segment, `**` matches across segments, a trailing `/` matches the
/// directory's contents recursively, a leading `/` anchors to the rule
/// file's root, and a single-segment pattern floats (matches its basename
/// anywhere in the tree).
///
/// Compilation is infallible and happens once per distinct pattern string;
/// see [`PatternCache`].
#[derive(Debug, Clone)]
pub struct Pattern {
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
enum Step {
    /// Matches zero or more path segments. Produced by `**`, by floating
    /// single-segment patterns, and by the implicit recursive suffix.
    Skip,
    /// Matches exactly one path segment against a condition.
    One(Condition),
}

impl Pattern {
    pub fn new(pattern: &str) -> Pattern {
        // A leading slash forces left-anchoring, so remember whether it was
        // present.
        let (pattern, anchored) = match pattern.strip_prefix('/') {
            Some(rest) => (rest, true),
            None => (pattern, false),
        };
        let (pattern, trailing_slash) = match pattern.strip_suffix('/') {
            Some(rest) => (rest, true),
            None => (pattern, false),
        };

        // Rule files use Unix path separators.
        let segments = pattern.split('/').collect::<Vec<_>>();

        let mut steps = Vec::new();

        // All patterns are left-anchored unless they're a single component
        // with no leading slash (a trailing slash is permitted).
        if !anchored && segments.len() == 1 {
            steps.push(Step::Skip);
        }

        for segment in &segments {
            match *segment {
                "**" => steps.push(Step::Skip),
                _ => steps.push(Step::One(Condition::new(segment))),
            }
        }

        // A trailing slash or trailing `**` matches everything under the
        // directory, but not the directory itself, so one more segment is
        // required.
        let last = segments.last().copied().unwrap_or("");
        if trailing_slash || last == "**" {
            steps.push(Step::One(Condition::Unconditional));
        }

        // Patterns are prefix-matched, which effectively means they end in
        // /**. The exception is patterns ending with a single wildcard,
        // which match exactly one trailing segment, not recursively.
        if last != "*" {
            steps.push(Step::Skip);
        }

        // Consecutive skips add no constraint beyond a single one.
        steps.dedup_by(|a, b| matches!(*a, Step::Skip) && matches!(*b, Step::Skip));

        Pattern { steps }
    }

    pub fn matches(&self, path: &str) -> bool {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        Self::steps_match(&self.steps, &segments)
    }

    fn steps_match(steps: &[Step], segments: &[&str]) -> bool {
        match steps.split_first() {
            None => segments.is_empty(),
            Some((Step::One(condition), rest)) => match segments.split_first() {
                Some((segment, remaining)) => {
                    condition.is_match(segment) && Self::steps_match(rest, remaining)
                }
                None => false,
            },
            // Skip consumes any number of leading segments; try every split.
            Some((Step::Skip, rest)) => {
                (0..=segments.len()).any(|n| Self::steps_match(rest, &segments[n..]))
            }
        }
    }
}

/// How a single pattern segment matches a single path segment. Most
/// segments are literals or simple affix checks; full glob segments fall
/// back to a compiled regex.
#[derive(Debug, Clone)]
enum Condition {
    Unconditional,
    Literal(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Regex(regex::Regex),
}

impl Condition {
    fn new(glob: &str) -> Condition {
        if glob == "*" {
            return Condition::Unconditional;
        }

        let mut chars = glob.chars();
        let leading_star = chars.next().map(|c| c == '*').unwrap_or(false);
        let trailing_star = chars.next_back().map(|c| c == '*').unwrap_or(false);
        let internal_wildcards = chars.any(|c| c == '*' || c == '?');

        match (leading_star, trailing_star, internal_wildcards) {
            (false, false, false) => Condition::Literal(glob.to_owned()),
            (false, true, false) => Condition::Prefix(glob.trim_end_matches('*').to_owned()),
            (true, false, false) => Condition::Suffix(glob.trim_start_matches('*').to_owned()),
            (true, true, false) => Condition::Contains(glob.trim_matches('*').to_owned()),
            _ => Condition::Regex(segment_regex(glob)),
        }
    }

    fn is_match(&self, candidate: &str) -> bool {
        match self {
            Condition::Unconditional => true,
            Condition::Literal(literal) => candidate == literal,
            Condition::Prefix(prefix) => candidate.starts_with(prefix),
            Condition::Suffix(suffix) => candidate.ends_with(suffix),
            Condition::Contains(needle) => {
                memchr::memmem::find(candidate.as_bytes(), needle.as_bytes()).is_some()
            }
            Condition::Regex(re) => re.is_match(candidate),
        }
    }
}

fn segment_regex(glob: &str) -> regex::Regex {
    let mut source = String::with_capacity(glob.len() + 8);
    source.push_str(r"\A");
    for c in glob.chars() {
        match c {
            '*' => source.push_str(r"[^/]*"),
            '?' => source.push_str(r"[^/]"),
            _ => {
                if regex_syntax::is_meta_character(c) {
                    source.push('\\');
                }
                source.push(c);
            }
        }
    }
    source.push_str(r"\z");
    regex::Regex::new(&source).unwrap_or_else(|_| panic!("invalid segment regex: {}", source))
}

/// Request-scoped cache of compiled patterns keyed by their source string.
/// Patterns repeat heavily across rules; each distinct string compiles
/// exactly once and is never rebuilt per file.
#[derive(Clone, Default)]
pub struct PatternCache {
    compiled: Arc<RwLock<HashMap<String, Arc<Pattern>>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compiled(&self, pattern: &str) -> Arc<Pattern> {
        if let Some(compiled) = self.compiled.read().expect("valid lock").get(pattern) {
            return Arc::clone(compiled);
        }

        let compiled = Arc::new(Pattern::new(pattern));
        Arc::clone(
            self.compiled
                .write()
                .expect("valid lock")
                .entry(pattern.to_owned())
                .or_insert(compiled),
        )
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.compiled.read().expect("valid lock").len()
    }
}
