use std::collections::{HashMap, HashSet};
use std::time::Duration;

use log::debug;

use crate::evaluator;
use crate::groups::{build_groups, ApprovalGroup};
use crate::owner::OwnerRef;
use crate::parser;
use crate::report::{
    AnalysisReport, ApproverType, FileDetail, GroupView, OwnerDetail, ReviewState,
};
use crate::ruleset::{FileOwnership, RuleSet};
use crate::team::{resolve_teams, short_name, RosterCache, Team, TeamLookup};

/// Default TTL for cached team rosters.
const DEFAULT_ROSTER_TTL: Duration = Duration::from_secs(300);

/// Upper bound on concurrent team lookups per analysis.
const DEFAULT_TEAM_FANOUT: usize = 8;

/// The engine's entry point. Holds the team lookup collaborator and the
/// roster cache that persists across analyses; everything else is scoped to
/// one `analyze` call.
pub struct Analyzer<L> {
    lookup: L,
    roster_cache: RosterCache,
    team_fanout: usize,
}

impl<L: TeamLookup> Analyzer<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            roster_cache: RosterCache::new(DEFAULT_ROSTER_TTL),
            team_fanout: DEFAULT_TEAM_FANOUT,
        }
    }

    pub fn with_roster_ttl(mut self, ttl: Duration) -> Self {
        self.roster_cache = RosterCache::new(ttl);
        self
    }

    pub fn with_team_fanout(mut self, fanout: usize) -> Self {
        self.team_fanout = fanout;
        self
    }

    /// The roster cache, exposed for explicit invalidation when the caller
    /// knows a team changed.
    pub fn roster_cache(&self) -> &RosterCache {
        &self.roster_cache
    }

    /// Run one analysis: parse the rules, resolve per-file ownership,
    /// partition into approval groups, resolve the referenced teams, and
    /// evaluate satisfaction against the review state.
    ///
    /// Never fails once inputs are in hand: recoverable problems surface in
    /// the report's diagnostics, and team-lookup failures degrade the
    /// affected team only.
    pub fn analyze(
        &self,
        changed_files: &[String],
        rules_text: &str,
        review: &ReviewState,
    ) -> AnalysisReport {
        let parsed = parser::parse(rules_text);
        let mut diagnostics = parsed.diagnostics;
        let ruleset = RuleSet::new(parsed.rules);

        let ownerships = ruleset.resolve_all(changed_files);
        let details = file_details(&ruleset, &ownerships);

        // No changed files or no rules: a report with zero groups.
        if changed_files.is_empty() || ruleset.is_empty() {
            return AnalysisReport {
                min_required_approvals: Vec::new(),
                file_approval_details: details,
                total_groups_needing_approval: 0,
                all_user_details: Vec::new(),
                approvals: review.approvals.clone(),
                requested_reviewers: review.requested_reviewers.clone(),
                teams_configured: false,
                diagnostics,
            };
        }

        let groups = build_groups(&ownerships);
        debug!(
            "{} changed files resolved into {} groups",
            changed_files.len(),
            groups.len()
        );

        let slugs = distinct_team_slugs(&groups);
        let teams_configured = !slugs.is_empty();
        let (rosters, team_diagnostics) =
            resolve_teams(&slugs, &self.lookup, &self.roster_cache, self.team_fanout);
        diagnostics.extend(team_diagnostics);

        let groups = evaluator::evaluate(groups, &rosters, review);

        let group_views = groups
            .iter()
            .map(|group| group_view(group, &rosters))
            .collect::<Vec<_>>();
        let total_needing = group_views
            .iter()
            .filter(|view| view.needs_approval)
            .count();

        AnalysisReport {
            all_user_details: all_owner_details(&groups, &rosters),
            min_required_approvals: group_views,
            file_approval_details: details,
            total_groups_needing_approval: total_needing,
            approvals: review.approvals.clone(),
            requested_reviewers: review.requested_reviewers.clone(),
            teams_configured,
            diagnostics,
        }
    }
}

/// One-shot analysis with a fresh roster cache.
pub fn resolve_approvals<L: TeamLookup>(
    changed_files: &[String],
    rules_text: &str,
    review: &ReviewState,
    lookup: &L,
) -> AnalysisReport {
    Analyzer::new(lookup).analyze(changed_files, rules_text, review)
}

/// Distinct team slugs referenced across all groups, in first-occurrence
/// order, one entry per team regardless of how many files reference it.
fn distinct_team_slugs(groups: &[ApprovalGroup]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut slugs = Vec::new();
    for group in groups {
        for owner in &group.owners {
            if let OwnerRef::Team { slug } = owner {
                if seen.insert(slug.to_ascii_lowercase()) {
                    slugs.push(slug.clone());
                }
            }
        }
    }
    slugs
}

fn file_details(ruleset: &RuleSet, ownerships: &[FileOwnership]) -> Vec<FileDetail> {
    ownerships
        .iter()
        .map(|ownership| FileDetail {
            file: ownership.path.clone(),
            pattern: ownership
                .rule
                .map(|idx| ruleset.rules()[idx].pattern.clone()),
            owners: ownership.owners.iter().map(|o| o.to_string()).collect(),
        })
        .collect()
}

fn owner_detail(owner: &OwnerRef, rosters: &HashMap<String, Team>) -> OwnerDetail {
    match owner {
        OwnerRef::User { handle } => OwnerDetail {
            username: handle.clone(),
            name: None,
            is_team: false,
        },
        OwnerRef::Team { slug } => OwnerDetail {
            username: slug.clone(),
            name: Some(
                rosters
                    .get(&slug.to_ascii_lowercase())
                    .map(|team| team.name.clone())
                    .unwrap_or_else(|| short_name(slug).to_owned()),
            ),
            is_team: true,
        },
    }
}

fn group_view(group: &ApprovalGroup, rosters: &HashMap<String, Team>) -> GroupView {
    let unowned = group.is_unowned();

    let (approved_by, approver_type, team_name) = match &group.satisfied_by {
        Some(OwnerRef::User { handle }) => (Some(handle.clone()), Some(ApproverType::User), None),
        Some(OwnerRef::Team { slug }) => {
            let team_name = rosters
                .get(&slug.to_ascii_lowercase())
                .map(|team| team.name.clone())
                .unwrap_or_else(|| short_name(slug).to_owned());
            // For member-level satisfaction, the approver shown is the
            // member; a team-level approval record shows the team itself.
            let approved_by = group
                .satisfying_team_members
                .first()
                .cloned()
                .unwrap_or_else(|| slug.clone());
            (Some(approved_by), Some(ApproverType::Team), Some(team_name))
        }
        None => (None, None, None),
    };

    GroupView {
        files: group.files.clone(),
        needs_approval: !group.satisfied && !unowned,
        unowned,
        approved_by,
        approver_type,
        team_name,
        approved_team_members: group.satisfying_team_members.clone(),
        owner_details: group
            .owners
            .iter()
            .map(|owner| owner_detail(owner, rosters))
            .collect(),
    }
}

/// Distinct owners across all groups, in first-occurrence order.
fn all_owner_details(
    groups: &[ApprovalGroup],
    rosters: &HashMap<String, Team>,
) -> Vec<OwnerDetail> {
    let mut seen = HashSet::new();
    let mut details = Vec::new();
    for group in groups {
        for owner in &group.owners {
            if seen.insert(owner.clone()) {
                details.push(owner_detail(owner, rosters));
            }
        }
    }
    details
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::Diagnostic;
    use crate::team::TeamLookupError;

    struct StaticLookup(HashMap<String, Team>);

    impl StaticLookup {
        fn with_teams(teams: &[(&str, &str, &[&str])]) -> Self {
            Self(
                teams
                    .iter()
                    .map(|(slug, name, members)| {
                        (
                            slug.to_ascii_lowercase(),
                            Team::new(
                                *slug,
                                *name,
                                members.iter().map(|m| m.to_string()).collect(),
                            ),
                        )
                    })
                    .collect(),
            )
        }

        fn empty() -> Self {
            Self(HashMap::new())
        }
    }

    impl TeamLookup for StaticLookup {
        fn team(&self, slug: &str) -> Result<Team, TeamLookupError> {
            self.0
                .get(&slug.to_ascii_lowercase())
                .cloned()
                .ok_or(TeamLookupError::NotFound)
        }
    }

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn review(approvals: &[&str]) -> ReviewState {
        ReviewState {
            approvals: approvals.iter().map(|a| a.to_string()).collect(),
            requested_reviewers: Vec::new(),
        }
    }

    #[test]
    fn test_end_to_end_example() {
        let lookup = StaticLookup::with_teams(&[("org/team-x", "team-x", &["erin"])]);
        let report = resolve_approvals(
            &files(&["README.md", "docs/api.md"]),
            "*.md @alice\ndocs/ @bob @org/team-x\n",
            &review(&["bob"]),
            &lookup,
        );

        assert_eq!(report.min_required_approvals.len(), 2);

        let readme = &report.min_required_approvals[0];
        assert_eq!(readme.files, vec!["README.md"]);
        assert!(readme.needs_approval);
        assert_eq!(readme.approved_by, None);

        let docs = &report.min_required_approvals[1];
        assert_eq!(docs.files, vec!["docs/api.md"]);
        assert!(!docs.needs_approval);
        assert_eq!(docs.approved_by.as_deref(), Some("bob"));
        assert_eq!(docs.approver_type, Some(ApproverType::User));

        assert_eq!(report.total_groups_needing_approval, 1);
        assert!(report.teams_configured);

        let detail = &report.file_approval_details[1];
        assert_eq!(detail.file, "docs/api.md");
        assert_eq!(detail.pattern.as_deref(), Some("docs/"));
        assert_eq!(detail.owners, vec!["@bob", "@org/team-x"]);
    }

    #[test]
    fn test_team_member_approval_in_report() {
        let lookup = StaticLookup::with_teams(&[("org/team-x", "Team X", &["carol", "dave"])]);
        let report = resolve_approvals(
            &files(&["src/lib.rs"]),
            "src/ @org/team-x\n",
            &review(&["carol"]),
            &lookup,
        );

        let group = &report.min_required_approvals[0];
        assert!(!group.needs_approval);
        assert_eq!(group.approved_by.as_deref(), Some("carol"));
        assert_eq!(group.approver_type, Some(ApproverType::Team));
        assert_eq!(group.team_name.as_deref(), Some("Team X"));
        assert_eq!(group.approved_team_members, vec!["carol"]);

        let owner = &group.owner_details[0];
        assert_eq!(owner.username, "org/team-x");
        assert_eq!(owner.name.as_deref(), Some("Team X"));
        assert!(owner.is_team);
    }

    #[test]
    fn test_unresolved_team_degrades_with_diagnostic() {
        let report = resolve_approvals(
            &files(&["src/lib.rs"]),
            "src/ @org/hidden\n",
            &review(&["carol"]),
            &StaticLookup::empty(),
        );

        let group = &report.min_required_approvals[0];
        assert!(group.needs_approval);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::UnresolvedTeam {
                slug: "org/hidden".to_string(),
                reason: "team not found".to_string(),
            }]
        );
        // The team still shows up as an owner with its fallback name.
        assert_eq!(group.owner_details[0].name.as_deref(), Some("hidden"));
    }

    #[test]
    fn test_unowned_files_flagged_not_needing_approval() {
        let report = resolve_approvals(
            &files(&["mystery.bin", "docs/a.md"]),
            "docs/ @alice\n",
            &review(&[]),
            &StaticLookup::empty(),
        );

        let unowned = &report.min_required_approvals[0];
        assert_eq!(unowned.files, vec!["mystery.bin"]);
        assert!(unowned.unowned);
        assert!(!unowned.needs_approval);
        assert!(unowned.owner_details.is_empty());

        // Only the owned group counts toward the needing-approval total.
        assert_eq!(report.total_groups_needing_approval, 1);
        assert!(!report.teams_configured);
    }

    #[test]
    fn test_partition_property() {
        let changed = files(&["a.md", "b.rs", "c.md", "d.bin", "src/e.rs"]);
        let report = resolve_approvals(
            &changed,
            "*.md @alice\n*.rs @bob\nsrc/ @org/team-x\n",
            &review(&[]),
            &StaticLookup::with_teams(&[("org/team-x", "team-x", &[])]),
        );

        let mut reported = report
            .min_required_approvals
            .iter()
            .flat_map(|group| group.files.iter().cloned())
            .collect::<Vec<_>>();
        reported.sort();
        let mut expected = changed.clone();
        expected.sort();
        assert_eq!(reported, expected);
    }

    #[test]
    fn test_empty_inputs_produce_zero_groups() {
        let lookup = StaticLookup::empty();

        let no_files = resolve_approvals(&[], "*.md @alice\n", &review(&["x"]), &lookup);
        assert!(no_files.min_required_approvals.is_empty());
        assert_eq!(no_files.total_groups_needing_approval, 0);

        let no_rules = resolve_approvals(&files(&["a.md"]), "# only comments\n", &review(&[]), &lookup);
        assert!(no_rules.min_required_approvals.is_empty());
        assert_eq!(no_rules.file_approval_details.len(), 1);
        assert_eq!(no_rules.file_approval_details[0].pattern, None);
    }

    #[test]
    fn test_reports_are_deterministic() {
        let lookup = StaticLookup::with_teams(&[("org/team-x", "team-x", &["dave", "carol"])]);
        let changed = files(&["z.rs", "a.md", "src/m.rs", "weird.bin"]);
        let rules = "*.md @alice\n*.rs @bob @org/team-x\nsrc/ @org/team-x\n";
        let state = review(&["carol", "alice"]);

        let analyzer = Analyzer::new(&lookup);
        let first = serde_json::to_string(&analyzer.analyze(&changed, rules, &state)).unwrap();
        let second = serde_json::to_string(&analyzer.analyze(&changed, rules, &state)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_passthrough_review_state() {
        let state = ReviewState {
            approvals: vec!["bob".to_string()],
            requested_reviewers: vec!["alice".to_string()],
        };
        let report =
            resolve_approvals(&files(&["a.md"]), "*.md @alice\n", &state, &StaticLookup::empty());
        assert_eq!(report.approvals, vec!["bob"]);
        assert_eq!(report.requested_reviewers, vec!["alice"]);
    }

    #[test]
    fn test_malformed_rule_diagnostics_reach_report() {
        let report = resolve_approvals(
            &files(&["a.md"]),
            "*.md @alice\nbad\0line @bob\n",
            &review(&[]),
            &StaticLookup::empty(),
        );
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.min_required_approvals.len(), 1);
    }
}
