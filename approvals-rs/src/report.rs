//! Wire-shaped report types consumed by the UI layer. Field names follow
//! the JSON contract of the downstream consumer, so everything serializes
//! in camelCase.

use serde::{Deserialize, Serialize};

use crate::error::Diagnostic;

/// Current review state of the pull request, supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewState {
    pub approvals: Vec<String>,
    pub requested_reviewers: Vec<String>,
}

/// Display info for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerDetail {
    /// User handle, or the full `org/team` slug for teams.
    pub username: String,
    /// Resolved display name, where the roster lookup provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub is_team: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproverType {
    User,
    Team,
}

/// One approval group, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub files: Vec<String>,
    pub needs_approval: bool,
    /// True for the group of files matched by no rule (or by an explicit
    /// empty-owner rule). Such a group needs no approval but is flagged
    /// rather than reported as approvable.
    pub unowned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver_type: Option<ApproverType>,
    /// Display name of the satisfying team, for team approvals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    pub approved_team_members: Vec<String>,
    pub owner_details: Vec<OwnerDetail>,
}

/// Which rule decided one changed file's ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub owners: Vec<String>,
}

/// The full analysis result for one change set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// The minimal set of disjoint approval groups.
    pub min_required_approvals: Vec<GroupView>,
    /// One entry per changed file, exposing the matched rule.
    pub file_approval_details: Vec<FileDetail>,
    pub total_groups_needing_approval: usize,
    /// Distinct owners across all groups, for UI convenience.
    pub all_user_details: Vec<OwnerDetail>,
    pub approvals: Vec<String>,
    pub requested_reviewers: Vec<String>,
    /// Whether any team owners exist at all; lets the caller phrase
    /// "no teams configured" vs "insufficient permission".
    pub teams_configured: bool,
    pub diagnostics: Vec<Diagnostic>,
}
