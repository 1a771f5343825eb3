use std::collections::{HashMap, HashSet};

use crate::groups::ApprovalGroup;
use crate::owner::OwnerRef;
use crate::report::ReviewState;
use crate::team::{short_name, Team};

/// Handles compare case-insensitively, with a leading `@` ignored.
fn normalize_handle(handle: &str) -> String {
    handle.trim_start_matches('@').to_ascii_lowercase()
}

/// Decide per-group satisfaction from the current review state. Pure: no
/// I/O, deterministic for identical inputs. `rosters` is keyed by
/// lowercased team slug.
///
/// A group is satisfied when any user owner has approved, any resolved
/// member of a team owner has approved, or an approval is recorded under a
/// team owner's own handle. When several owners would individually satisfy
/// the group, the first in owner-declaration order wins.
pub fn evaluate(
    groups: Vec<ApprovalGroup>,
    rosters: &HashMap<String, Team>,
    review: &ReviewState,
) -> Vec<ApprovalGroup> {
    let approvals: HashSet<String> = review.approvals.iter().map(|h| normalize_handle(h)).collect();

    groups
        .into_iter()
        .map(|mut group| {
            let verdict = group
                .owners
                .iter()
                .find_map(|owner| satisfying_approval(owner, rosters, &approvals));
            if let Some((owner, members)) = verdict {
                group.satisfied = true;
                group.satisfied_by = Some(owner);
                group.satisfying_team_members = members;
            } else {
                group.satisfied = false;
                group.satisfied_by = None;
                group.satisfying_team_members = Vec::new();
            }
            group
        })
        .collect()
}

/// Check one owner against the approval set. For team satisfaction via
/// members, returns every approving member (the group is satisfied by the
/// fact at least one exists).
fn satisfying_approval(
    owner: &OwnerRef,
    rosters: &HashMap<String, Team>,
    approvals: &HashSet<String>,
) -> Option<(OwnerRef, Vec<String>)> {
    match owner {
        OwnerRef::User { handle } => approvals
            .contains(&normalize_handle(handle))
            .then(|| (owner.clone(), Vec::new())),
        OwnerRef::Team { slug } => {
            let key = slug.to_ascii_lowercase();
            // Team-level approval records carry the team's own handle,
            // qualified with the org or not.
            if approvals.contains(&key) || approvals.contains(short_name(&key)) {
                return Some((owner.clone(), Vec::new()));
            }
            let team = rosters.get(&key)?;
            let mut approving = team
                .members
                .iter()
                .filter(|member| approvals.contains(&normalize_handle(member)))
                .cloned()
                .collect::<Vec<_>>();
            if approving.is_empty() {
                return None;
            }
            approving.sort_by_key(|member| member.to_ascii_lowercase());
            Some((owner.clone(), approving))
        }
    }
}
