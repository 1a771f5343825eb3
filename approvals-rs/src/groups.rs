use std::collections::HashMap;

use crate::owner::OwnerRef;
use crate::ruleset::FileOwnership;

/// A maximal set of changed files sharing an identical owner set. Any one
/// listed owner approving covers every file in the group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalGroup {
    pub files: Vec<String>,
    /// Owner-declaration order from the rule that produced the group; the
    /// evaluator's tie-break depends on it.
    pub owners: Vec<OwnerRef>,
    pub satisfied: bool,
    pub satisfied_by: Option<OwnerRef>,
    pub satisfying_team_members: Vec<String>,
}

impl ApprovalGroup {
    pub fn is_unowned(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Canonical owner-set signature: owners sorted by tag then lowercased
/// identifier, joined into a stable key. Two files belong to the same group
/// iff their signatures are equal.
fn signature(owners: &[OwnerRef]) -> String {
    let mut keys = owners
        .iter()
        .map(|owner| owner.signature_key())
        .collect::<Vec<_>>();
    keys.sort();
    keys.join("\n")
}

/// Partition file ownerships into approval groups. Files with empty owner
/// sets collapse into a single unowned group. Emission order is the
/// first-occurrence order of each signature among the changed files, so
/// output stays stable relative to the diff.
pub fn build_groups(ownerships: &[FileOwnership]) -> Vec<ApprovalGroup> {
    let mut groups: Vec<ApprovalGroup> = Vec::new();
    let mut index_by_signature: HashMap<String, usize> = HashMap::new();

    for ownership in ownerships {
        let signature = signature(&ownership.owners);
        match index_by_signature.get(&signature) {
            Some(&idx) => groups[idx].files.push(ownership.path.clone()),
            None => {
                index_by_signature.insert(signature, groups.len());
                groups.push(ApprovalGroup {
                    files: vec![ownership.path.clone()],
                    owners: ownership.owners.clone(),
                    satisfied: false,
                    satisfied_by: None,
                    satisfying_team_members: Vec::new(),
                });
            }
        }
    }

    groups
}
