mod engine;
mod error;
mod evaluator;
mod groups;
mod owner;
pub mod parser;
mod pattern;
pub mod report;
mod ruleset;
pub mod team;

pub use engine::{resolve_approvals, Analyzer};
pub use error::{Diagnostic, Error};
pub use evaluator::evaluate;
pub use groups::{build_groups, ApprovalGroup};
pub use owner::OwnerRef;
pub use parser::{parse, ParseResult, Rule};
pub use pattern::{Pattern, PatternCache};
pub use report::{AnalysisReport, ApproverType, FileDetail, GroupView, OwnerDetail, ReviewState};
pub use ruleset::{FileOwnership, RuleSet};
pub use team::{RosterCache, Team, TeamLookup, TeamLookupError};
