use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;

use approvals_rs::{
    resolve_approvals, AnalysisReport, Error, ReviewState, Team, TeamLookup, TeamLookupError,
};

#[derive(Parser)]
#[command(version, about = "Show which approvals a change set still needs")]
struct Cli {
    /// Changed files; the working tree is walked when none are given.
    paths: Vec<PathBuf>,

    #[clap(short = 'f', long = "file")]
    rules_file: Option<PathBuf>,

    /// Handles that have already approved, comma-separated.
    #[arg(long, value_delimiter = ',')]
    approvals: Vec<String>,

    /// Handles with a review requested but not yet given.
    #[arg(long = "requested-reviewers", value_delimiter = ',')]
    requested_reviewers: Vec<String>,

    /// JSON file mapping team slugs to `{"name": ..., "members": [...]}`.
    #[arg(long)]
    teams: Option<PathBuf>,

    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn rules_path(&self) -> PathBuf {
        self.rules_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("./CODEOWNERS"))
    }
}

#[derive(Deserialize)]
struct TeamSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    members: Vec<String>,
}

/// Team rosters read from a local JSON file, standing in for the live
/// directory service.
struct FileTeams(HashMap<String, Team>);

impl FileTeams {
    fn load(path: Option<&Path>) -> Result<FileTeams> {
        let Some(path) = path else {
            return Ok(FileTeams(HashMap::new()));
        };
        let text = fs::read_to_string(path)
            .map_err(|err| Error::Upstream(format!("{}: {}", path.display(), err)))?;
        let specs: HashMap<String, TeamSpec> = serde_json::from_str(&text)
            .map_err(|err| Error::Upstream(format!("{}: {}", path.display(), err)))?;

        let teams = specs
            .into_iter()
            .map(|(slug, spec)| {
                let key = slug.to_ascii_lowercase();
                let name = spec
                    .name
                    .unwrap_or_else(|| slug.rsplit('/').next().unwrap_or(&slug).to_owned());
                (key, Team::new(slug, name, spec.members))
            })
            .collect();
        Ok(FileTeams(teams))
    }
}

impl TeamLookup for FileTeams {
    fn team(&self, slug: &str) -> Result<Team, TeamLookupError> {
        self.0
            .get(&slug.to_ascii_lowercase())
            .cloned()
            .ok_or(TeamLookupError::NotFound)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let rules_path = cli.rules_path();
    let rules_text = fs::read_to_string(&rules_path)
        .map_err(|err| Error::Upstream(format!("{}: {}", rules_path.display(), err)))?;

    let teams = FileTeams::load(cli.teams.as_deref())?;

    let changed_files: Vec<String> = if cli.paths.is_empty() {
        walk_files(".").collect()
    } else {
        cli.paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    };

    let review = ReviewState {
        approvals: cli.approvals.clone(),
        requested_reviewers: cli.requested_reviewers.clone(),
    };
    let report = resolve_approvals(&changed_files, &rules_text, &review, &teams);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &AnalysisReport) {
    for detail in &report.file_approval_details {
        if detail.owners.is_empty() {
            println!("{:<70}  (unowned)", detail.file);
        } else {
            println!("{:<70}  {}", detail.file, detail.owners.join(" "));
        }
    }

    println!();
    for (idx, group) in report.min_required_approvals.iter().enumerate() {
        let status = if group.unowned {
            "unowned".to_string()
        } else if group.needs_approval {
            let owners = group
                .owner_details
                .iter()
                .map(|owner| owner.username.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("needs approval from {}", owners)
        } else {
            match (&group.approved_by, &group.team_name) {
                (Some(by), Some(team)) => format!("approved by {} (member of {})", by, team),
                (Some(by), None) => format!("approved by {}", by),
                _ => "approved".to_string(),
            }
        };
        println!("group {}: {}  [{}]", idx + 1, group.files.join(" "), status);
    }

    println!();
    println!(
        "{} of {} groups still need approval",
        report.total_groups_needing_approval,
        report.min_required_approvals.len()
    );

    for diagnostic in &report.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
}

fn walk_files(root: impl AsRef<Path>) -> impl Iterator<Item = String> {
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !entry.path().starts_with("./.git"))
        .map(|entry| {
            let path = entry.path();
            path.strip_prefix(".")
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned()
        })
}
