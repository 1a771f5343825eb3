use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use log::warn;
use rayon::prelude::*;
use thiserror::Error;

use crate::error::Diagnostic;

/// Team metadata and roster, as far as the lookup could resolve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Full `org/team` slug as referenced by the rules.
    pub slug: String,
    pub name: String,
    pub members: Vec<String>,
    /// False when the roster could not be listed (permission, rate limit,
    /// not found). The team still counts as a valid owner for
    /// literal-handle approval matching.
    pub members_resolvable: bool,
}

impl Team {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, members: Vec<String>) -> Team {
        Team {
            slug: slug.into(),
            name: name.into(),
            members,
            members_resolvable: true,
        }
    }

    /// Placeholder for a team whose roster could not be fetched.
    pub fn unresolvable(slug: &str) -> Team {
        Team {
            slug: slug.to_owned(),
            name: short_name(slug).to_owned(),
            members: Vec::new(),
            members_resolvable: false,
        }
    }
}

/// The team part of an `org/team` slug.
pub(crate) fn short_name(slug: &str) -> &str {
    slug.rsplit('/').next().unwrap_or(slug)
}

/// Failure modes a [`TeamLookup`] may signal. None of them abort an
/// analysis: the affected team degrades to an unresolvable roster.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamLookupError {
    #[error("team not found")]
    NotFound,
    #[error("insufficient permission to list members")]
    PermissionDenied,
    #[error("rate limited")]
    RateLimited,
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

/// External collaborator resolving a team slug to metadata and roster.
/// Implementations signal permission and availability problems as error
/// values so the caller can continue with degraded detail.
pub trait TeamLookup: Sync {
    fn team(&self, slug: &str) -> Result<Team, TeamLookupError>;
}

impl<T: TeamLookup + ?Sized> TeamLookup for &T {
    fn team(&self, slug: &str) -> Result<Team, TeamLookupError> {
        (**self).team(slug)
    }
}

enum Slot {
    /// A fetch for this slug is running; waiters block on the condvar.
    InFlight,
    Ready { team: Team, fetched_at: Instant },
}

/// Read-through cache for team rosters, keyed by slug, with a bounded TTL.
/// Team membership changes infrequently, so staleness is traded against
/// rate-limit pressure on the upstream API.
///
/// Get-or-fetch is atomic per slug: at most one fetch is in flight for a
/// given slug, concurrent callers wait for its result, and the lock is
/// never held across the fetch itself. Failed fetches are not cached.
pub struct RosterCache {
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
    fetched: Condvar,
}

impl RosterCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
            fetched: Condvar::new(),
        }
    }

    /// Invalidation hook for a single slug, for callers that know a team
    /// changed.
    pub fn invalidate(&self, slug: &str) {
        self.slots.lock().expect("valid lock").remove(slug);
    }

    pub fn clear(&self) {
        self.slots.lock().expect("valid lock").clear();
    }

    pub fn get_or_fetch(
        &self,
        slug: &str,
        fetch: impl FnOnce() -> Result<Team, TeamLookupError>,
    ) -> Result<Team, TeamLookupError> {
        let mut slots = self.slots.lock().expect("valid lock");
        loop {
            match slots.get(slug) {
                Some(Slot::Ready { team, fetched_at }) if fetched_at.elapsed() < self.ttl => {
                    return Ok(team.clone());
                }
                Some(Slot::InFlight) => {
                    slots = self.fetched.wait(slots).expect("valid lock");
                }
                // Stale or absent: this caller fetches.
                _ => break,
            }
        }
        slots.insert(slug.to_owned(), Slot::InFlight);
        drop(slots);

        let result = fetch();

        let mut slots = self.slots.lock().expect("valid lock");
        match &result {
            Ok(team) => {
                slots.insert(
                    slug.to_owned(),
                    Slot::Ready {
                        team: team.clone(),
                        fetched_at: Instant::now(),
                    },
                );
            }
            Err(_) => {
                slots.remove(slug);
            }
        }
        drop(slots);
        self.fetched.notify_all();

        result
    }
}

/// Resolve every distinct team slug through the lookup, one logical call
/// per team, fanned out over a bounded worker pool. Lookup failures degrade
/// that team to an empty unresolvable roster and surface as diagnostics;
/// they never abort resolution of other teams.
///
/// Returns rosters keyed by lowercased slug.
pub(crate) fn resolve_teams<L: TeamLookup>(
    slugs: &[String],
    lookup: &L,
    cache: &RosterCache,
    max_fanout: usize,
) -> (HashMap<String, Team>, Vec<Diagnostic>) {
    if slugs.is_empty() {
        return (HashMap::new(), Vec::new());
    }

    let fetch = |slug: &String| {
        (
            slug.clone(),
            cache.get_or_fetch(slug, || lookup.team(slug)),
        )
    };

    let threads = max_fanout.clamp(1, slugs.len());
    let results: Vec<(String, Result<Team, TeamLookupError>)> =
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(|| slugs.par_iter().map(fetch).collect()),
            Err(err) => {
                warn!("team fan-out pool unavailable ({}), resolving sequentially", err);
                slugs.iter().map(fetch).collect()
            }
        };

    let mut rosters = HashMap::new();
    let mut diagnostics = Vec::new();
    for (slug, result) in results {
        match result {
            Ok(team) => {
                rosters.insert(slug.to_ascii_lowercase(), team);
            }
            Err(err) => {
                warn!("team {} unresolved: {}", slug, err);
                diagnostics.push(Diagnostic::UnresolvedTeam {
                    slug: slug.clone(),
                    reason: err.to_string(),
                });
                rosters.insert(slug.to_ascii_lowercase(), Team::unresolvable(&slug));
            }
        }
    }

    (rosters, diagnostics)
}
