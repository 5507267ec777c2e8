use chrono::DateTime;
use chrono::Utc;

use crate::ops::git::CommitId;

/// Label that permanently excludes a PR from backporting.
pub const WONT_BACKPORT_LABEL: &str = "wont-backport";

/// Prefix shared by every `backported-<version>.x` label, matched when the
/// exact backported label for this run is not known.
const BACKPORTED_PREFIX: &str = "backported";

// -----------------------------------------------------------------------------
// Types

/// A merged PR eligible for backport consideration.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Opaque node id, used for label mutations.
    pub id: String,
    pub number: u64,
    pub title: String,
    /// Snapshot of the labels at query time.
    pub labels: Vec<String>,
    /// The commit that merged this PR upstream.
    pub merge_commit: CommitId,
    pub merged_at: Option<DateTime<Utc>>,
}

/// How to recognize candidates that were already backported.
#[derive(Debug, Clone)]
pub enum BackportedFilter {
    /// Drop candidates carrying exactly this label.
    Exact(String),
    /// Drop candidates carrying any label starting with `backported`.
    AnyPrefixed,
}

impl BackportedFilter {
    fn drops(&self, labels: &[String]) -> bool {
        match self {
            Self::Exact(label) => labels.iter().any(|l| l == label),
            Self::AnyPrefixed => labels.iter().any(|l| l.starts_with(BACKPORTED_PREFIX)),
        }
    }
}

// -----------------------------------------------------------------------------
// Selection

/// Filter and order candidates into the exact sequence to apply.
///
/// Candidates carrying an exclude label or matching `backported` are dropped,
/// the rest are sorted by merge time (PR number breaks ties so the order is
/// deterministic when timestamps collide). With `resume_after` set, the
/// sequence starts strictly after that PR number; a resume point that is not
/// in the list yields an empty sequence.
pub fn select(
    candidates: Vec<Candidate>,
    exclude_labels: &[&str],
    backported: &BackportedFilter,
    resume_after: Option<u64>,
) -> Vec<Candidate> {
    let mut selected: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| !c.labels.iter().any(|l| exclude_labels.contains(&l.as_str())))
        .filter(|c| !backported.drops(&c.labels))
        .collect();

    selected.sort_by(|a, b| a.merged_at.cmp(&b.merged_at).then(a.number.cmp(&b.number)));

    if let Some(after) = resume_after {
        match selected.iter().position(|c| c.number == after) {
            Some(position) => {
                selected.drain(..=position);
            }
            None => return Vec::new(),
        }
    }

    selected
}
