use std::fmt::Display;
use std::sync::LazyLock;

use anyhow::Result;
use anyhow::bail;
use regex::Regex;

static RELEASE_BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^release/(\d+)\.(\d+)$").unwrap());

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?(\d+)\.(\d+)(?:\.(\d+))?$").unwrap());

// -----------------------------------------------------------------------------
// VersionPoint

/// A point in the release history, parsed from a branch name or a tag.
///
/// Components left unset act as wildcards when matching tags, so a major-only
/// point stands for the whole release line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct VersionPoint {
    pub major: u32,
    pub minor: Option<u32>,
    pub patch: Option<u32>,
}

impl VersionPoint {
    /// Parse a `release/<major>.<minor>` branch name.
    pub fn from_branch(branch: &str) -> Option<Self> {
        let caps = RELEASE_BRANCH_RE.captures(branch)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: Some(caps[2].parse().ok()?),
            patch: None,
        })
    }

    /// Parse a `1.2` or `v1.2.3` tag string.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let caps = TAG_RE.captures(tag)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: Some(caps[2].parse().ok()?),
            patch: caps.get(3).and_then(|p| p.as_str().parse().ok()),
        })
    }

    /// The shared starting point of all releases with this major version.
    pub fn ancestor(&self) -> Self {
        Self {
            major: self.major,
            minor: None,
            patch: None,
        }
    }

    /// Whether `other` falls under this point. Every component set on `self`
    /// must be equal; unset components match anything.
    pub fn matches(&self, other: &VersionPoint) -> bool {
        self.major == other.major
            && self.minor.is_none_or(|minor| other.minor == Some(minor))
            && self.patch.is_none_or(|patch| other.patch == Some(patch))
    }
}

impl Display for VersionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
        }
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Label resolution

/// The pair of labels driving one run, computed once and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPair {
    /// Label marking PRs as backport candidates.
    pub candidate: String,
    /// Label marking PRs as already backported. `None` only when the
    /// candidate label was overridden on a non-release branch; the selector
    /// then falls back to prefix matching.
    pub backported: Option<String>,
}

/// Derive the candidate/backported labels for the current branch.
///
/// Overrides fill in individually; with no override the branch must look like
/// `release/<major>.<minor>` since there is no safe default otherwise.
pub fn resolve_labels(
    branch: &str,
    candidate_override: Option<&str>,
    backported_override: Option<&str>,
) -> Result<LabelPair> {
    if let Some(point) = VersionPoint::from_branch(branch) {
        return Ok(LabelPair {
            candidate: candidate_override
                .map(str::to_string)
                .unwrap_or_else(|| format!("backport-candidate-{point}.x")),
            backported: Some(
                backported_override
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("backported-{point}.x")),
            ),
        });
    }

    match candidate_override {
        Some(candidate) => Ok(LabelPair {
            candidate: candidate.to_string(),
            backported: backported_override.map(str::to_string),
        }),
        None => bail!(
            "'{branch}' is not a release branch (expected release/<major>.<minor>); \
             pass --candidates and --backported explicitly"
        ),
    }
}
