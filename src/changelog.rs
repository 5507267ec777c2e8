use std::collections::BTreeSet;
use std::sync::LazyLock;

use anyhow::Result;
use anyhow::anyhow;
use anyhow::bail;
use regex::Regex;

use crate::ops::git::GitOps;
use crate::version::VersionPoint;

static MERGE_PR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Merge pull request #(\d+) from").unwrap());

static SQUASH_PR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(#(\d+)\)$").unwrap());

// -----------------------------------------------------------------------------
// Commit message extraction

/// Extract the PR number recorded in a commit summary, if any.
///
/// Merge commits carry `Merge pull request #N from ...`; squash merges end
/// the summary with `(#N)`. A summary matching neither contributes nothing.
pub fn extract_pr_number(summary: &str) -> Option<u64> {
    if let Some(caps) = MERGE_PR_RE.captures(summary) {
        return caps[1].parse().ok();
    }
    SQUASH_PR_RE
        .captures(summary.trim_end())
        .and_then(|caps| caps[1].parse().ok())
}

// -----------------------------------------------------------------------------
// Classification

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Features,
    Fixes,
    Misc,
}

/// Which bucket wins when a PR carries both a feature and a bug label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DualLabelPolicy {
    #[default]
    FeaturesFirst,
    FixesFirst,
}

const FEATURE_LABELS: [&str; 2] = ["enhancement", "feature"];
const FIX_LABELS: [&str; 1] = ["bug"];

/// Bucket a PR by its labels. Every PR lands in exactly one section.
pub fn classify(labels: &[String], policy: DualLabelPolicy) -> Section {
    let feature = labels.iter().any(|l| FEATURE_LABELS.contains(&l.as_str()));
    let fix = labels.iter().any(|l| FIX_LABELS.contains(&l.as_str()));

    match policy {
        DualLabelPolicy::FeaturesFirst if feature => Section::Features,
        DualLabelPolicy::FixesFirst if fix => Section::Fixes,
        _ if feature => Section::Features,
        _ if fix => Section::Fixes,
        _ => Section::Misc,
    }
}

// -----------------------------------------------------------------------------
// ChangelogDiffer

/// PR set difference between two release points.
#[derive(Debug, PartialEq, Eq)]
pub struct ChangelogDiff {
    /// PRs in the current release but not the previous one, ascending.
    pub new_prs: Vec<u64>,
    /// PRs on the previous release line that never made it to this one; a
    /// non-empty set signals a real release-process gap and is always
    /// reported.
    pub missing_prs: Vec<u64>,
}

pub struct ChangelogDiffer<'a, G: GitOps> {
    git: &'a G,
}

impl<'a, G: GitOps> ChangelogDiffer<'a, G> {
    pub fn new(git: &'a G) -> Self {
        Self { git }
    }

    /// Compute the PR numbers separating two release points.
    ///
    /// Same-minor diffs walk the plain tag-to-tag range. Cross-minor diffs
    /// span a branch boundary, so both sides are walked back to the oldest
    /// tag of the shared major line and compared as sets.
    pub async fn diff(
        &self,
        current: &VersionPoint,
        previous: &VersionPoint,
    ) -> Result<ChangelogDiff> {
        if current.major != previous.major {
            bail!("Diffing across major versions ({current} vs {previous}) is not supported");
        }

        let tags = self.git.tags().await?;
        let current_tag = find_tag(&tags, current)?;
        let previous_tag = find_tag(&tags, previous)?;

        if current.minor == previous.minor {
            let numbers = self
                .prs_in_range(&format!("{previous_tag}..{current_tag}"))
                .await?;
            return Ok(ChangelogDiff {
                new_prs: numbers.into_iter().collect(),
                missing_prs: Vec::new(),
            });
        }

        let ancestor = current.ancestor();
        let ancestor_tag = find_tag(&tags, &ancestor)?;
        let current_set = self
            .prs_in_range(&format!("{ancestor_tag}..{current_tag}"))
            .await?;
        let previous_set = self
            .prs_in_range(&format!("{ancestor_tag}..{previous_tag}"))
            .await?;

        Ok(ChangelogDiff {
            new_prs: current_set.difference(&previous_set).copied().collect(),
            missing_prs: previous_set.difference(&current_set).copied().collect(),
        })
    }

    async fn prs_in_range(&self, range: &str) -> Result<BTreeSet<u64>> {
        let summaries = self.git.log_summaries(range).await?;
        Ok(summaries
            .iter()
            .filter_map(|summary| extract_pr_number(summary))
            .collect())
    }
}

/// Lowest tag matching the point's set components.
fn find_tag(tags: &[String], point: &VersionPoint) -> Result<String> {
    tags.iter()
        .filter_map(|name| VersionPoint::from_tag(name).map(|parsed| (parsed, name)))
        .filter(|(parsed, _)| point.matches(parsed))
        .min_by_key(|(parsed, _)| *parsed)
        .map(|(_, name)| name.clone())
        .ok_or_else(|| anyhow!("No tag found for version {point}"))
}
