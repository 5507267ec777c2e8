use anyhow::Result;

use crate::candidate::Candidate;
use crate::ops::git::GitOps;

/// Partition of candidates into those already present on the current branch
/// and those still awaiting a backport.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub backported: Vec<Candidate>,
    pub pending: Vec<Candidate>,
}

/// Determine which candidates already exist on the current branch.
///
/// Matching is a title heuristic: a branch commit whose summary starts with
/// the first line of the candidate's upstream merge commit message, or with
/// the `Merge pull request #N` marker, counts as the backport. Edited commit
/// messages produce false negatives and identical titles false positives;
/// both are inherent to the approach and reported as-is.
pub async fn reconcile<G: GitOps>(git: &G, candidates: &[Candidate]) -> Result<ReconcileReport> {
    let history = git.log_summaries("HEAD").await?;
    let mut report = ReconcileReport::default();

    // Oldest merged first, matching the order the backports were applied in.
    let mut ordered: Vec<&Candidate> = candidates.iter().collect();
    ordered.sort_by(|a, b| a.merged_at.cmp(&b.merged_at).then(a.number.cmp(&b.number)));

    for candidate in ordered {
        let upstream_summary = git.commit_summary(&candidate.merge_commit).await?;
        let merge_marker = format!("Merge pull request #{}", candidate.number);

        let found = history
            .iter()
            .any(|summary| summary.starts_with(&upstream_summary) || summary.starts_with(&merge_marker));

        if found {
            report.backported.push(candidate.clone());
        } else {
            report.pending.push(candidate.clone());
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::git::CommitId;
    use crate::ops::git::MockGitOps;

    fn candidate(number: u64, merged_at: &str) -> Candidate {
        Candidate {
            id: format!("PR_{number}"),
            number,
            title: format!("PR {number}"),
            labels: vec![],
            merge_commit: CommitId(format!("commit_{number}")),
            merged_at: Some(merged_at.parse().unwrap()),
        }
    }

    fn numbers(candidates: &[Candidate]) -> Vec<u64> {
        candidates.iter().map(|c| c.number).collect()
    }

    fn mock_git(history: Vec<&str>) -> MockGitOps {
        let history: Vec<String> = history.into_iter().map(|s| s.to_string()).collect();
        let mut git = MockGitOps::new();
        git.expect_log_summaries()
            .returning(move |_| Ok(history.clone()));
        git.expect_commit_summary()
            .returning(|commit| match commit.0.as_str() {
                "commit_10" => Ok("Fix the frobnicator".to_string()),
                "commit_11" => Ok("Add a new widget".to_string()),
                "commit_12" => Ok("Update dependencies".to_string()),
                other => Err(anyhow::anyhow!("unknown commit {other}")),
            });
        git
    }

    #[tokio::test]
    async fn test_summary_prefix_marks_candidate_backported() {
        let git = mock_git(vec![
            "Fix the frobnicator (cherry-picked from upstream)",
            "Unrelated commit",
        ]);

        let report = reconcile(&git, &[candidate(10, "2024-01-01T00:00:00Z")])
            .await
            .unwrap();
        assert_eq!(numbers(&report.backported), vec![10]);
        assert!(report.pending.is_empty());
    }

    #[tokio::test]
    async fn test_merge_marker_marks_candidate_backported() {
        let git = mock_git(vec!["Merge pull request #11 from widgets/feature"]);

        let report = reconcile(&git, &[candidate(11, "2024-01-01T00:00:00Z")])
            .await
            .unwrap();
        assert_eq!(numbers(&report.backported), vec![11]);
    }

    #[tokio::test]
    async fn test_unmatched_candidate_stays_pending() {
        let git = mock_git(vec!["Something else entirely"]);

        let report = reconcile(&git, &[candidate(12, "2024-01-01T00:00:00Z")])
            .await
            .unwrap();
        assert!(report.backported.is_empty());
        assert_eq!(numbers(&report.pending), vec![12]);
    }

    #[tokio::test]
    async fn test_partition_covers_every_candidate_without_overlap() {
        let git = mock_git(vec![
            "Fix the frobnicator",
            "Merge pull request #12 from deps/update",
        ]);

        let candidates = vec![
            candidate(12, "2024-03-01T00:00:00Z"),
            candidate(10, "2024-01-01T00:00:00Z"),
            candidate(11, "2024-02-01T00:00:00Z"),
        ];
        let report = reconcile(&git, &candidates).await.unwrap();

        // Both sets are reported oldest-merged-first.
        assert_eq!(numbers(&report.backported), vec![10, 12]);
        assert_eq!(numbers(&report.pending), vec![11]);
        assert_eq!(report.backported.len() + report.pending.len(), candidates.len());
    }
}
