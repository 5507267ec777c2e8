#![allow(async_fn_in_trait)]

use std::path;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use anyhow::bail;
use chrono::DateTime;
use chrono::Utc;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde_json::json;
use tokio::process::Command;
use tracing::instrument;

use super::curl::GithubCurlClient;
use crate::candidate::Candidate;
use crate::ops::git::CommitId;

// -----------------------------------------------------------------------------
// GithubOps trait

/// A single PR as needed for changelog enrichment.
#[derive(Debug, Clone)]
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub url: String,
    pub labels: Vec<String>,
}

/// Operations for interacting with GitHub
#[cfg_attr(test, automock)]
pub trait GithubOps {
    /// All merged PRs carrying `label`, in no particular order.
    async fn list_merged_prs(&self, label: &str) -> Result<Vec<Candidate>>;

    /// Look up a single PR by number.
    async fn pr_by_number(&self, number: u64) -> Result<PullRequestSummary>;

    /// Resolve a label name to its node id; the label must exist.
    async fn label_id(&self, name: &str) -> Result<String>;

    async fn add_label(&self, pr_id: &str, label_id: &str) -> Result<()>;

    async fn remove_label(&self, pr_id: &str, label_id: &str) -> Result<()>;
}

// -----------------------------------------------------------------------------
// GraphQL wire format

const GRAPHQL_URL: &str = "https://api.github.com/graphql";

// labels(first: 100) so a PR with many labels still reports membership in
// wont-backport / backported-* correctly; the default page size truncates.
const LIST_MERGED_PRS_QUERY: &str = r#"
query($owner: String!, $name: String!, $label: String!, $after: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(labels: [$label], states: MERGED, first: 100, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes {
        id
        number
        title
        mergedAt
        mergeCommit { oid }
        labels(first: 100) { nodes { name } }
      }
    }
  }
}
"#;

const PR_BY_NUMBER_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    pullRequest(number: $number) {
      number
      title
      url
      author { login }
      labels(first: 100) { nodes { name } }
    }
  }
}
"#;

const LABEL_QUERY: &str = r#"
query($owner: String!, $name: String!, $label: String!) {
  repository(owner: $owner, name: $name) {
    label(name: $label) { id }
  }
}
"#;

const ADD_LABEL_MUTATION: &str = r#"
mutation($labelable: ID!, $label: ID!) {
  addLabelsToLabelable(input: { labelableId: $labelable, labelIds: [$label] }) {
    clientMutationId
  }
}
"#;

const REMOVE_LABEL_MUTATION: &str = r#"
mutation($labelable: ID!, $label: ID!) {
  removeLabelsFromLabelable(input: { labelableId: $labelable, labelIds: [$label] }) {
    clientMutationId
  }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestsData {
    repository: Option<PullRequestsRepository>,
}

#[derive(Debug, Deserialize)]
struct PullRequestsRepository {
    #[serde(rename = "pullRequests")]
    pull_requests: PullRequestPage,
}

#[derive(Debug, Deserialize)]
struct PullRequestPage {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    nodes: Vec<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PullRequestNode {
    id: String,
    number: u64,
    title: String,
    #[serde(rename = "mergedAt")]
    merged_at: Option<DateTime<Utc>>,
    #[serde(rename = "mergeCommit")]
    merge_commit: Option<Oid>,
    labels: Option<LabelPage>,
}

#[derive(Debug, Deserialize)]
struct Oid {
    oid: String,
}

#[derive(Debug, Deserialize)]
struct LabelPage {
    nodes: Vec<LabelNode>,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestData {
    repository: Option<PullRequestRepository>,
}

#[derive(Debug, Deserialize)]
struct PullRequestRepository {
    #[serde(rename = "pullRequest")]
    pull_request: Option<SummaryNode>,
}

#[derive(Debug, Deserialize)]
struct SummaryNode {
    number: u64,
    title: String,
    url: String,
    author: Option<Author>,
    labels: Option<LabelPage>,
}

#[derive(Debug, Deserialize)]
struct Author {
    login: String,
}

#[derive(Debug, Deserialize)]
struct LabelData {
    repository: Option<LabelRepository>,
}

#[derive(Debug, Deserialize)]
struct LabelRepository {
    label: Option<IdNode>,
}

#[derive(Debug, Deserialize)]
struct IdNode {
    id: String,
}

fn label_names(labels: Option<LabelPage>) -> Vec<String> {
    labels
        .map(|page| page.nodes.into_iter().map(|node| node.name).collect())
        .unwrap_or_default()
}

// -----------------------------------------------------------------------------
// RealGithub

/// Real implementation backed by the GitHub GraphQL API.
pub struct RealGithub {
    owner: String,
    repo: String,
    http_client: GithubCurlClient,
}

impl RealGithub {
    pub async fn new(token: String, path: path::PathBuf) -> Result<Self> {
        let (owner, repo) = Self::detect_owner_and_repo(&path).await?;
        let http_client = GithubCurlClient::new(token);

        Ok(Self {
            owner,
            repo,
            http_client,
        })
    }

    /// Detect owner and repo from git remote URL
    async fn detect_owner_and_repo(path: &path::Path) -> Result<(String, String)> {
        let output = Command::new("git")
            .current_dir(path)
            .args(["config", "--get", "remote.origin.url"])
            .output()
            .await
            .context("Failed to get git remote URL")?;

        if !output.status.success() {
            bail!("No git remote 'origin' configured");
        }

        let url = String::from_utf8(output.stdout)?.trim().to_string();

        // Parse URLs like:
        // git@github.com:owner/repo.git
        // https://github.com/owner/repo.git
        let parts = if url.starts_with("git@github.com:") {
            url.strip_prefix("git@github.com:")
                .context("Invalid GitHub URL format")?
        } else if url.starts_with("https://github.com/") {
            url.strip_prefix("https://github.com/")
                .context("Invalid GitHub URL format")?
        } else {
            bail!("Remote URL is not a GitHub URL: {}", url);
        };

        let parts = parts.strip_suffix(".git").unwrap_or(parts);
        let mut split = parts.split('/');
        let owner = split
            .next()
            .context("Could not parse owner from GitHub URL")?
            .to_string();
        let repo = split
            .next()
            .context("Could not parse repo from GitHub URL")?
            .to_string();

        Ok((owner, repo))
    }

    async fn query<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let payload = json!({ "query": query, "variables": variables });
        let response = self.http_client.post(GRAPHQL_URL, &payload.to_string()).await?;

        let parsed: GraphQlResponse<T> =
            serde_json::from_str(&response).context("Failed to parse GraphQL response")?;
        if let Some(error) = parsed.errors.first() {
            bail!("GitHub GraphQL error: {}", error.message);
        }
        parsed
            .data
            .ok_or_else(|| anyhow!("GraphQL response contained no data"))
    }
}

impl GithubOps for RealGithub {
    #[instrument(skip_all)]
    async fn list_merged_prs(&self, label: &str) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let data: PullRequestsData = self
                .query(
                    LIST_MERGED_PRS_QUERY,
                    json!({
                        "owner": self.owner,
                        "name": self.repo,
                        "label": label,
                        "after": after,
                    }),
                )
                .await?;

            let page = data
                .repository
                .ok_or_else(|| anyhow!("Repository {}/{} not found", self.owner, self.repo))?
                .pull_requests;

            for node in page.nodes {
                let Some(merge_commit) = node.merge_commit else {
                    log::warn!("PR #{} has no merge commit; skipping", node.number);
                    continue;
                };
                candidates.push(Candidate {
                    id: node.id,
                    number: node.number,
                    title: node.title,
                    labels: label_names(node.labels),
                    merge_commit: CommitId(merge_commit.oid),
                    merged_at: node.merged_at,
                });
            }

            if !page.page_info.has_next_page {
                break;
            }
            after = page.page_info.end_cursor;
        }

        Ok(candidates)
    }

    #[instrument(skip_all)]
    async fn pr_by_number(&self, number: u64) -> Result<PullRequestSummary> {
        let data: PullRequestData = self
            .query(
                PR_BY_NUMBER_QUERY,
                json!({ "owner": self.owner, "name": self.repo, "number": number }),
            )
            .await?;

        let node = data
            .repository
            .and_then(|repository| repository.pull_request)
            .ok_or_else(|| anyhow!("PR #{} not found in {}/{}", number, self.owner, self.repo))?;

        Ok(PullRequestSummary {
            number: node.number,
            title: node.title,
            // Deleted accounts come back without an author.
            author: node
                .author
                .map(|author| author.login)
                .unwrap_or_else(|| "ghost".to_string()),
            url: node.url,
            labels: label_names(node.labels),
        })
    }

    #[instrument(skip_all)]
    async fn label_id(&self, name: &str) -> Result<String> {
        let data: LabelData = self
            .query(
                LABEL_QUERY,
                json!({ "owner": self.owner, "name": self.repo, "label": name }),
            )
            .await?;

        data.repository
            .and_then(|repository| repository.label)
            .map(|label| label.id)
            .ok_or_else(|| {
                anyhow!("Label '{}' does not exist in {}/{}", name, self.owner, self.repo)
            })
    }

    #[instrument(skip_all)]
    async fn add_label(&self, pr_id: &str, label_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .query(
                ADD_LABEL_MUTATION,
                json!({ "labelable": pr_id, "label": label_id }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn remove_label(&self, pr_id: &str, label_id: &str) -> Result<()> {
        let _: serde_json::Value = self
            .query(
                REMOVE_LABEL_MUTATION,
                json!({ "labelable": pr_id, "label": label_id }),
            )
            .await?;
        Ok(())
    }
}
