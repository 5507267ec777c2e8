use crate::config::Config;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::prompt::Prompter;

/// Shared context for all subcommands: the run configuration plus the three
/// external collaborators, opened once per invocation.
pub struct App<G: GitOps, H: GithubOps, P: Prompter> {
    pub config: Config,
    pub git: G,
    pub gh: H,
    pub prompt: P,
}

impl<G: GitOps, H: GithubOps, P: Prompter> App<G, H, P> {
    pub fn new(config: Config, git: G, gh: H, prompt: P) -> Self {
        Self {
            config,
            git,
            gh,
            prompt,
        }
    }
}
