use std::path::PathBuf;

use anyhow::Result;
use anyhow::anyhow;
use backport::App;
use backport::Config;
use backport::cancel::UserCancelled;
use backport::ops::git::RealGit;
use backport::ops::github::RealGithub;
use backport::ops::prompt::StdinPrompter;
use clap::Parser;
use clap::Subcommand;
use colored::Colorize;

#[derive(Parser)]
#[command(name = "backport")]
#[command(about = "Backport merged PRs to release branches and assemble release notes", long_about = None)]
pub struct Cli {
    /// GitHub token (falls back to the GITHUB_TOKEN environment variable)
    #[arg(long)]
    pub token: Option<String>,

    /// Path to the repository
    #[arg(long, default_value = ".")]
    pub repository: PathBuf,

    /// Override for the backport-candidate label
    #[arg(long)]
    pub candidates: Option<String>,

    /// Override for the backported label
    #[arg(long)]
    pub backported: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay candidate PR merge commits onto the current release branch
    #[command(alias = "cherry-pick")]
    Cherrypick {
        /// Resume after this PR number (skips it and everything before it)
        #[arg(long)]
        after: Option<u64>,
    },
    /// Mark candidates already present on this branch as backported
    Label,
    /// Assemble categorized release notes between two release tags
    Changelog {
        /// Tag of the release being prepared
        #[arg(long)]
        tag: String,
        /// Tag of the previous release
        #[arg(long)]
        previous_tag: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => 0,
        Err(err) if err.is::<UserCancelled>() => {
            eprintln!("{}", "Cancelled.".yellow());
            2
        }
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red(), err);
            1
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let token = cli
        .token
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .ok_or_else(|| anyhow!("A GitHub token is required; pass --token or set GITHUB_TOKEN"))?;

    let config = Config::new(cli.candidates, cli.backported);
    let git = RealGit::new(cli.repository.clone());
    let gh = RealGithub::new(token, cli.repository).await?;
    let app = App::new(config, git, gh, StdinPrompter);

    match cli.command {
        Commands::Cherrypick { after } => app.cmd_cherry_pick(after, &mut std::io::stdout()).await,
        Commands::Label => app.cmd_label(&mut std::io::stdout()).await,
        Commands::Changelog { tag, previous_tag } => {
            app.cmd_changelog(&tag, &previous_tag, &mut std::io::stdout())
                .await
        }
    }
}
