pub mod commands;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::PrState;

#[derive(Parser)]
#[command(name = "bb")]
#[command(about = "Bitbucket, Jira and Tempo from the terminal", long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Maximum concurrent per-item fetches (e.g. build statuses)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Repository as workspace/slug (default: config, then git origin)
    #[arg(long, global = true)]
    pub repo: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull requests
    Pr {
        #[command(subcommand)]
        action: PrAction,
    },
    /// Pipelines
    Pipeline {
        #[command(subcommand)]
        action: PipelineAction,
    },
    /// Deployment environments
    #[command(name = "env")]
    Environment {
        #[command(subcommand)]
        action: EnvironmentAction,
    },
    /// Jira issues
    Issue {
        #[command(subcommand)]
        action: IssueAction,
    },
    /// Tempo worklogs
    Tempo {
        #[command(subcommand)]
        action: TempoAction,
    },
}

#[derive(Subcommand)]
pub enum PrAction {
    /// List pull requests
    #[command(visible_alias = "ls")]
    List(PrListArgs),
}

#[derive(Args)]
pub struct PrListArgs {
    /// Filter by state (open, merged, declined, superseded)
    #[arg(long = "state", default_values_t = [PrState::Open])]
    pub states: Vec<PrState>,

    /// Filter by author nickname
    #[arg(short, long)]
    pub author: Option<String>,

    /// Filter by title
    #[arg(long)]
    pub search: Option<String>,

    /// Filter by source branch
    #[arg(long)]
    pub source: Option<String>,

    /// Filter by destination branch
    #[arg(short, long)]
    pub destination: Option<String>,

    /// Show reviewers and approvals
    #[arg(long)]
    pub participants: bool,

    /// Show the latest build status of each pull request
    #[arg(short, long)]
    pub status: bool,

    /// Pull requests per page
    #[arg(short, long)]
    pub limit: Option<u32>,

    /// Maximum number of pages to read
    #[arg(short, long, default_value_t = 1)]
    pub pages: usize,
}

#[derive(Subcommand)]
pub enum PipelineAction {
    /// List the most recent pipelines
    #[command(visible_alias = "ls")]
    List {
        /// Number of pipelines
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: u32,

        /// Only pipelines that ran on this branch
        #[arg(short, long)]
        branch: Option<String>,
    },
    /// List repository pipeline variables; secured values show as ***
    #[command(visible_alias = "var")]
    Variables,
}

#[derive(Subcommand)]
pub enum EnvironmentAction {
    /// List deployment environments
    #[command(visible_alias = "ls")]
    List {
        /// Show the pipeline that last deployed to each environment
        #[arg(short, long)]
        status: bool,
    },
    /// List the deployment variables of one environment
    #[command(visible_alias = "var")]
    Variables {
        /// Environment name, e.g. Production
        name: String,
    },
}

#[derive(Subcommand)]
pub enum IssueAction {
    /// List issues, by default those assigned to you
    #[command(visible_alias = "ls")]
    List(IssueListArgs),
}

#[derive(Args)]
pub struct IssueListArgs {
    /// Project key (default: derived from the current branch name)
    #[arg(short, long)]
    pub project: Option<String>,

    /// Issues of anyone, not just yours
    #[arg(short, long, conflicts_with = "reporter")]
    pub all: bool,

    /// Issues you reported instead of issues assigned to you
    #[arg(short, long)]
    pub reporter: bool,

    /// Filter by status; configured aliases are expanded
    #[arg(short, long = "status")]
    pub statuses: Vec<String>,

    /// Filter by issue type
    #[arg(short, long = "type")]
    pub types: Vec<String>,

    /// Filter by summary
    #[arg(long)]
    pub search: Option<String>,

    /// Sort by priority instead of status
    #[arg(short = 'P', long)]
    pub priority: bool,

    /// Issues per page
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: u32,

    /// Maximum number of pages to read
    #[arg(long, default_value_t = 1)]
    pub pages: usize,
}

#[derive(Subcommand)]
pub enum TempoAction {
    /// List your worklogs, by default today's
    #[command(visible_alias = "ls")]
    List {
        /// First day, YYYY-MM-DD (default: today)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day, YYYY-MM-DD (default: same as --from)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Skip looking up the Jira issue of each worklog
        #[arg(long)]
        no_issues: bool,
    },
}
