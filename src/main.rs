use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bb::app::AppContext;
use bb::cli::{
    commands, Cli, Commands, EnvironmentAction, IssueAction, PipelineAction, PrAction, TempoAction,
};
use bb::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so listings stay pipeable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(workers) = cli.workers {
        config.fetch.enrich_workers = workers;
    }
    let ctx = AppContext::new(config)?;
    let repo = cli.repo.as_deref();

    match cli.command {
        Commands::Pr {
            action: PrAction::List(args),
        } => {
            let repo = ctx.repo(repo)?;
            commands::list_pull_requests(&ctx, &repo, args).await?;
        }
        Commands::Pipeline {
            action: PipelineAction::List { limit, branch },
        } => {
            let repo = ctx.repo(repo)?;
            commands::list_pipelines(&ctx, &repo, limit, branch).await?;
        }
        Commands::Pipeline {
            action: PipelineAction::Variables,
        } => {
            let repo = ctx.repo(repo)?;
            commands::list_pipeline_variables(&ctx, &repo).await?;
        }
        Commands::Environment {
            action: EnvironmentAction::List { status },
        } => {
            let repo = ctx.repo(repo)?;
            commands::list_environments(&ctx, &repo, status).await?;
        }
        Commands::Environment {
            action: EnvironmentAction::Variables { name },
        } => {
            let repo = ctx.repo(repo)?;
            commands::list_environment_variables(&ctx, &repo, &name).await?;
        }
        Commands::Issue {
            action: IssueAction::List(args),
        } => {
            commands::list_issues(&ctx, args).await?;
        }
        Commands::Tempo {
            action: TempoAction::List { from, to, no_issues },
        } => {
            commands::list_worklogs(&ctx, from, to, !no_issues).await?;
        }
    }

    Ok(())
}
