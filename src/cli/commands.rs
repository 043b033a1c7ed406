use std::io::{self, Write};

use chrono::{Local, NaiveDate};

use crate::api::bitbucket::{PipelineQuery, PullRequestQuery};
use crate::api::jira::{Involvement, IssueOrder, IssueQuery};
use crate::app::{AppContext, Result};
use crate::cli::{IssueListArgs, PrListArgs};
use crate::domain::jira::{find_issue_key, project_of};
use crate::domain::tempo::format_seconds;
use crate::domain::{
    CommitStatus, Environment, Issue, Pipeline, PullRequest, Variable, Worklog,
};
use crate::git;
use crate::pagination::{Enrichment, Listing};

/// Write each item as soon as the listing yields it.
///
/// Returns the number of items written. An error ends the output after the
/// items already written.
pub async fn write_listing<T, W, F>(out: &mut W, mut listing: Listing<T>, mut render: F) -> Result<usize>
where
    W: Write,
    F: FnMut(&T) -> String,
{
    while let Some(item) = listing.next_item().await {
        let item = item?;
        writeln!(out, "{}", render(&item))?;
    }

    if listing.emitted() == 0 {
        writeln!(out, "No {} found", listing.name())?;
    }

    Ok(listing.emitted())
}

async fn print_listing<T, F>(listing: Listing<T>, render: F) -> Result<usize>
where
    F: FnMut(&T) -> String,
{
    write_listing(&mut io::stdout(), listing, render).await
}

pub async fn list_pull_requests(ctx: &AppContext, repo: &str, args: PrListArgs) -> Result<()> {
    let query = PullRequestQuery {
        states: args.states,
        author: args.author,
        search: args.search,
        source: args.source,
        destination: args.destination,
        participants: args.participants,
        page_len: args.limit,
        pages: args.pages,
        with_status: args.status,
    };
    let show_participants = query.participants;

    let listing = ctx.bitbucket.pull_requests(repo, &query);
    print_listing(listing, |pr| {
        let mut line = format_pull_request(pr);
        if show_participants {
            line.push_str(&format_reviewers(pr));
        }
        line
    })
    .await?;
    Ok(())
}

pub async fn list_pipelines(
    ctx: &AppContext,
    repo: &str,
    limit: u32,
    branch: Option<String>,
) -> Result<()> {
    let query = PipelineQuery { limit, branch };
    print_listing(ctx.bitbucket.pipelines(repo, &query), format_pipeline).await?;
    Ok(())
}

pub async fn list_environments(ctx: &AppContext, repo: &str, with_status: bool) -> Result<()> {
    print_listing(ctx.bitbucket.environments(repo, with_status), format_environment).await?;
    Ok(())
}

pub async fn list_pipeline_variables(ctx: &AppContext, repo: &str) -> Result<()> {
    print_listing(ctx.bitbucket.pipeline_variables(repo), format_variable).await?;
    Ok(())
}

pub async fn list_environment_variables(ctx: &AppContext, repo: &str, name: &str) -> Result<()> {
    let listing = ctx.bitbucket.environment_variables(repo, name).await?;
    print_listing(listing, format_variable).await?;
    Ok(())
}

pub async fn list_issues(ctx: &AppContext, args: IssueListArgs) -> Result<()> {
    let jira = ctx.jira()?;

    let project = args.project.or_else(branch_project);
    let query = IssueQuery {
        involvement: match (args.all, args.reporter) {
            (true, _) => Involvement::Anyone,
            (false, true) => Involvement::Reporter,
            (false, false) => Involvement::Assignee,
        },
        project,
        search: args.search,
        statuses: ctx.config.jira.expand_statuses(&args.statuses),
        types: args.types,
        order: if args.priority {
            IssueOrder::Priority
        } else {
            IssueOrder::Status
        },
        limit: args.limit,
        pages: args.pages,
    };

    print_listing(jira.issues(&query), format_issue).await?;
    Ok(())
}

/// Project key guessed from the current branch, e.g. `CORE` on
/// `feature/CORE-12-login`.
fn branch_project() -> Option<String> {
    let branch = git::current_branch().ok()?;
    let key = find_issue_key(&branch)?;
    Some(project_of(key).to_string())
}

pub async fn list_worklogs(
    ctx: &AppContext,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    with_issues: bool,
) -> Result<()> {
    let jira = ctx.jira()?;
    let tempo = ctx.tempo()?;

    let from = from.unwrap_or_else(|| Local::now().date_naive());
    let to = to.unwrap_or(from);
    let me = jira.myself().await?;

    let listing = tempo.worklogs(&me.account_id, from, to, with_issues.then_some(jira));

    let mut total = 0;
    let count = print_listing(listing, |worklog| {
        total += worklog.time_spent_seconds;
        format_worklog(worklog)
    })
    .await?;

    if count > 0 {
        println!("Total: {}", format_seconds(total));
    }
    Ok(())
}

fn format_enrichment<S>(enrichment: &Enrichment<S>, present: impl Fn(&S) -> String) -> Option<String> {
    match enrichment {
        Enrichment::NotRequested => None,
        Enrichment::Present(value) => Some(present(value)),
        Enrichment::Empty => Some("none".to_string()),
        Enrichment::Unavailable(_) => Some("unavailable".to_string()),
    }
}

fn format_date(date: Option<chrono::DateTime<chrono::Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_pull_request(pr: &PullRequest) -> String {
    let mut line = format!(
        "#{} [{}] {} ({} -> {}) by {}, {}, {} comments",
        pr.id,
        pr.state,
        pr.title,
        pr.source.branch.name,
        pr.destination.branch.name,
        pr.author.display_name,
        format_date(pr.created_on),
        pr.comment_count,
    );

    if let Some(status) = format_enrichment(&pr.status, |s: &CommitStatus| s.state.clone()) {
        line.push_str(&format!(" build: {status}"));
    }
    line
}

fn format_reviewers(pr: &PullRequest) -> String {
    let reviewers: Vec<String> = pr
        .participants
        .iter()
        .filter(|p| p.role == "REVIEWER")
        .map(|p| {
            let mark = if p.approved { "+" } else { "" };
            format!("{mark}{}", p.user.display_name)
        })
        .collect();

    if reviewers.is_empty() {
        String::new()
    } else {
        format!(" reviewers: {} ({} approved)", reviewers.join(", "), pr.approvals())
    }
}

pub fn format_pipeline(pipeline: &Pipeline) -> String {
    let target = pipeline
        .target
        .pull_request
        .as_ref()
        .map(|pr| format!("PR #{}", pr.id))
        .or_else(|| pipeline.target.ref_name.clone())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "#{} {} {} [{}] {}s by {}",
        pipeline.build_number,
        format_date(pipeline.created_on),
        target,
        pipeline.status(),
        pipeline.duration_in_seconds,
        pipeline
            .creator
            .as_ref()
            .map(|c| c.display_name.as_str())
            .unwrap_or("-"),
    )
}

pub fn format_environment(environment: &Environment) -> String {
    let mut line = format!(
        "{} ({})",
        environment.name, environment.environment_type.name
    );

    if let Some(deploy) = format_enrichment(&environment.status, |p: &Pipeline| {
        format!("#{} {}", p.build_number, p.status())
    }) {
        line.push_str(&format!(" last deploy: {deploy}"));
    }
    line
}

pub fn format_variable(variable: &Variable) -> String {
    format!("{} = {}", variable.key, variable.display_value())
}

pub fn format_issue(issue: &Issue) -> String {
    let priority = issue
        .fields
        .priority
        .as_ref()
        .map(|p| p.name.as_str())
        .unwrap_or("-");

    format!(
        "{} [{}] {} ({}, {}) {} spent: {}",
        issue.key,
        issue.fields.status.name,
        issue.fields.summary,
        issue.fields.issue_type.name,
        priority,
        issue.assignee_name(),
        issue.time_spent(),
    )
}

pub fn format_worklog(worklog: &Worklog) -> String {
    let start = worklog
        .start_date_time_utc
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| {
            let date = worklog
                .start_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            format!("{date} {}", worklog.start_time)
        });

    let issue = match &worklog.jira_issue {
        Enrichment::Present(issue) => format!("{} {}", issue.key, issue.summary),
        Enrichment::NotRequested | Enrichment::Empty => format!("issue {}", worklog.issue.id),
        Enrichment::Unavailable(_) => format!("issue {} (lookup failed)", worklog.issue.id),
    };

    format!("{start} +{} - {issue}", worklog.duration())
}
