pub mod bitbucket;
pub mod jira;
pub mod tempo;

pub use bitbucket::{CommitStatus, Environment, Pipeline, PrState, PullRequest, User, Variable};
pub use jira::{Issue, Myself};
pub use tempo::{IssueSummary, Worklog};
