use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::pagination::Enrichment;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct User {
    pub uuid: String,
    pub display_name: String,
    pub nickname: String,
    pub account_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrState {
    #[default]
    Open,
    Merged,
    Declined,
    Superseded,
}

impl PrState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Merged => "MERGED",
            Self::Declined => "DECLINED",
            Self::Superseded => "SUPERSEDED",
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PrState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "merged" => Ok(Self::Merged),
            "declined" => Ok(Self::Declined),
            "superseded" => Ok(Self::Superseded),
            _ => Err(format!(
                "must be one of \"open\", \"merged\", \"declined\" or \"superseded\", got \"{s}\""
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BranchRef {
    pub branch: BranchName,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BranchName {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Participant {
    pub user: User,
    pub role: String,
    pub approved: bool,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PullRequest {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub state: PrState,
    pub comment_count: u32,
    pub task_count: u32,
    pub author: User,
    pub source: BranchRef,
    pub destination: BranchRef,
    pub participants: Vec<Participant>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    /// Latest commit status; only filled in when requested
    #[serde(skip)]
    pub status: Enrichment<CommitStatus>,
}

impl PullRequest {
    pub fn approvals(&self) -> usize {
        self.participants.iter().filter(|p| p.approved).count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommitStatus {
    pub key: String,
    pub name: String,
    /// SUCCESSFUL, FAILED, INPROGRESS or STOPPED
    pub state: String,
    pub url: String,
    #[serde(rename = "refname")]
    pub ref_name: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
}

impl CommitStatus {
    /// The most recently updated status of a set.
    pub fn latest(statuses: Vec<CommitStatus>) -> Option<CommitStatus> {
        statuses
            .into_iter()
            .max_by_key(|s| s.updated_on.or(s.created_on))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineResult {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineState {
    pub name: String,
    pub result: Option<PipelineResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelinePullRequest {
    pub id: u64,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineTarget {
    pub ref_name: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    #[serde(rename = "pullrequest")]
    pub pull_request: Option<PipelinePullRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineTrigger {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    pub uuid: String,
    pub build_number: u64,
    pub state: PipelineState,
    pub target: PipelineTarget,
    pub trigger: PipelineTrigger,
    pub creator: Option<PipelineCreator>,
    pub duration_in_seconds: u64,
    pub created_on: Option<DateTime<Utc>>,
    pub completed_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineCreator {
    pub display_name: String,
}

impl Pipeline {
    /// The final result when there is one, otherwise the running state.
    pub fn status(&self) -> &str {
        match &self.state.result {
            Some(result) if !result.name.is_empty() => &result.name,
            _ => &self.state.name,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvironmentType {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LockTriggerer {
    pub pipeline_uuid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvironmentLock {
    pub triggerer: Option<LockTriggerer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub uuid: String,
    pub name: String,
    pub environment_type: EnvironmentType,
    pub lock: Option<EnvironmentLock>,
    /// The pipeline that last deployed here; only filled in when requested
    #[serde(skip)]
    pub status: Enrichment<Pipeline>,
}

impl Environment {
    /// UUID of the pipeline that holds (or last held) the deployment lock.
    pub fn deploying_pipeline(&self) -> Option<&str> {
        self.lock
            .as_ref()?
            .triggerer
            .as_ref()?
            .pipeline_uuid
            .as_deref()
            .filter(|uuid| !uuid.is_empty())
    }
}

/// A pipeline or deployment variable. Bitbucket omits `value` for secured
/// variables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Variable {
    pub uuid: String,
    pub key: String,
    pub value: Option<String>,
    pub secured: bool,
}

impl Variable {
    /// The value as it may be shown on screen.
    pub fn display_value(&self) -> &str {
        if self.secured {
            "***"
        } else {
            self.value.as_deref().unwrap_or("")
        }
    }
}
