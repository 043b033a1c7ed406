use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JiraUser {
    pub account_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Named {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeTracking {
    pub original_estimate: Option<String>,
    pub remaining_estimate: Option<String>,
    pub time_spent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentSummary {
    pub total: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IssueFields {
    pub summary: String,
    pub status: Named,
    pub priority: Option<Named>,
    #[serde(rename = "issuetype")]
    pub issue_type: Named,
    pub assignee: Option<JiraUser>,
    pub reporter: Option<JiraUser>,
    #[serde(rename = "timetracking")]
    pub time_tracking: TimeTracking,
    pub comment: CommentSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub id: String,
    pub key: String,
    pub fields: IssueFields,
}

impl Issue {
    pub fn assignee_name(&self) -> &str {
        self.fields
            .assignee
            .as_ref()
            .map(|u| u.display_name.as_str())
            .unwrap_or("Unassigned")
    }

    pub fn time_spent(&self) -> &str {
        self.fields
            .time_tracking
            .time_spent
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("-")
    }
}

/// The authenticated Jira user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Myself {
    pub account_id: String,
    pub display_name: String,
    pub email_address: String,
}

static ISSUE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][A-Z0-9_]*-[0-9]+").expect("valid regex"));

/// First issue key in `text`, used to guess the project from a branch name.
pub fn find_issue_key(text: &str) -> Option<&str> {
    ISSUE_KEY.find(text).map(|m| m.as_str())
}

/// Project key part of an issue key: `PROJ` for `PROJ-12`.
pub fn project_of(key: &str) -> &str {
    key.split('-').next().unwrap_or(key)
}
