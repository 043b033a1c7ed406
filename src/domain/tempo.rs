use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::pagination::Enrichment;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IssueRef {
    pub id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorklogAuthor {
    pub account_id: String,
}

/// Key and title of the Jira issue a worklog was booked against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueSummary {
    pub key: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Worklog {
    pub tempo_worklog_id: u64,
    pub jira_worklog_id: Option<u64>,
    pub issue: IssueRef,
    pub time_spent_seconds: u64,
    pub start_date: Option<NaiveDate>,
    pub start_time: String,
    pub start_date_time_utc: Option<DateTime<Utc>>,
    pub description: String,
    pub author: WorklogAuthor,
    #[serde(skip)]
    pub jira_issue: Enrichment<IssueSummary>,
}

impl Worklog {
    /// `1h 30m` style rendering of the time spent.
    pub fn duration(&self) -> String {
        format_seconds(self.time_spent_seconds)
    }
}

pub fn format_seconds(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    match (hours, minutes) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worklog_deserializes() {
        let worklog: Worklog = serde_json::from_str(
            r#"{
                "tempoWorklogId": 501,
                "jiraWorklogId": 10501,
                "issue": {"self": "https://example.atlassian.net/rest/api/2/issue/10042", "id": 10042},
                "timeSpentSeconds": 5400,
                "startDate": "2024-03-04",
                "startTime": "09:30:00",
                "startDateTimeUtc": "2024-03-04T08:30:00Z",
                "description": "Review",
                "author": {"accountId": "abc123"}
            }"#,
        )
        .unwrap();

        assert_eq!(worklog.tempo_worklog_id, 501);
        assert_eq!(worklog.issue.id, 10042);
        assert_eq!(worklog.start_date, NaiveDate::from_ymd_opt(2024, 3, 4));
        assert_eq!(worklog.author.account_id, "abc123");
        assert_eq!(worklog.duration(), "1h 30m");
        assert_eq!(worklog.jira_issue, Enrichment::NotRequested);
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0), "0m");
        assert_eq!(format_seconds(45 * 60), "45m");
        assert_eq!(format_seconds(7200), "2h");
        assert_eq!(format_seconds(7260), "2h 1m");
    }
}
