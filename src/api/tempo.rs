use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::api::{encode, ApiClient, EnrichOptions, JiraClient};
use crate::app::Result;
use crate::domain::{IssueSummary, Worklog};
use crate::pagination::{
    CursorWalker, Enricher, Enrichment, Listing, PageEnvelope, PageFormat, PageRequest,
    RestPageFetcher,
};

#[derive(Default, Deserialize)]
#[serde(default)]
struct Metadata {
    count: Option<u64>,
    offset: Option<u64>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct TempoPage {
    #[serde(default)]
    results: Vec<Worklog>,
    #[serde(default)]
    metadata: Metadata,
}

/// Tempo's `{results, metadata: {count, offset, limit, next}}` envelope.
pub struct TempoPages {
    origin: String,
}

impl TempoPages {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }
}

impl PageFormat for TempoPages {
    type Item = Worklog;

    fn decode(&self, _request: &PageRequest, body: &[u8]) -> serde_json::Result<PageEnvelope<Worklog>> {
        let page: TempoPage = serde_json::from_slice(body)?;

        Ok(PageEnvelope {
            items: page.results,
            next: PageRequest::continuation(&self.origin, page.metadata.next.as_deref()),
            size: page.metadata.count,
            page: page.metadata.offset,
        })
    }
}

/// Tempo Cloud REST v4 client.
#[derive(Clone)]
pub struct TempoClient {
    api: ApiClient,
    enrich: EnrichOptions,
}

impl TempoClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            enrich: EnrichOptions::default(),
        }
    }

    pub fn with_enrichment(mut self, options: EnrichOptions) -> Self {
        self.enrich = options;
        self
    }

    /// Worklogs of one user between two dates, inclusive. With a Jira client
    /// each worklog also gets the key and summary of its issue.
    pub fn worklogs(
        &self,
        account_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        issues: Option<&JiraClient>,
    ) -> Listing<Worklog> {
        let endpoint = format!(
            "worklogs/user/{}?from={}&to={}",
            encode(account_id),
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );
        let fetcher = RestPageFetcher::new(self.api.clone(), TempoPages::new(self.api.base_url()));
        let walker = CursorWalker::new(fetcher);
        let first = PageRequest::first(endpoint);

        match issues {
            Some(jira) => {
                let stage = self.enrich.stage(WorklogIssueEnricher { jira: jira.clone() });
                Listing::new("worklogs", stage.apply(walker.walk_pages(first)))
            }
            None => Listing::new("worklogs", walker.walk(first)),
        }
    }
}

/// Looks up the Jira issue each worklog was booked against.
pub struct WorklogIssueEnricher {
    jira: JiraClient,
}

#[async_trait]
impl Enricher<Worklog> for WorklogIssueEnricher {
    type Request = u64;
    type Data = IssueSummary;

    fn request(&self, worklog: &Worklog) -> Option<u64> {
        (worklog.issue.id != 0).then_some(worklog.issue.id)
    }

    async fn fetch(&self, id: u64) -> Result<Option<IssueSummary>> {
        tracing::debug!(issue = id, "Fetching worklog issue");
        let issue = self.jira.issue(&id.to_string()).await?;
        Ok(Some(IssueSummary {
            key: issue.key,
            summary: issue.fields.summary,
        }))
    }

    fn attach(&self, mut worklog: Worklog, issue: Enrichment<IssueSummary>) -> Worklog {
        worklog.jira_issue = issue;
        worklog
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::config::EnrichmentFailure;
    use crate::transport::scripted::ScriptedTransport;

    const TEMPO: &str = "https://api.tempo.io/4";
    const JIRA: &str = "https://acme.atlassian.net/rest/api/3";
    const FIRST: &str = "https://api.tempo.io/4/worklogs/user/abc?from=2024-03-04&to=2024-03-04";
    const SECOND: &str =
        "https://api.tempo.io/4/worklogs/user/abc?from=2024-03-04&to=2024-03-04&offset=2&limit=2";

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn transport() -> ScriptedTransport {
        ScriptedTransport::new()
            .respond(
                FIRST,
                200,
                r#"{"metadata": {"count": 2, "offset": 0, "limit": 2,
                    "next": "https://api.tempo.io/4/worklogs/user/abc?from=2024-03-04&to=2024-03-04&offset=2&limit=2"},
                    "results": [
                        {"tempoWorklogId": 1, "issue": {"id": 11}, "timeSpentSeconds": 3600},
                        {"tempoWorklogId": 2, "issue": {"id": 12}, "timeSpentSeconds": 1800}
                    ]}"#,
            )
            .respond(
                SECOND,
                200,
                r#"{"metadata": {"count": 1, "offset": 2, "limit": 2},
                    "results": [{"tempoWorklogId": 3, "issue": {"id": 13}, "timeSpentSeconds": 900}]}"#,
            )
    }

    #[test]
    fn test_decode_relative_next() {
        let body = br#"{"metadata": {"count": 0, "next": ""}, "results": []}"#;
        let envelope = TempoPages::new(TEMPO)
            .decode(&PageRequest::first("worklogs"), body)
            .unwrap();
        assert!(envelope.items.is_empty());
        assert!(envelope.next.is_none());
    }

    #[tokio::test]
    async fn test_worklogs_walk_all_pages() {
        let transport = Arc::new(transport());
        let tempo = TempoClient::new(ApiClient::new(transport.clone(), TEMPO));

        let worklogs = tempo
            .worklogs("abc", day(), day(), None)
            .try_collect_all()
            .await
            .unwrap();

        let ids: Vec<u64> = worklogs.iter().map(|w| w.tempo_worklog_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(worklogs.iter().all(|w| w.jira_issue == Enrichment::NotRequested));
        assert_eq!(transport.calls(), vec![FIRST.to_string(), SECOND.to_string()]);
    }

    #[tokio::test]
    async fn test_worklogs_with_issues_keep_order() {
        let tempo_transport = Arc::new(transport());
        let jira_transport = Arc::new(
            ScriptedTransport::new()
                .respond_after(
                    &format!("{JIRA}/issue/11"),
                    Duration::from_millis(40),
                    r#"{"key": "CORE-11", "fields": {"summary": "Slow one"}}"#,
                )
                .respond(
                    &format!("{JIRA}/issue/12"),
                    200,
                    r#"{"key": "CORE-12", "fields": {"summary": "Fast one"}}"#,
                )
                .fail(&format!("{JIRA}/issue/13"), "timed out"),
        );
        let tempo = TempoClient::new(ApiClient::new(tempo_transport, TEMPO)).with_enrichment(
            EnrichOptions {
                workers: 4,
                on_failure: EnrichmentFailure::Mark,
            },
        );
        let jira = JiraClient::new(ApiClient::new(jira_transport, JIRA));

        let worklogs = tempo
            .worklogs("abc", day(), day(), Some(&jira))
            .try_collect_all()
            .await
            .unwrap();

        let keys: Vec<Option<&str>> = worklogs
            .iter()
            .map(|w| w.jira_issue.value().map(|i| i.key.as_str()))
            .collect();
        assert_eq!(keys, vec![Some("CORE-11"), Some("CORE-12"), None]);
        assert!(matches!(worklogs[2].jira_issue, Enrichment::Unavailable(_)));
    }
}
