use serde::Deserialize;

use crate::api::{encode, quoted, ApiClient};
use crate::app::Result;
use crate::domain::{Issue, Myself};
use crate::pagination::{CursorWalker, Listing, PageEnvelope, PageFormat, PageRequest, RestPageFetcher};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default)]
    start_at: u64,
    #[serde(default)]
    total: u64,
}

/// Jira's offset-based search envelope, `{issues, startAt, maxResults, total}`.
///
/// Jira has no next link, so one is derived: the same query with `startAt`
/// moved past the page just read, for as long as the page was non-empty and
/// `total` says there is more.
#[derive(Debug, Clone, Copy, Default)]
pub struct JiraSearchPages;

impl PageFormat for JiraSearchPages {
    type Item = Issue;

    fn decode(&self, request: &PageRequest, body: &[u8]) -> serde_json::Result<PageEnvelope<Issue>> {
        let page: SearchPage = serde_json::from_slice(body)?;
        let read = page.start_at + page.issues.len() as u64;

        let next = (!page.issues.is_empty() && read < page.total)
            .then(|| PageRequest::Next(with_start_at(request.endpoint(), read)));

        Ok(PageEnvelope {
            items: page.issues,
            next,
            size: Some(page.total),
            page: None,
        })
    }
}

/// Set the `startAt` parameter of an endpoint, replacing any existing one.
fn with_start_at(endpoint: &str, start_at: u64) -> String {
    let (path, query) = endpoint.split_once('?').unwrap_or((endpoint, ""));

    let mut params: Vec<String> = query
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("startAt="))
        .map(String::from)
        .collect();
    params.push(format!("startAt={start_at}"));

    format!("{path}?{}", params.join("&"))
}

/// Whose issues to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Involvement {
    #[default]
    Assignee,
    Reporter,
    Anyone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssueOrder {
    #[default]
    Status,
    Priority,
}

#[derive(Debug, Clone)]
pub struct IssueQuery {
    pub involvement: Involvement,
    pub project: Option<String>,
    pub search: Option<String>,
    /// Jira status names, already alias-expanded
    pub statuses: Vec<String>,
    pub types: Vec<String>,
    pub order: IssueOrder,
    pub limit: u32,
    pub pages: usize,
}

impl Default for IssueQuery {
    fn default() -> Self {
        Self {
            involvement: Involvement::default(),
            project: None,
            search: None,
            statuses: Vec::new(),
            types: Vec::new(),
            order: IssueOrder::default(),
            limit: 10,
            pages: 1,
        }
    }
}

impl IssueQuery {
    pub fn jql(&self) -> String {
        let mut clauses = Vec::new();

        match self.involvement {
            Involvement::Assignee => clauses.push("assignee=currentuser()".to_string()),
            Involvement::Reporter => clauses.push("reporter=currentuser()".to_string()),
            Involvement::Anyone => {}
        }
        if let Some(project) = &self.project {
            clauses.push(format!("project={}", quoted(project)));
        }
        if let Some(search) = &self.search {
            clauses.push(format!("summary~{}", quoted(search)));
        }
        if let Some(any) = any_of("status", &self.statuses) {
            clauses.push(any);
        }
        if let Some(any) = any_of("type", &self.types) {
            clauses.push(any);
        }

        let order = match self.order {
            IssueOrder::Status => "order by status asc,priority desc",
            IssueOrder::Priority => "order by priority desc,status asc",
        };

        if clauses.is_empty() {
            order.to_string()
        } else {
            format!("{} {order}", clauses.join(" AND "))
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "search?maxResults={}&fields=*all&jql={}",
            self.limit,
            encode(&self.jql())
        )
    }
}

fn any_of(field: &str, values: &[String]) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    let any = values
        .iter()
        .map(|v| format!("{field}={}", quoted(v)))
        .collect::<Vec<_>>()
        .join(" OR ");
    Some(format!("({any})"))
}

/// Jira Cloud REST v3 client.
#[derive(Clone)]
pub struct JiraClient {
    api: ApiClient,
}

impl JiraClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn issues(&self, query: &IssueQuery) -> Listing<Issue> {
        let fetcher = RestPageFetcher::new(self.api.clone(), JiraSearchPages);
        let items = CursorWalker::new(fetcher)
            .with_page_cap(Some(query.pages))
            .walk(PageRequest::first(query.endpoint()));
        Listing::new("issues", items)
    }

    pub async fn issue(&self, key_or_id: &str) -> Result<Issue> {
        self.api.get_json(&format!("issue/{}", encode(key_or_id))).await
    }

    pub async fn myself(&self) -> Result<Myself> {
        self.api.get_json("myself").await
    }
}
