use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::{encode, quoted, ApiClient, EnrichOptions};
use crate::app::{BbError, Result};
use crate::domain::{CommitStatus, Environment, Pipeline, PrState, PullRequest, Variable};
use crate::pagination::{
    CursorWalker, Enricher, Enrichment, Listing, PageEnvelope, PageFormat, PageRequest,
    RestPageFetcher,
};

#[derive(Deserialize)]
struct BitbucketPage<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
    next: Option<String>,
    size: Option<u64>,
    page: Option<u64>,
}

/// Bitbucket's `{values, next, size, page, pagelen}` envelope.
///
/// `next` is an absolute URL under the API root; it is made relative to
/// `origin` before it reaches the walker.
pub struct BitbucketPages<T> {
    origin: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> BitbucketPages<T> {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            _item: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> PageFormat for BitbucketPages<T> {
    type Item = T;

    fn decode(&self, _request: &PageRequest, body: &[u8]) -> serde_json::Result<PageEnvelope<T>> {
        let page: BitbucketPage<T> = serde_json::from_slice(body)?;

        Ok(PageEnvelope {
            items: page.values,
            next: PageRequest::continuation(&self.origin, page.next.as_deref()),
            size: page.size,
            page: page.page,
        })
    }
}

/// Filters for `bb pr list`.
#[derive(Debug, Clone)]
pub struct PullRequestQuery {
    /// ORed together; empty means any state
    pub states: Vec<PrState>,
    pub author: Option<String>,
    /// Substring of the title
    pub search: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    /// Ask for the participant list, which Bitbucket leaves out by default
    pub participants: bool,
    pub page_len: Option<u32>,
    /// Page cap
    pub pages: usize,
    pub with_status: bool,
}

impl Default for PullRequestQuery {
    fn default() -> Self {
        Self {
            states: vec![PrState::Open],
            author: None,
            search: None,
            source: None,
            destination: None,
            participants: false,
            page_len: None,
            pages: 1,
            with_status: false,
        }
    }
}

impl PullRequestQuery {
    /// The `q` filter expression, if any filter is set.
    pub fn filter(&self) -> Option<String> {
        let mut clauses = Vec::new();

        match self.states.as_slice() {
            [] => {}
            [state] => clauses.push(format!("state={}", quoted(state.as_str()))),
            states => {
                let any = states
                    .iter()
                    .map(|s| format!("state={}", quoted(s.as_str())))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                clauses.push(format!("({any})"));
            }
        }
        if let Some(author) = &self.author {
            clauses.push(format!("author.nickname={}", quoted(author)));
        }
        if let Some(search) = &self.search {
            clauses.push(format!("title ~ {}", quoted(search)));
        }
        if let Some(source) = &self.source {
            clauses.push(format!("source.branch.name={}", quoted(source)));
        }
        if let Some(destination) = &self.destination {
            clauses.push(format!("destination.branch.name={}", quoted(destination)));
        }

        (!clauses.is_empty()).then(|| clauses.join(" AND "))
    }

    pub fn endpoint(&self, repo: &str) -> String {
        let mut endpoint = format!("repositories/{repo}/pullrequests?sort=-id");
        if let Some(len) = self.page_len {
            endpoint.push_str(&format!("&pagelen={len}"));
        }
        if self.participants {
            endpoint.push_str(&format!("&fields={}", encode("+values.participants")));
        }
        if let Some(filter) = self.filter() {
            endpoint.push_str(&format!("&q={}", encode(&filter)));
        }
        endpoint
    }
}

#[derive(Debug, Clone)]
pub struct PipelineQuery {
    pub limit: u32,
    pub branch: Option<String>,
}

impl Default for PipelineQuery {
    fn default() -> Self {
        Self {
            limit: 10,
            branch: None,
        }
    }
}

impl PipelineQuery {
    pub fn endpoint(&self, repo: &str) -> String {
        let mut endpoint = format!(
            "repositories/{repo}/pipelines/?sort=-created_on&pagelen={}",
            self.limit
        );
        if let Some(branch) = &self.branch {
            endpoint.push_str(&format!("&target.branch={}", encode(branch)));
        }
        endpoint
    }
}

/// Bitbucket Cloud client.
#[derive(Clone)]
pub struct BitbucketClient {
    api: ApiClient,
    enrich: EnrichOptions,
}

impl BitbucketClient {
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

    fn walker<T>(&self) -> CursorWalker<RestPageFetcher<BitbucketPages<T>>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let format = BitbucketPages::new(self.api.base_url());
        CursorWalker::new(RestPageFetcher::new(self.api.clone(), format))
    }

    pub fn pull_requests(&self, repo: &str, query: &PullRequestQuery) -> Listing<PullRequest> {
        let walker = self
            .walker::<PullRequest>()
            .with_page_cap(Some(query.pages));
        let first = PageRequest::first(query.endpoint(repo));

        if query.with_status {
            let stage = self.enrich.stage(PrStatusEnricher {
                client: self.clone(),
                repo: repo.to_string(),
            });
            Listing::new("pull requests", stage.apply(walker.walk_pages(first)))
        } else {
            Listing::new("pull requests", walker.walk(first))
        }
    }

    /// Commit statuses of a pull request's head, first page only.
    pub async fn pull_request_statuses(&self, repo: &str, id: u64) -> Result<Vec<CommitStatus>> {
        let endpoint = format!("repositories/{repo}/pullrequests/{id}/statuses");
        let page: BitbucketPage<CommitStatus> = self.api.get_json(&endpoint).await?;
        Ok(page.values)
    }

    /// Most recent pipelines, one page.
    pub fn pipelines(&self, repo: &str, query: &PipelineQuery) -> Listing<Pipeline> {
        let items = self
            .walker::<Pipeline>()
            .with_page_cap(Some(1))
            .walk(PageRequest::first(query.endpoint(repo)));
        Listing::new("pipelines", items)
    }

    pub async fn pipeline(&self, repo: &str, uuid: &str) -> Result<Pipeline> {
        let endpoint = format!("repositories/{repo}/pipelines/{}", encode(uuid));
        self.api.get_json(&endpoint).await
    }

    /// All deployment environments, optionally with the pipeline that last
    /// deployed to each.
    pub fn environments(&self, repo: &str, with_status: bool) -> Listing<Environment> {
        let walker = self.walker::<Environment>();
        let first = PageRequest::first(format!("repositories/{repo}/environments/"));

        if with_status {
            let stage = self.enrich.stage(EnvironmentStatusEnricher {
                client: self.clone(),
                repo: repo.to_string(),
            });
            Listing::new("environments", stage.apply(walker.walk_pages(first)))
        } else {
            Listing::new("environments", walker.walk(first))
        }
    }

    /// Walks the environments until one is called `name`.
    pub async fn environment(&self, repo: &str, name: &str) -> Result<Environment> {
        let mut environments = self.environments(repo, false);
        while let Some(environment) = environments.next_item().await {
            let environment = environment?;
            if environment.name == name {
                return Ok(environment);
            }
        }
        Err(BbError::NotFound(format!("environment {name:?} in {repo}")))
    }

    /// Repository-level pipeline variables.
    pub fn pipeline_variables(&self, repo: &str) -> Listing<Variable> {
        let items = self
            .walker::<Variable>()
            .walk(PageRequest::first(format!("repositories/{repo}/pipelines_config/variables")));
        Listing::new("variables", items)
    }

    /// Deployment variables of the environment called `name`.
    pub async fn environment_variables(&self, repo: &str, name: &str) -> Result<Listing<Variable>> {
        let environment = self.environment(repo, name).await?;
        let endpoint = format!(
            "repositories/{repo}/deployments_config/environments/{}/variables",
            encode(&environment.uuid)
        );
        let items = self.walker::<Variable>().walk(PageRequest::first(endpoint));
        Ok(Listing::new("variables", items))
    }
}

/// Attaches the latest commit status to each pull request.
pub struct PrStatusEnricher {
    client: BitbucketClient,
    repo: String,
}

#[async_trait]
impl Enricher<PullRequest> for PrStatusEnricher {
    type Request = u64;
    type Data = CommitStatus;

    fn request(&self, pr: &PullRequest) -> Option<u64> {
        Some(pr.id)
    }

    async fn fetch(&self, id: u64) -> Result<Option<CommitStatus>> {
        tracing::debug!(pr = id, "Fetching commit statuses");
        let statuses = self.client.pull_request_statuses(&self.repo, id).await?;
        Ok(CommitStatus::latest(statuses))
    }

    fn attach(&self, mut pr: PullRequest, status: Enrichment<CommitStatus>) -> PullRequest {
        pr.status = status;
        pr
    }
}

/// Attaches the deploying pipeline to each locked environment.
pub struct EnvironmentStatusEnricher {
    client: BitbucketClient,
    repo: String,
}

#[async_trait]
impl Enricher<Environment> for EnvironmentStatusEnricher {
    type Request = String;
    type Data = Pipeline;

    fn request(&self, environment: &Environment) -> Option<String> {
        environment.deploying_pipeline().map(String::from)
    }

    async fn fetch(&self, uuid: String) -> Result<Option<Pipeline>> {
        tracing::debug!(pipeline = %uuid, "Fetching deploying pipeline");
        self.client.pipeline(&self.repo, &uuid).await.map(Some)
    }

    fn attach(&self, mut environment: Environment, pipeline: Enrichment<Pipeline>) -> Environment {
        environment.status = pipeline;
        environment
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{EnrichmentFailure, DEFAULT_ENRICH_WORKERS};
    use crate::pagination::ListingState;
    use crate::transport::scripted::ScriptedTransport;

    const API: &str = "https://api.bitbucket.org/2.0";
    const OPEN_PRS: &str =
        "https://api.bitbucket.org/2.0/repositories/ws/app/pullrequests?sort=-id&q=state%3D%22OPEN%22";

    fn client(transport: &Arc<ScriptedTransport>) -> BitbucketClient {
        BitbucketClient::new(ApiClient::new(transport.clone(), API)).with_enrichment(EnrichOptions {
            workers: 2,
            on_failure: EnrichmentFailure::Mark,
        })
    }

    fn statuses_url(id: u64) -> String {
        format!("{API}/repositories/ws/app/pullrequests/{id}/statuses")
    }

    #[test]
    fn test_pull_request_filter() {
        let query = PullRequestQuery {
            states: vec![PrState::Open, PrState::Merged],
            author: Some("dev".into()),
            search: Some("fix bug".into()),
            destination: Some("main".into()),
            ..PullRequestQuery::default()
        };

        assert_eq!(
            query.filter().unwrap(),
            "(state=\"OPEN\" OR state=\"MERGED\") AND author.nickname=\"dev\" \
             AND title ~ \"fix bug\" AND destination.branch.name=\"main\""
        );
    }

    #[test]
    fn test_pull_request_endpoint() {
        let query = PullRequestQuery {
            states: Vec::new(),
            participants: true,
            page_len: Some(25),
            ..PullRequestQuery::default()
        };
        assert_eq!(
            query.endpoint("ws/app"),
            "repositories/ws/app/pullrequests?sort=-id&pagelen=25&fields=%2Bvalues.participants"
        );

        let open = PullRequestQuery::default();
        assert_eq!(
            format!("{API}/{}", open.endpoint("ws/app")),
            OPEN_PRS
        );
    }

    #[test]
    fn test_pipeline_endpoint() {
        let query = PipelineQuery {
            limit: 5,
            branch: Some("release/1.0".into()),
        };
        assert_eq!(
            query.endpoint("ws/app"),
            "repositories/ws/app/pipelines/?sort=-created_on&pagelen=5&target.branch=release%2F1.0"
        );
    }

    #[tokio::test]
    async fn test_pull_requests_follow_cap() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            OPEN_PRS,
            200,
            r#"{"values": [{"id": 9}, {"id": 8}],
                "next": "https://api.bitbucket.org/2.0/repositories/ws/app/pullrequests?page=2"}"#,
        ));
        let listing = client(&transport).pull_requests("ws/app", &PullRequestQuery::default());

        let prs = listing.try_collect_all().await.unwrap();
        let ids: Vec<u64> = prs.iter().map(|pr| pr.id).collect();
        assert_eq!(ids, vec![9, 8]);
        assert!(prs.iter().all(|pr| pr.status == Enrichment::NotRequested));
        // Default cap is one page.
        assert_eq!(transport.calls(), vec![OPEN_PRS.to_string()]);
    }

    #[tokio::test]
    async fn test_pull_requests_with_status() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    OPEN_PRS,
                    200,
                    r#"{"values": [{"id": 3}, {"id": 2}, {"id": 1}]}"#,
                )
                .respond(
                    &statuses_url(3),
                    200,
                    r#"{"values": [
                        {"key": "ci", "state": "FAILED", "updated_on": "2024-01-01T00:00:00+00:00"},
                        {"key": "ci", "state": "SUCCESSFUL", "updated_on": "2024-01-02T00:00:00+00:00"}
                    ]}"#,
                )
                .respond(&statuses_url(2), 200, r#"{"values": []}"#)
                .respond(&statuses_url(1), 500, "boom"),
        );
        let query = PullRequestQuery {
            with_status: true,
            ..PullRequestQuery::default()
        };

        let mut listing = client(&transport).pull_requests("ws/app", &query);
        let mut prs = Vec::new();
        while let Some(pr) = listing.next_item().await {
            prs.push(pr.unwrap());
        }

        assert_eq!(listing.state(), ListingState::Exhausted);
        let ids: Vec<u64> = prs.iter().map(|pr| pr.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(prs[0].status.value().unwrap().state, "SUCCESSFUL");
        assert_eq!(prs[1].status, Enrichment::Empty);
        assert!(matches!(&prs[2].status, Enrichment::Unavailable(reason) if reason.contains("500")));
    }

    #[tokio::test]
    async fn test_pipeline_by_uuid() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            "https://api.bitbucket.org/2.0/repositories/ws/app/pipelines/%7Babc%7D",
            200,
            r#"{"uuid": "{abc}", "build_number": 41, "state": {"name": "COMPLETED",
                "result": {"name": "FAILED"}}}"#,
        ));

        let pipeline = client(&transport).pipeline("ws/app", "{abc}").await.unwrap();
        assert_eq!(pipeline.build_number, 41);
        assert_eq!(pipeline.status(), "FAILED");
    }

    #[tokio::test]
    async fn test_environments_with_status() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    "https://api.bitbucket.org/2.0/repositories/ws/app/environments/",
                    200,
                    r#"{"values": [
                        {"uuid": "{e1}", "name": "Staging",
                         "lock": {"triggerer": {"pipeline_uuid": "{p1}"}}},
                        {"uuid": "{e2}", "name": "Test", "lock": null}
                    ],
                    "next": "https://api.bitbucket.org/2.0/repositories/ws/app/environments/?page=2"}"#,
                )
                .respond(
                    "https://api.bitbucket.org/2.0/repositories/ws/app/environments/?page=2",
                    200,
                    r#"{"values": [{"uuid": "{e3}", "name": "Production",
                         "lock": {"triggerer": {"pipeline_uuid": "{p3}"}}}]}"#,
                )
                .respond(
                    "https://api.bitbucket.org/2.0/repositories/ws/app/pipelines/%7Bp1%7D",
                    200,
                    r#"{"uuid": "{p1}", "build_number": 7, "state": {"name": "IN_PROGRESS"}}"#,
                )
                .fail(
                    "https://api.bitbucket.org/2.0/repositories/ws/app/pipelines/%7Bp3%7D",
                    "connection reset",
                ),
        );

        let environments = client(&transport)
            .environments("ws/app", true)
            .try_collect_all()
            .await
            .unwrap();

        let names: Vec<&str> = environments.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Staging", "Test", "Production"]);
        assert_eq!(environments[0].status.value().unwrap().build_number, 7);
        assert_eq!(environments[1].status, Enrichment::NotRequested);
        assert!(matches!(environments[2].status, Enrichment::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_propagate_policy_ends_listing() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(OPEN_PRS, 200, r#"{"values": [{"id": 2}, {"id": 1}]}"#)
                .respond(&statuses_url(2), 200, r#"{"values": []}"#)
                .respond(&statuses_url(1), 403, "forbidden"),
        );
        let client = BitbucketClient::new(ApiClient::new(transport.clone(), API)).with_enrichment(
            EnrichOptions {
                workers: 1,
                on_failure: EnrichmentFailure::Propagate,
            },
        );
        let query = PullRequestQuery {
            with_status: true,
            ..PullRequestQuery::default()
        };

        let mut listing = client.pull_requests("ws/app", &query);
        assert_eq!(listing.next_item().await.unwrap().unwrap().id, 2);
        let err = listing.next_item().await.unwrap().unwrap_err();
        assert!(matches!(err, BbError::RemoteStatus { status: 403, .. }));
        assert!(listing.next_item().await.is_none());
        assert_eq!(listing.state(), ListingState::Failed);
    }

    #[tokio::test]
    async fn test_status_lookup_stays_on_current_page() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    OPEN_PRS,
                    200,
                    r#"{"values": [{"id": 4}, {"id": 3}, {"id": 2}],
                        "next": "https://api.bitbucket.org/2.0/repositories/ws/app/pullrequests?page=2"}"#,
                )
                .respond(&statuses_url(4), 200, r#"{"values": []}"#)
                .respond(&statuses_url(3), 200, r#"{"values": []}"#)
                .respond(&statuses_url(2), 200, r#"{"values": []}"#),
        );
        let client = BitbucketClient::new(ApiClient::new(transport.clone(), API)).with_enrichment(
            EnrichOptions {
                workers: DEFAULT_ENRICH_WORKERS,
                on_failure: EnrichmentFailure::Mark,
            },
        );
        let query = PullRequestQuery {
            with_status: true,
            pages: 5,
            ..PullRequestQuery::default()
        };

        let mut listing = client.pull_requests("ws/app", &query);
        assert_eq!(listing.next_item().await.unwrap().unwrap().id, 4);
        assert_eq!(listing.next_item().await.unwrap().unwrap().id, 3);
        drop(listing);

        assert!(!transport.calls().iter().any(|url| url.contains("page=2")));
    }

    #[tokio::test]
    async fn test_pipeline_variables_walk_all_pages() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    "https://api.bitbucket.org/2.0/repositories/ws/app/pipelines_config/variables",
                    200,
                    r#"{"values": [{"key": "REGION", "value": "eu-west-1", "secured": false}],
                        "next": "https://api.bitbucket.org/2.0/repositories/ws/app/pipelines_config/variables?page=2"}"#,
                )
                .respond(
                    "https://api.bitbucket.org/2.0/repositories/ws/app/pipelines_config/variables?page=2",
                    200,
                    r#"{"values": [{"key": "TOKEN", "secured": true}]}"#,
                ),
        );

        let variables = client(&transport)
            .pipeline_variables("ws/app")
            .try_collect_all()
            .await
            .unwrap();

        let shown: Vec<String> = variables
            .iter()
            .map(|v| format!("{}={}", v.key, v.display_value()))
            .collect();
        assert_eq!(shown, vec!["REGION=eu-west-1", "TOKEN=***"]);
    }

    #[tokio::test]
    async fn test_environment_variables_by_name() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(
                    "https://api.bitbucket.org/2.0/repositories/ws/app/environments/",
                    200,
                    r#"{"values": [{"uuid": "{e1}", "name": "Test"}, {"uuid": "{e2}", "name": "Staging"}],
                        "next": "https://api.bitbucket.org/2.0/repositories/ws/app/environments/?page=2"}"#,
                )
                .respond(
                    "https://api.bitbucket.org/2.0/repositories/ws/app/deployments_config/environments/%7Be2%7D/variables",
                    200,
                    r#"{"values": [{"key": "URL", "value": "https://staging.example.com"}]}"#,
                ),
        );

        let variables = client(&transport)
            .environment_variables("ws/app", "Staging")
            .await
            .unwrap()
            .try_collect_all()
            .await
            .unwrap();

        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].key, "URL");
        // The match is on the first page, so the second is never fetched.
        assert!(!transport.calls().iter().any(|url| url.ends_with("?page=2")));
    }

    #[tokio::test]
    async fn test_unknown_environment_is_not_found() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            "https://api.bitbucket.org/2.0/repositories/ws/app/environments/",
            200,
            r#"{"values": [{"uuid": "{e1}", "name": "Test"}]}"#,
        ));

        let err = client(&transport)
            .environment_variables("ws/app", "Production")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, BbError::NotFound(_)));
    }
}
