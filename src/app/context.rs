use std::sync::Arc;

use reqwest::Client;

use crate::api::{ApiClient, BitbucketClient, EnrichOptions, JiraClient, TempoClient};
use crate::app::error::{BbError, Result};
use crate::config::Config;
use crate::git;
use crate::transport::{Credentials, HttpTransport, Transport};

/// Everything a command needs, resolved once at start-up.
///
/// All provider clients share one reqwest connection pool.
pub struct AppContext {
    pub config: Config,
    pub bitbucket: BitbucketClient,
    jira: Option<JiraClient>,
    tempo: Option<TempoClient>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let client = HttpTransport::build_client()?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Config, client: Client) -> Self {
        let enrich = EnrichOptions::from(&config.fetch);
        let timeout = config.fetch.timeout();

        let api = |base: String, credentials: Credentials| {
            let transport: Arc<dyn Transport + Send + Sync> =
                Arc::new(HttpTransport::new(client.clone(), credentials));
            ApiClient::new(transport, base).with_timeout(timeout)
        };

        let bitbucket = BitbucketClient::new(api(
            config.bitbucket.api.clone(),
            basic(&config.bitbucket.username, &config.bitbucket.token),
        ))
        .with_enrichment(enrich);

        let jira = (!config.jira.domain.is_empty()).then(|| {
            JiraClient::new(api(
                config.jira.api(),
                basic(&config.jira.email, &config.jira.token),
            ))
        });

        let tempo = (!config.tempo.token.is_empty()).then(|| {
            TempoClient::new(api(
                config.tempo.api.clone(),
                Credentials::Bearer(config.tempo.token.clone()),
            ))
            .with_enrichment(enrich)
        });

        Self {
            config,
            bitbucket,
            jira,
            tempo,
        }
    }

    pub fn jira(&self) -> Result<&JiraClient> {
        self.jira
            .as_ref()
            .ok_or_else(|| BbError::MissingSetting("jira.domain (or JIRA_DOMAIN)".into()))
    }

    pub fn tempo(&self) -> Result<&TempoClient> {
        self.tempo
            .as_ref()
            .ok_or_else(|| BbError::MissingSetting("tempo.token (or TEMPO_TOKEN)".into()))
    }

    /// The repository to work on: the explicit one, then the configured
    /// default, then the `origin` remote of the current checkout.
    pub fn repo(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(repo) = explicit.or(self.config.repo.as_deref()) {
            return Ok(repo.to_string());
        }
        git::origin_repo()
    }
}

fn basic(username: &str, secret: &str) -> Credentials {
    if username.is_empty() || secret.is_empty() {
        Credentials::Anonymous
    } else {
        Credentials::Basic {
            username: username.to_string(),
            secret: secret.to_string(),
        }
    }
}
