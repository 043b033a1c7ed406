//! Configuration management for bb.
//!
//! Configuration is read from `~/.config/bb/config.toml` at startup (or the
//! path given with `--config`). If the default file doesn't exist, a default
//! configuration with comments is created. Credentials may also come from
//! the environment, which wins over the file.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_BITBUCKET_API: &str = "https://api.bitbucket.org/2.0";
pub const DEFAULT_TEMPO_API: &str = "https://api.tempo.io/4";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ENRICH_WORKERS: usize = 8;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default repository as `workspace/slug`
    pub repo: Option<String>,
    pub bitbucket: BitbucketConfig,
    pub jira: JiraConfig,
    pub tempo: TempoConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BitbucketConfig {
    pub api: String,
    pub username: String,
    pub token: String,
}

impl Default for BitbucketConfig {
    fn default() -> Self {
        Self {
            api: DEFAULT_BITBUCKET_API.to_string(),
            username: String::new(),
            token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    /// Atlassian site name, as in `<domain>.atlassian.net`
    pub domain: String,
    pub email: String,
    pub token: String,
    /// Short names expanding to one or more Jira statuses
    pub status_aliases: HashMap<String, Vec<String>>,
}

impl JiraConfig {
    pub fn api(&self) -> String {
        format!("https://{}.atlassian.net/rest/api/3", self.domain)
    }

    /// Expand status aliases, keeping unknown names as they are.
    pub fn expand_statuses(&self, statuses: &[String]) -> Vec<String> {
        statuses
            .iter()
            .flat_map(|status| match self.status_aliases.get(status) {
                Some(expanded) => expanded.clone(),
                None => vec![status.clone()],
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    pub api: String,
    pub token: String,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            api: DEFAULT_TEMPO_API.to_string(),
            token: String::new(),
        }
    }
}

/// What happens to a listing when a per-item enrichment fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentFailure {
    /// Forward the item with an "unavailable" marker and keep streaming
    #[default]
    Mark,
    /// End the listing with the enrichment error
    Propagate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,

    /// Maximum concurrent enrichment fetches per listing (default: 8)
    pub enrich_workers: usize,

    pub enrichment_failure: EnrichmentFailure,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            enrich_workers: DEFAULT_ENRICH_WORKERS,
            enrichment_failure: EnrichmentFailure::default(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// If the default config file doesn't exist, creates one with comments.
    /// An explicitly given path must exist. Missing fields use default values.
    /// Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let config_path = Self::default_config_path()?;
                if config_path.exists() {
                    Self::from_file(&config_path)?
                } else {
                    Self::create_default_config(&config_path)?;
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/bb/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("bb").join("config.toml"))
    }

    /// Apply `BB_*`, `JIRA_*` and `TEMPO_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        };

        set(&mut self.bitbucket.username, "BB_USERNAME");
        set(&mut self.bitbucket.token, "BB_TOKEN");
        set(&mut self.jira.domain, "JIRA_DOMAIN");
        set(&mut self.jira.email, "JIRA_EMAIL");
        set(&mut self.jira.token, "JIRA_TOKEN");
        set(&mut self.tempo.token, "TEMPO_TOKEN");

        if let Some(repo) = lookup("BB_REPO").filter(|v| !v.is_empty()) {
            self.repo = Some(repo);
        }
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# bb configuration
#
# Every credential can also be supplied through the environment:
# BB_USERNAME, BB_TOKEN, JIRA_DOMAIN, JIRA_EMAIL, JIRA_TOKEN, TEMPO_TOKEN.
# BB_REPO overrides the default repository.

# Default repository ("workspace/slug"). When unset, the origin remote
# of the current git checkout is used.
# repo = "my-workspace/my-repo"

[bitbucket]
api = "https://api.bitbucket.org/2.0"
username = ""
# App password or API token
token = ""

[jira]
# Site name, as in <domain>.atlassian.net
domain = ""
email = ""
token = ""

# Short status names for `bb issue list --status`
[jira.status_aliases]
# todo = ["To Do", "Open"]
# inprogress = ["In Progress"]

[tempo]
api = "https://api.tempo.io/4"
token = ""

[fetch]
# Timeout for each HTTP request, in seconds
timeout_secs = 30

# Maximum secondary fetches (e.g. build status) in flight per listing
enrich_workers = 8

# What to do when a secondary fetch fails:
# "mark" shows the item as unavailable, "propagate" stops the listing
enrichment_failure = "mark"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
