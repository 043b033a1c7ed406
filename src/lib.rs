//! # bb
//!
//! A command-line client for Bitbucket Cloud, Jira and Tempo.
//!
//! ## Architecture
//!
//! Every `list` command runs the same streaming pipeline:
//!
//! ```text
//! PageFetcher → CursorWalker → EnrichmentStage (optional) → Listing → printer
//! ```
//!
//! Pages are fetched only as the printer pulls items, and per-item
//! secondary fetches (build status, deploying pipeline, worklog issue) run
//! concurrently while the output keeps the API's order.
//!
//! ## Quick Start
//!
//! ```bash
//! # Open pull requests of the repository behind `origin`, with build status
//! bb pr list --status
//!
//! # Last five pipelines of a branch
//! bb pipeline list -n 5 --branch main
//!
//! # Issues assigned to you, by priority
//! bb issue list -P
//!
//! # Today's worklogs
//! bb tempo list
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires the configuration into
/// one client per provider over a shared HTTP connection pool.
pub mod app;

/// Configuration loaded from `~/.config/bb/config.toml` and the environment.
pub mod config;

/// Command-line interface using clap.
///
/// - `pr list` - Pull requests, optionally with build status
/// - `pipeline list` - Recent pipelines
/// - `pipeline variables` - Repository pipeline variables
/// - `env list` - Deployment environments
/// - `env variables` - Deployment variables of one environment
/// - `issue list` - Jira issues
/// - `tempo list` - Tempo worklogs
pub mod cli;

/// Provider records as the REST APIs return them.
pub mod domain;

/// HTTP capability behind a trait.
///
/// - [`Transport`](transport::Transport): moves bytes, never judges status codes
/// - [`HttpTransport`](transport::HttpTransport): reqwest-based implementation
pub mod transport;

/// Per-provider clients, page formats and enrichers.
pub mod api;

/// Paginated streaming fetch pipeline.
pub mod pagination;

/// Repository and branch detection from git.
pub mod git;
