//! Repository and branch detection from the current git checkout.

use std::process::Command;

use crate::app::{BbError, Result};

fn git(args: &[&str]) -> Result<String> {
    let output = Command::new("git").args(args).output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BbError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `workspace/slug` of the Bitbucket repository behind `origin`.
pub fn origin_repo() -> Result<String> {
    let url = git(&["remote", "get-url", "origin"])?;
    parse_remote(&url).ok_or_else(|| {
        BbError::Git(format!(
            "origin remote {url} is not a Bitbucket repository; pass --repo or set `repo` in the config"
        ))
    })
}

pub fn current_branch() -> Result<String> {
    git(&["branch", "--show-current"])
}

/// Extract `workspace/slug` from an SSH or HTTPS Bitbucket remote URL.
pub fn parse_remote(url: &str) -> Option<String> {
    let url = url.trim();

    let path = if let Some(rest) = url.strip_prefix("git@bitbucket.org:") {
        rest
    } else if let Some(rest) = url.strip_prefix("ssh://git@bitbucket.org/") {
        rest
    } else {
        let parsed = url::Url::parse(url).ok()?;
        if parsed.host_str() != Some("bitbucket.org") {
            return None;
        }
        return slug(parsed.path().trim_start_matches('/'));
    };

    slug(path)
}

fn slug(path: &str) -> Option<String> {
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    match path.split('/').collect::<Vec<_>>().as_slice() {
        [workspace, repo] if !workspace.is_empty() && !repo.is_empty() => {
            Some(format!("{workspace}/{repo}"))
        }
        _ => None,
    }
}
