//! Pull-request capability via the GitHub CLI.
//!
//! A branch without a pull request is `Ok(None)` — a normal outcome, not an
//! error. Anything else that goes wrong (gh missing, auth, network) is an
//! `Err` the caller may degrade to "unknown".

use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

/// PR metadata as reported by `gh pr view --json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrInfo {
    pub state: String,
    pub number: u64,
    pub url: String,
    pub title: String,
}

/// GitHub CLI operations scoped to one repository checkout.
#[derive(Debug, Clone)]
pub struct PrClient {
    repo_path: PathBuf,
}

impl PrClient {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Look up the pull request for `branch`.
    pub fn view(&self, branch: &str) -> Result<Option<PrInfo>, String> {
        let output = Command::new("gh")
            .args(["pr", "view", branch, "--json", "state,number,url,title"])
            .current_dir(&self.repo_path)
            .output()
            .map_err(|e| format!("gh pr view {branch}: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no pull requests found") {
                return Ok(None);
            }
            return Err(format!("gh pr view {branch}: {}", stderr.trim()));
        }

        let info: PrInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| format!("gh pr view {branch}: bad json: {e}"))?;
        Ok(Some(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pr_info_parses_gh_json() {
        let json = r#"{"state":"OPEN","number":7,"url":"https://github.com/acme/app/pull/7","title":"Add thing"}"#;
        let info: PrInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.state, "OPEN");
        assert_eq!(info.number, 7);
        assert_eq!(info.title, "Add thing");
    }

    #[test]
    fn view_in_non_repo_is_error_or_none() {
        // Without gh or outside a repo this must not panic; either outcome
        // (error, or None from a stubbed gh) is acceptable.
        let client = PrClient::new("/tmp");
        let _ = client.view("nope");
    }
}
