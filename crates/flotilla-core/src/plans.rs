//! Plan-file metadata for the dashboard.
//!
//! Plans live at `<workspace>/plans/<project>/<name>.md` with an optional
//! `---`-fenced frontmatter block of `key: value` lines. The parse is
//! deliberately loose: quoted values are unquoted, a missing title falls
//! back to the first `#` heading and then to the filename, a missing status
//! defaults to `draft`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

/// Metadata for one plan file, as exposed by the dashboard API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanMeta {
    pub project: String,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub issue: String,
    pub status: String,
    pub path: String,
}

/// Scan `<workspace>/plans` for plan files. A missing plans directory yields
/// an empty list; unreadable files are skipped.
pub fn scan_plans(workspace: &Path) -> Vec<PlanMeta> {
    let plans_dir = workspace.join("plans");
    let mut plans = Vec::new();

    let projects = match fs::read_dir(&plans_dir) {
        Ok(entries) => entries,
        Err(_) => return plans,
    };
    for project_dir in projects.flatten() {
        if !project_dir.path().is_dir() {
            continue;
        }
        let project = project_dir.file_name().to_string_lossy().to_string();
        let files = match fs::read_dir(project_dir.path()) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for file in files.flatten() {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let fm = parse_frontmatter(&content, &file_name);
            plans.push(PlanMeta {
                project: project.clone(),
                title: fm.get("title").cloned().unwrap_or_default(),
                issue: fm.get("issue").cloned().unwrap_or_default(),
                status: fm.get("status").cloned().unwrap_or_default(),
                path: format!("{project}/{file_name}"),
            });
        }
    }
    plans.sort_by(|a, b| a.path.cmp(&b.path));
    plans
}

/// Parse the leading frontmatter block, with title/status fallbacks applied.
pub fn parse_frontmatter(content: &str, file_name: &str) -> HashMap<String, String> {
    let mut fm = HashMap::new();
    let mut in_frontmatter = false;

    for (i, line) in content.lines().enumerate() {
        if line.trim() == "---" {
            if !in_frontmatter && i == 0 {
                in_frontmatter = true;
                continue;
            }
            if in_frontmatter {
                break;
            }
        } else if in_frontmatter {
            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim().to_string();
                let value = value.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
                fm.insert(key, value);
            }
        }
    }

    if fm.get("title").map_or(true, String::is_empty) {
        for line in content.lines() {
            if let Some(heading) = line.strip_prefix("# ") {
                fm.insert("title".into(), heading.trim().to_string());
                break;
            }
        }
    }
    if fm.get("title").map_or(true, String::is_empty) {
        fm.insert("title".into(), file_name.to_string());
    }
    if fm.get("status").map_or(true, String::is_empty) {
        fm.insert("status".into(), "draft".into());
    }
    fm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontmatter_key_values() {
        let content = "---\ntitle: \"Ship widgets\"\nissue: '#12'\nstatus: ready\n---\n\nbody\n";
        let fm = parse_frontmatter(content, "plan.md");
        assert_eq!(fm["title"], "Ship widgets");
        assert_eq!(fm["issue"], "#12");
        assert_eq!(fm["status"], "ready");
    }

    #[test]
    fn title_falls_back_to_heading_then_filename() {
        let fm = parse_frontmatter("# From Heading\n\ntext\n", "x.md");
        assert_eq!(fm["title"], "From Heading");
        assert_eq!(fm["status"], "draft");

        let fm = parse_frontmatter("just text\n", "bare.md");
        assert_eq!(fm["title"], "bare.md");
    }

    #[test]
    fn frontmatter_must_start_on_first_line() {
        let fm = parse_frontmatter("\n---\ntitle: late\n---\n", "x.md");
        assert_ne!(fm.get("title").map(String::as_str), Some("late"));
    }

    #[test]
    fn scan_missing_plans_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(scan_plans(tmp.path()).is_empty());
    }

    #[test]
    fn scan_collects_per_project_markdown() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("plans/app");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("a-feature.md"),
            "---\ntitle: Feature A\nstatus: active\n---\n",
        )
        .unwrap();
        std::fs::write(dir.join("notes.txt"), "not a plan").unwrap();

        let plans = scan_plans(tmp.path());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].project, "app");
        assert_eq!(plans[0].title, "Feature A");
        assert_eq!(plans[0].status, "active");
        assert_eq!(plans[0].path, "app/a-feature.md");
    }
}
