//! Manage the project-name to GitHub-repo mapping.

use std::path::Path;

use flotilla_core::records::ProjectEntry;
use flotilla_core::registry::Registry;

pub fn cmd_projects(workspace: &Path, args: &[String]) -> i32 {
    match args.first().map(|s| s.as_str()) {
        Some("list") => cmd_list(workspace),
        Some("add") => cmd_add(workspace, &args[1..]),
        _ => {
            eprintln!("Usage: flotilla projects <list|add>");
            1
        }
    }
}

fn cmd_list(workspace: &Path) -> i32 {
    let registry = Registry::new(workspace);
    let projects = match registry.projects() {
        Ok(projects) => projects,
        Err(e) => {
            eprintln!("failed to read project manifest: {e}");
            return 1;
        }
    };

    println!("{:<16} {:<32} PATH", "NAME", "GITHUB");
    for p in &projects {
        println!("{:<16} {:<32} {}", p.name, p.github_repo, p.path);
    }
    0
}

fn cmd_add(workspace: &Path, args: &[String]) -> i32 {
    let (name, github_repo, path) = match args {
        [name, github_repo] => (name.clone(), github_repo.clone(), name.clone()),
        [name, github_repo, path] => (name.clone(), github_repo.clone(), path.clone()),
        _ => {
            eprintln!("Usage: flotilla projects add <name> <github-repo> [path]");
            return 1;
        }
    };

    let registry = Registry::new(workspace);
    match registry.projects() {
        Ok(existing) if existing.iter().any(|p| p.name == name) => {
            eprintln!("project already mapped: {name}");
            return 1;
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("failed to read project manifest: {e}");
            return 1;
        }
    }

    let entry = ProjectEntry {
        name: name.clone(),
        github_repo,
        path,
    };
    if let Err(e) = registry.append_project(&entry) {
        eprintln!("failed to update project manifest: {e}");
        return 1;
    }

    println!("Added project: {name} -> {}", entry.github_repo);
    0
}
