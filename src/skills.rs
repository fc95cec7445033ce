// Skill-file installer: copies the bundled SKILL.md into AI coding tool
// directories so assistants can drive the CLI without memorising it.

use std::io;
use std::path::{Path, PathBuf};

const SKILL_MD: &str = include_str!("../skills/SKILL.md");
const MARKER: &str = "<!-- vidsnatch-skill -->";

#[derive(Debug, Default)]
pub struct SkillReport {
    pub installed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Install into every detected target under `home`, plus the GitHub
/// Copilot instructions file under `repo_root` when a `.github/`
/// directory exists there. Missing parents are skipped, never an error.
pub fn install_skills(home: &Path, repo_root: &Path) -> io::Result<SkillReport> {
    let mut report = SkillReport::default();

    for (label, target) in skill_file_targets(home) {
        match target {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, SKILL_MD)?;
                report.installed.push(format!("{}  →  {}", label, path.display()));
            }
            None => report.skipped.push(format!(
                "{} (target directory not found — launch the tool once to create it)",
                label
            )),
        }
    }

    let github_dir = repo_root.join(".github");
    if github_dir.exists() {
        let target = github_dir.join("copilot-instructions.md");
        let existing = std::fs::read_to_string(&target).unwrap_or_default();
        std::fs::write(&target, upsert_marker_block(&existing, SKILL_MD))?;
        report
            .installed
            .push(format!("GitHub Copilot  →  {}", target.display()));
    } else {
        report.skipped.push(
            "GitHub Copilot (.github/ not found — run from the root of a git repo)".to_string(),
        );
    }

    Ok(report)
}

/// Reverse `install_skills`: delete copied files and strip the marker
/// block from the Copilot instructions.
pub fn uninstall_skills(home: &Path, repo_root: &Path) -> io::Result<SkillReport> {
    let mut report = SkillReport::default();

    for (label, target) in skill_file_targets(home) {
        match target {
            Some(path) if path.exists() => {
                std::fs::remove_file(&path)?;
                report.installed.push(format!("{}  →  removed", label));
            }
            _ => report.skipped.push(format!("{} (not installed)", label)),
        }
    }

    let target = repo_root.join(".github").join("copilot-instructions.md");
    if target.exists() {
        let existing = std::fs::read_to_string(&target)?;
        if existing.contains(MARKER) {
            std::fs::write(&target, remove_marker_block(&existing))?;
            report
                .installed
                .push("GitHub Copilot  →  block removed".to_string());
        } else {
            report
                .skipped
                .push("GitHub Copilot (no vidsnatch block)".to_string());
        }
    } else {
        report
            .skipped
            .push("GitHub Copilot (not installed)".to_string());
    }

    Ok(report)
}

/// (label, Some(file path)) for unconditional targets; None when the
/// parent is a directory the owning tool must have created first.
fn skill_file_targets(home: &Path) -> Vec<(&'static str, Option<PathBuf>)> {
    let cursor_rules = home.join(".cursor").join("rules");
    vec![
        (
            "Claude Code",
            Some(home.join(".claude").join("skills").join("vidsnatch").join("SKILL.md")),
        ),
        (
            "OpenClaw",
            Some(
                home.join(".openclaw")
                    .join("workspace")
                    .join("skills")
                    .join("vidsnatch")
                    .join("SKILL.md"),
            ),
        ),
        (
            "Copilot",
            Some(home.join(".copilot").join("skills").join("vidsnatch").join("SKILL.md")),
        ),
        (
            "Cursor",
            cursor_rules
                .exists()
                .then(|| cursor_rules.join("vidsnatch.md")),
        ),
    ]
}

/// Insert or replace the marker-delimited skill block in an instructions
/// file, leaving unrelated content untouched.
fn upsert_marker_block(existing: &str, skill: &str) -> String {
    let block = format!("{}\n{}\n{}", MARKER, skill, MARKER);
    if existing.contains(MARKER) {
        let mut parts = existing.splitn(2, MARKER);
        let before = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("");
        let after = rest.splitn(2, MARKER).nth(1).unwrap_or("");
        format!("{}{}{}", before, block, after)
    } else if existing.is_empty() {
        format!("{}\n", block)
    } else {
        format!("{}\n\n{}\n", existing.trim_end(), block)
    }
}

fn remove_marker_block(existing: &str) -> String {
    let Some(start) = existing.find(MARKER) else {
        return existing.to_string();
    };
    let after_first = start + MARKER.len();
    let Some(end_rel) = existing[after_first..].find(MARKER) else {
        return existing.to_string();
    };
    let end = after_first + end_rel + MARKER.len();
    let mut result = String::new();
    result.push_str(existing[..start].trim_end());
    let tail = existing[end..].trim_start();
    if !result.is_empty() && !tail.is_empty() {
        result.push_str("\n\n");
    }
    result.push_str(tail);
    result
}
