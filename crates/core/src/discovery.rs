// crates/core/src/discovery.rs
//! Multi-directory session discovery.
//!
//! Every call performs an independent filesystem scan and produces a fresh
//! snapshot of the session index; nothing is cached between calls, so
//! concurrent discovery passes cannot race each other. Transcript
//! directories are small and local, which makes the repeated I/O cheap.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::chain::link_chains;
use crate::classify::{
    derive_created_at, derive_preview, derive_tags, derive_title, determine_session_status,
};
use crate::config::{ConfigSnapshot, DirectoryProfile};
use crate::error::DiscoveryError;
use crate::parser::{is_sidechain_transcript, parse_transcript};
use crate::types::Session;

/// Project aggregation entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCount {
    pub name: String,
    pub path: String,
    pub count: usize,
}

/// Directory aggregation entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryCount {
    pub path: String,
    pub label: String,
    pub color: String,
    pub count: usize,
}

/// Discover all sessions across the enabled directory profiles.
///
/// Sidechain transcripts (first parseable record flagged `isSidechain`) are
/// excluded: they are sub-agent internals, not top-level sessions. Files and
/// directories that cannot be read are skipped, never fatal. The result is
/// ordered by last modification, newest first, with chain fields assigned.
pub async fn discover_sessions(config: &ConfigSnapshot) -> Vec<Session> {
    let mut sessions = Vec::new();

    for profile in config.enabled_directories() {
        for path in transcript_files(Path::new(&profile.path)) {
            match load_session(profile, &path, config).await {
                Some(session) => sessions.push(session),
                None => continue,
            }
        }
    }

    link_chains(&mut sessions);
    sessions.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
    sessions
}

/// Locate one session by id, with full messages attached.
pub async fn find_session(
    config: &ConfigSnapshot,
    id: &str,
) -> Result<Session, DiscoveryError> {
    discover_sessions(config)
        .await
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| DiscoveryError::SessionNotFound { id: id.to_string() })
}

/// Sessions grouped by project, as (display name, grouping key, count).
pub async fn get_project_list(config: &ConfigSnapshot) -> Vec<ProjectCount> {
    let sessions = discover_sessions(config).await;
    let mut counts: HashMap<(String, String), usize> = HashMap::new();
    for session in &sessions {
        *counts
            .entry((session.project_name.clone(), session.project.clone()))
            .or_insert(0) += 1;
    }

    let mut projects: Vec<ProjectCount> = counts
        .into_iter()
        .map(|((name, path), count)| ProjectCount { name, path, count })
        .collect();
    projects.sort_by(|a, b| a.name.cmp(&b.name));
    projects
}

/// Sessions grouped by owning directory profile.
pub async fn get_directory_list(config: &ConfigSnapshot) -> Vec<DirectoryCount> {
    let sessions = discover_sessions(config).await;
    config
        .enabled_directories()
        .map(|profile| DirectoryCount {
            path: profile.path.clone(),
            label: profile.label.clone(),
            color: profile.color.clone(),
            count: sessions.iter().filter(|s| s.directory == profile.path).count(),
        })
        .collect()
}

/// Tag frequency across the full discovered set.
pub async fn get_tag_counts(config: &ConfigSnapshot) -> HashMap<String, usize> {
    let sessions = discover_sessions(config).await;
    let mut counts = HashMap::new();
    for session in &sessions {
        for tag in &session.tags {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Recursively enumerate transcript files under a profile directory.
/// Unreadable entries are skipped so one bad profile never fails discovery.
fn transcript_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                debug!(root = %root.display(), error = %err, "Skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("jsonl"))
        .map(|e| e.into_path())
        .collect()
}

/// Build one candidate session from a transcript file.
/// Returns `None` for unreadable files and sidechain transcripts.
async fn load_session(
    profile: &DirectoryProfile,
    path: &Path,
    config: &ConfigSnapshot,
) -> Option<Session> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping unreadable transcript");
            return None;
        }
    };

    if is_sidechain_transcript(&raw) {
        return None;
    }

    let id = path.file_stem()?.to_string_lossy().into_owned();
    let messages = parse_transcript(&raw);

    let last_modified = tokio::fs::metadata(path)
        .await
        .ok()
        .and_then(|m| m.modified().ok())
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    let (project, project_name) = project_of(profile, path);

    let mut tags = derive_tags(&messages);
    for tag in config.custom_tags_for(&id) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }

    Some(Session {
        directory: profile.path.clone(),
        directory_label: profile.label.clone(),
        directory_color: profile.color.clone(),
        project,
        project_name,
        title: derive_title(&messages),
        timestamp: derive_created_at(&messages),
        last_modified,
        status: determine_session_status(&messages, None),
        preview: derive_preview(&messages),
        tags,
        is_pinned: config.is_pinned(&id),
        messages,
        chain_id: None,
        chain_index: None,
        chain_length: None,
        file_path: path.to_path_buf(),
        id,
    })
}

/// Grouping key and display name for the file's project, derived from its
/// path relative to the profile root. Files at the root fall back to the
/// profile label.
fn project_of(profile: &DirectoryProfile, path: &Path) -> (String, String) {
    let rel_parent = path
        .strip_prefix(&profile.path)
        .ok()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty());

    match rel_parent {
        Some(parent) => {
            let key = parent.to_string_lossy().into_owned();
            let name = project_display_name(&key);
            (key, name)
        }
        None => (profile.label.clone(), profile.label.clone()),
    }
}

/// Decode a hyphen-encoded project directory name to a display name.
///
/// Claude-style profiles encode `/Users/foo/my-project` as
/// `-Users-foo-my-project`; hyphens in real directory names are ambiguous
/// with path separators, so interpretations that fuse more trailing parts
/// are probed against the filesystem first and the final component of the
/// first existing path wins.
fn project_display_name(encoded: &str) -> String {
    let Some(stripped) = encoded.strip_prefix('-') else {
        return encoded.to_string();
    };

    let parts: Vec<&str> = stripped.split('-').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return encoded.to_string();
    }

    for fused in (1..=parts.len()).rev() {
        let split = parts.len() - fused;
        let name = parts[split..].join("-");
        let candidate = format!("/{}/{}", parts[..split].join("/"), name);
        if split > 0 && Path::new(&candidate).is_dir() {
            return name;
        }
    }

    // Nothing on disk matches; the last part is the least surprising guess.
    parts.last().map(|p| p.to_string()).unwrap_or_else(|| encoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryKind;
    use pretty_assertions::assert_eq;

    fn profile(path: &Path) -> DirectoryProfile {
        DirectoryProfile {
            path: path.to_string_lossy().into_owned(),
            label: "Default".to_string(),
            color: "#7c3aed".to_string(),
            enabled: true,
            kind: DirectoryKind::Claude,
        }
    }

    fn snapshot(dirs: Vec<DirectoryProfile>) -> ConfigSnapshot {
        ConfigSnapshot {
            directories: dirs,
            ..ConfigSnapshot::default()
        }
    }

    async fn write_session(root: &Path, project: &str, id: &str, lines: &[serde_json::Value]) {
        let dir = root.join(project);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let body = lines
            .iter()
            .map(|v| serde_json::to_string(v).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        tokio::fs::write(dir.join(format!("{id}.jsonl")), body).await.unwrap();
    }

    fn user_line(text: &str) -> serde_json::Value {
        serde_json::json!({
            "type": "user",
            "message": {"content": [{"type": "text", "text": text}]},
            "timestamp": "2026-02-01T10:00:00.000Z"
        })
    }

    #[tokio::test]
    async fn test_discover_finds_sessions_across_projects() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "project-a", "session-1", &[user_line("Fix the bug")]).await;
        write_session(tmp.path(), "project-b", "session-2", &[user_line("Write docs")]).await;

        let config = snapshot(vec![profile(tmp.path())]);
        let sessions = discover_sessions(&config).await;

        assert_eq!(sessions.len(), 2);
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&"session-1"));
        assert!(ids.contains(&"session-2"));

        let s1 = sessions.iter().find(|s| s.id == "session-1").unwrap();
        assert_eq!(s1.project, "project-a");
        assert_eq!(s1.project_name, "project-a");
        assert_eq!(s1.title, "Fix the bug");
        assert!(!s1.messages.is_empty());
    }

    #[tokio::test]
    async fn test_discover_skips_sidechain_sessions() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(
            tmp.path(),
            "project-c",
            "sidechain-1",
            &[serde_json::json!({
                "isSidechain": true,
                "type": "user",
                "message": {"content": [{"type": "text", "text": "skip"}]}
            })],
        )
        .await;
        write_session(tmp.path(), "project-c", "normal-1", &[user_line("keep me")]).await;

        let config = snapshot(vec![profile(tmp.path())]);
        let sessions = discover_sessions(&config).await;

        assert!(sessions.iter().all(|s| s.id != "sidechain-1"));
        assert!(sessions.iter().any(|s| s.id == "normal-1"));
    }

    #[tokio::test]
    async fn test_sidechain_flag_on_later_record_keeps_session() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(
            tmp.path(),
            "project-c",
            "mixed-1",
            &[
                user_line("top level"),
                serde_json::json!({
                    "isSidechain": true,
                    "type": "assistant",
                    "message": {"content": [{"type": "text", "text": "nested"}]}
                }),
            ],
        )
        .await;

        let config = snapshot(vec![profile(tmp.path())]);
        let sessions = discover_sessions(&config).await;
        assert!(sessions.iter().any(|s| s.id == "mixed-1"));
    }

    #[tokio::test]
    async fn test_discover_links_chains_per_directory() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "project-a", "session-1", &[user_line("Ship feature Y")]).await;
        write_session(tmp.path(), "project-a", "session-2", &[user_line("Ship feature Y")]).await;

        let config = snapshot(vec![profile(tmp.path())]);
        let sessions = discover_sessions(&config).await;

        let chained: Vec<&Session> = sessions.iter().filter(|s| s.chain_id.is_some()).collect();
        assert_eq!(chained.len(), 2);
        assert!(chained.iter().all(|s| s.chain_length == Some(2)));
        let mut indexes: Vec<usize> = chained.iter().map(|s| s.chain_index.unwrap()).collect();
        indexes.sort();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_discover_overlays_pins_and_custom_tags() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "project-a", "session-1", &[user_line("Fix the bug")]).await;

        let mut config = snapshot(vec![profile(tmp.path())]);
        config.pins.push("session-1".to_string());
        config
            .custom_tags
            .insert("session-1".to_string(), vec!["urgent".to_string()]);

        let sessions = discover_sessions(&config).await;
        let s = sessions.iter().find(|s| s.id == "session-1").unwrap();
        assert!(s.is_pinned);
        assert!(s.tags.contains(&"urgent".to_string()));
        // Auto tag from "Fix the bug" survives alongside the custom one.
        assert!(s.tags.contains(&"debugging".to_string()));
    }

    #[tokio::test]
    async fn test_discover_skips_disabled_and_missing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "project-a", "session-1", &[user_line("hello")]).await;

        let disabled = DirectoryProfile {
            enabled: false,
            ..profile(tmp.path())
        };
        let missing = DirectoryProfile {
            path: "/nonexistent/trailview-test".to_string(),
            label: "Gone".to_string(),
            color: "#000".to_string(),
            enabled: true,
            kind: DirectoryKind::Claude,
        };

        let sessions = discover_sessions(&snapshot(vec![disabled, missing])).await;
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_discover_ignores_non_jsonl_files() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "project-a", "session-1", &[user_line("hello")]).await;
        tokio::fs::write(tmp.path().join("project-a/notes.txt"), "notes")
            .await
            .unwrap();

        let sessions = discover_sessions(&snapshot(vec![profile(tmp.path())])).await;
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_find_session_returns_full_messages() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "project-a", "session-1", &[user_line("hello")]).await;

        let config = snapshot(vec![profile(tmp.path())]);
        let session = find_session(&config, "session-1").await.unwrap();
        assert_eq!(session.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_find_session_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let config = snapshot(vec![profile(tmp.path())]);
        let err = find_session(&config, "nope").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_project_and_directory_lists() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "project-a", "s1", &[user_line("one")]).await;
        write_session(tmp.path(), "project-a", "s2", &[user_line("two")]).await;
        write_session(tmp.path(), "project-b", "s3", &[user_line("three")]).await;

        let config = snapshot(vec![profile(tmp.path())]);

        let projects = get_project_list(&config).await;
        assert_eq!(projects.len(), 2);
        let a = projects.iter().find(|p| p.name == "project-a").unwrap();
        assert_eq!(a.count, 2);

        let directories = get_directory_list(&config).await;
        assert_eq!(directories.len(), 1);
        assert_eq!(directories[0].count, 3);
        assert_eq!(directories[0].label, "Default");
    }

    #[tokio::test]
    async fn test_tag_counts_reflect_current_pass() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "project-a", "s1", &[user_line("fix a bug in the api")]).await;

        let config = snapshot(vec![profile(tmp.path())]);
        let tags = get_tag_counts(&config).await;
        assert_eq!(tags.get("debugging"), Some(&1));
        assert_eq!(tags.get("api"), Some(&1));

        // A new session appears in the very next pass, no cache in between.
        write_session(tmp.path(), "project-b", "s2", &[user_line("fix the docs")]).await;
        let tags = get_tag_counts(&config).await;
        assert_eq!(tags.get("debugging"), Some(&2));
    }

    #[tokio::test]
    async fn test_rediscovery_is_stable() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "project-a", "s1", &[user_line("stable title")]).await;

        let config = snapshot(vec![profile(tmp.path())]);
        let first = discover_sessions(&config).await;
        let second = discover_sessions(&config).await;

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.title, b.title);
            assert_eq!(a.status, b.status);
        }
    }

    #[test]
    fn test_project_display_name_plain() {
        assert_eq!(project_display_name("project-a"), "project-a");
    }

    #[test]
    fn test_project_display_name_encoded_fallback() {
        // Nothing on disk: last hyphen part wins.
        assert_eq!(project_display_name("-Users-nobody-proj"), "proj");
    }

    #[test]
    fn test_project_display_name_probes_filesystem() {
        let tmp = tempfile::tempdir().unwrap();
        let project = tmp.path().join("my-project");
        std::fs::create_dir_all(&project).unwrap();

        let encoded = project.to_string_lossy().replace('/', "-");
        assert_eq!(project_display_name(&encoded), "my-project");
    }
}
