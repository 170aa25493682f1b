// crates/core/src/classify.rs
//! Session derivation: status, title, preview, summary, and auto tags,
//! all computed from a cleaned message sequence.

use chrono::{DateTime, Duration, Utc};

use crate::types::{ContentBlock, Message, MessageKind, SessionStatus};

/// A session with no activity for this long is idle.
///
/// 10 minutes is definitively stale and current activity definitively is
/// not; both boundaries are pinned by tests below.
pub const IDLE_THRESHOLD_SECS: i64 = 5 * 60;

/// Tools that block the assistant pending a human answer.
const PENDING_INPUT_TOOLS: &[&str] = &["AskUserQuestion"];

/// Fixed auto-tag vocabulary with the keywords that trigger each tag.
const AUTO_TAGS: &[(&str, &[&str])] = &[
    ("debugging", &["bug", "fix", "error", "debug", "crash", "broken"]),
    ("feature", &["add", "implement", "create", "build", "feature"]),
    ("refactoring", &["refactor", "rename", "restructure", "simplify", "cleanup"]),
    ("git", &["git", "commit", "branch", "merge", "rebase"]),
    ("testing", &["test", "tests", "coverage", "flaky"]),
    ("docs", &["docs", "documentation", "readme", "changelog"]),
    ("config", &["config", "configuration", "settings", "env"]),
    ("api", &["api", "endpoint", "route", "http"]),
    ("ui", &["ui", "css", "layout", "frontend", "styling"]),
];

/// Determine the live status of a session from its messages.
///
/// The most recent assistant turn wins: if it issued a pending-input tool
/// call the session is awaiting the user. Otherwise staleness of the
/// effective last activity (the override when given, else the last message
/// timestamp) decides between idle and working.
pub fn determine_session_status(
    messages: &[Message],
    last_activity: Option<DateTime<Utc>>,
) -> SessionStatus {
    let last_assistant = messages.iter().rev().find(|m| m.kind == MessageKind::Assistant);
    if let Some(msg) = last_assistant {
        if PENDING_INPUT_TOOLS.iter().any(|tool| msg.uses_tool(tool)) {
            return SessionStatus::Awaiting;
        }
    }

    let activity = last_activity.or_else(|| {
        messages
            .iter()
            .rev()
            .find_map(|m| m.timestamp.as_deref())
            .and_then(parse_timestamp)
    });

    match activity {
        Some(ts) if Utc::now() - ts >= Duration::seconds(IDLE_THRESHOLD_SECS) => {
            SessionStatus::Idle
        }
        _ => SessionStatus::Working,
    }
}

/// The first human-authored prompt: slash-command-only user turns are
/// skipped when hunting for it.
pub fn extract_first_user_message(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .filter(|m| m.kind == MessageKind::User)
        .map(|m| m.text().trim().to_string())
        .find(|text| !text.is_empty() && !text.starts_with('/'))
}

/// Short human-readable description: the first user message, with the first
/// distinctive tool target (a file path from an edit/write style tool)
/// appended when one exists.
pub fn generate_session_summary(messages: &[Message]) -> String {
    let first = extract_first_user_message(messages);
    let target = first_tool_target(messages);

    match (first, target) {
        (Some(text), Some(target)) => format!("{} ({})", truncate_text(&text, 80), target),
        (Some(text), None) => truncate_text(&text, 80),
        (None, Some(target)) => format!("Working in {}", target),
        (None, None) => "Empty session".to_string(),
    }
}

/// Session title: the first user prompt, truncated; falls back to the
/// generated summary when no human prompt exists.
pub fn derive_title(messages: &[Message]) -> String {
    match extract_first_user_message(messages) {
        Some(text) => truncate_text(&text, 60),
        None => generate_session_summary(messages),
    }
}

/// Truncated first-user-text shown in session lists.
pub fn derive_preview(messages: &[Message]) -> String {
    extract_first_user_message(messages)
        .map(|text| truncate_text(&text, 200))
        .unwrap_or_default()
}

/// Timestamp of the first message, i.e. session creation.
pub fn derive_created_at(messages: &[Message]) -> Option<String> {
    messages.iter().find_map(|m| m.timestamp.clone())
}

/// Auto tags: fixed vocabulary keyword-matched against the first user prompt.
pub fn derive_tags(messages: &[Message]) -> Vec<String> {
    let Some(text) = extract_first_user_message(messages) else {
        return Vec::new();
    };
    let words: std::collections::HashSet<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect();

    AUTO_TAGS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| words.contains(*k)))
        .map(|(tag, _)| (*tag).to_string())
        .collect()
}

/// First `file_path` found in a tool_use input, reduced to its file name.
fn first_tool_target(messages: &[Message]) -> Option<String> {
    messages.iter().find_map(|m| {
        m.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { input: Some(input), .. } => input
                .get("file_path")
                .and_then(|v| v.as_str())
                .map(|path| {
                    std::path::Path::new(path)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.to_string())
                }),
            _ => None,
        })
    })
}

pub(crate) fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Truncate to `max_len` characters, preferring a word boundary, with a
/// trailing ellipsis. Multi-byte safe.
pub fn truncate_text(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }

    let truncated: String = trimmed.chars().take(max_len).collect();
    if let Some(last_space) = truncated.rfind(' ') {
        let chars_to_space = truncated[..last_space].chars().count();
        if chars_to_space > max_len / 2 {
            let up_to_space: String = truncated.chars().take(chars_to_space).collect();
            return format!("{}...", up_to_space.trim_end());
        }
    }
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_transcript;

    fn user(text: &str) -> Message {
        Message::user(vec![ContentBlock::text(text)])
    }

    // ========================================================================
    // Status
    // ========================================================================

    #[test]
    fn test_status_working_for_current_activity() {
        let messages = vec![user("Question").with_timestamp(Utc::now().to_rfc3339())];
        assert_eq!(determine_session_status(&messages, None), SessionStatus::Working);
    }

    #[test]
    fn test_status_working_without_timestamps() {
        let messages = vec![user("Question")];
        assert_eq!(determine_session_status(&messages, None), SessionStatus::Working);
    }

    #[test]
    fn test_status_awaiting_on_pending_input_tool() {
        let messages = vec![Message::assistant(vec![ContentBlock::ToolUse {
            name: "AskUserQuestion".into(),
            id: "q1".into(),
            input: Some(serde_json::json!({"prompt": "Need input"})),
        }])];
        assert_eq!(
            determine_session_status(&messages, None),
            SessionStatus::Awaiting
        );
    }

    #[test]
    fn test_status_awaiting_beats_staleness() {
        // A pending question stays awaiting no matter how old.
        let messages = vec![Message::assistant(vec![ContentBlock::ToolUse {
            name: "AskUserQuestion".into(),
            id: "q1".into(),
            input: None,
        }])];
        let stale = Utc::now() - Duration::minutes(30);
        assert_eq!(
            determine_session_status(&messages, Some(stale)),
            SessionStatus::Awaiting
        );
    }

    #[test]
    fn test_status_idle_after_ten_minutes() {
        let messages = vec![user("Question")];
        let stale = Utc::now() - Duration::minutes(10);
        assert_eq!(
            determine_session_status(&messages, Some(stale)),
            SessionStatus::Idle
        );
    }

    #[test]
    fn test_status_working_right_now() {
        let messages = vec![user("Question")];
        assert_eq!(
            determine_session_status(&messages, Some(Utc::now())),
            SessionStatus::Working
        );
    }

    #[test]
    fn test_status_only_last_assistant_turn_counts() {
        // An old question already answered by a later assistant turn does
        // not keep the session awaiting.
        let messages = vec![
            Message::assistant(vec![ContentBlock::ToolUse {
                name: "AskUserQuestion".into(),
                id: "q1".into(),
                input: None,
            }]),
            user("my answer"),
            Message::assistant(vec![ContentBlock::text("done")]),
        ];
        assert_eq!(determine_session_status(&messages, None), SessionStatus::Working);
    }

    #[test]
    fn test_status_uses_last_message_timestamp() {
        let old = (Utc::now() - Duration::minutes(20)).to_rfc3339();
        let messages = vec![
            user("first").with_timestamp(old.clone()),
            Message::assistant(vec![ContentBlock::text("reply")]).with_timestamp(old),
        ];
        assert_eq!(determine_session_status(&messages, None), SessionStatus::Idle);
    }

    // ========================================================================
    // First user message
    // ========================================================================

    #[test]
    fn test_extract_first_user_message_skips_slash_commands() {
        let messages = vec![user("/help"), user("Build feature X")];
        assert_eq!(
            extract_first_user_message(&messages).as_deref(),
            Some("Build feature X")
        );
    }

    #[test]
    fn test_extract_first_user_message_skips_assistant() {
        let messages = vec![
            Message::assistant(vec![ContentBlock::text("greeting")]),
            user("real prompt"),
        ];
        assert_eq!(
            extract_first_user_message(&messages).as_deref(),
            Some("real prompt")
        );
    }

    #[test]
    fn test_extract_first_user_message_none() {
        assert_eq!(extract_first_user_message(&[user("/init")]), None);
        assert_eq!(extract_first_user_message(&[]), None);
    }

    // ========================================================================
    // Summary / title / preview
    // ========================================================================

    #[test]
    fn test_summary_combines_prompt_and_tool_target() {
        let content = [
            serde_json::json!({
                "type": "user",
                "message": {"content": [{"type": "text", "text": "Update README"}]}
            }),
            serde_json::json!({
                "type": "assistant",
                "message": {"content": [
                    {"type": "text", "text": "Editing file"},
                    {"type": "tool_use", "name": "Edit", "id": "tool-1",
                     "input": {"file_path": "/repo/README.md"}}
                ]}
            }),
        ]
        .map(|v| serde_json::to_string(&v).unwrap())
        .join("\n");

        let messages = parse_transcript(&content);
        let summary = generate_session_summary(&messages);
        assert!(summary.contains("Update README"), "summary: {summary}");
        assert!(summary.contains("README.md"), "summary: {summary}");
    }

    #[test]
    fn test_summary_without_tool_target() {
        let messages = vec![user("Just a question")];
        assert_eq!(generate_session_summary(&messages), "Just a question");
    }

    #[test]
    fn test_summary_empty_session() {
        assert_eq!(generate_session_summary(&[]), "Empty session");
    }

    #[test]
    fn test_title_falls_back_to_summary() {
        let messages = vec![Message::assistant(vec![ContentBlock::ToolUse {
            name: "Write".into(),
            id: "t1".into(),
            input: Some(serde_json::json!({"file_path": "/repo/notes.txt"})),
        }])];
        assert_eq!(derive_title(&messages), "Working in notes.txt");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "word ".repeat(100);
        let messages = vec![user(&long)];
        let preview = derive_preview(&messages);
        assert!(preview.chars().count() <= 203);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_created_at_is_first_timestamp() {
        let messages = vec![
            user("a").with_timestamp("2026-01-01T00:00:00Z"),
            user("b").with_timestamp("2026-01-02T00:00:00Z"),
        ];
        assert_eq!(derive_created_at(&messages).as_deref(), Some("2026-01-01T00:00:00Z"));
    }

    // ========================================================================
    // Auto tags
    // ========================================================================

    #[test]
    fn test_derive_tags_keyword_match() {
        let messages = vec![user("Fix the flaky test in the api layer")];
        let tags = derive_tags(&messages);
        assert!(tags.contains(&"debugging".to_string()));
        assert!(tags.contains(&"testing".to_string()));
        assert!(tags.contains(&"api".to_string()));
    }

    #[test]
    fn test_derive_tags_whole_word_only() {
        // "address" must not trigger the "add" keyword.
        let messages = vec![user("change the address rendering")];
        assert!(!derive_tags(&messages).contains(&"feature".to_string()));
    }

    #[test]
    fn test_derive_tags_empty_without_user_message() {
        assert!(derive_tags(&[]).is_empty());
    }

    // ========================================================================
    // Truncation
    // ========================================================================

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate_text("Hello world", 50), "Hello world");
    }

    #[test]
    fn test_truncate_prefers_word_boundary() {
        let result = truncate_text("Hello world this is a test", 15);
        assert!(result.ends_with("..."));
        assert!(result.len() <= 18);
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        let result = truncate_text(&"héllo wörld ".repeat(30), 20);
        assert!(result.ends_with("..."));
    }
}
