// crates/core/src/search.rs
//! Quick and deep session search.
//!
//! Both modes are case-insensitive substring matches, nothing cleverer, so
//! matching behavior stays predictable and testable. Quick search looks at
//! metadata only; deep search additionally scans full message content.

use serde::Deserialize;

use crate::config::ConfigSnapshot;
use crate::discovery::discover_sessions;
use crate::types::{ContentBlock, Session};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Quick,
    Deep,
}

/// Search the freshly discovered index.
///
/// Quick mode matches title, project name, and tags. Deep mode also matches
/// anywhere in message content: text, thinking, tool names, tool input, and
/// tool result text.
pub async fn search_sessions(
    config: &ConfigSnapshot,
    query: &str,
    mode: SearchMode,
) -> Vec<Session> {
    let needle = query.to_lowercase();
    discover_sessions(config)
        .await
        .into_iter()
        .filter(|session| {
            metadata_matches(session, &needle)
                || (mode == SearchMode::Deep && content_matches(session, &needle))
        })
        .collect()
}

fn metadata_matches(session: &Session, needle: &str) -> bool {
    session.title.to_lowercase().contains(needle)
        || session.project_name.to_lowercase().contains(needle)
        || session.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

fn content_matches(session: &Session, needle: &str) -> bool {
    session
        .messages
        .iter()
        .flat_map(|m| m.content.iter())
        .any(|block| block_text(block).to_lowercase().contains(needle))
}

/// Searchable text of one block.
fn block_text(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Text { text } => text.clone(),
        ContentBlock::Thinking { thinking } => thinking.clone(),
        ContentBlock::ToolUse { name, input, .. } => match input {
            Some(input) => format!("{} {}", name, input),
            None => name.clone(),
        },
        ContentBlock::ToolResult { content, .. } => content
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_default(),
        ContentBlock::Other => String::new(),
    }
}
