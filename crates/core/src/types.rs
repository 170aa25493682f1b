// crates/core/src/types.rs
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Assistant,
}

/// One content block of a transcript message.
///
/// Closed set of variants; anything the transcript format grows in the
/// future lands in `Other` and is dropped by the parser rather than
/// silently mis-rendered downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        #[serde(default)]
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input: Option<serde_json::Value>,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<serde_json::Value>,
    },
    Thinking {
        thinking: String,
    },
    #[serde(other)]
    Other,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The block's text payload, if it is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// True for blocks that carry visible conversation content.
    pub fn is_displayable(&self) -> bool {
        match self {
            Self::Text { text } => !text.trim().is_empty(),
            Self::Thinking { thinking } => !thinking.trim().is_empty(),
            Self::ToolUse { .. } | Self::ToolResult { .. } => true,
            Self::Other => false,
        }
    }
}

/// A cleaned, normalized transcript message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn user(content: Vec<ContentBlock>) -> Self {
        Self {
            kind: MessageKind::User,
            content,
            timestamp: None,
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self {
            kind: MessageKind::Assistant,
            content,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Concatenated text of all text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether any block is a `tool_use` with the given tool name.
    pub fn uses_tool(&self, tool: &str) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { name, .. } if name == tool))
    }
}

/// Live status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Working,
    Awaiting,
    Idle,
}

/// A discovered session: one transcript file plus everything derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    /// Path of the owning directory profile.
    pub directory: String,
    pub directory_label: String,
    pub directory_color: String,
    /// Path grouping key: first component of the file's profile-relative path.
    pub project: String,
    pub project_name: String,
    pub title: String,
    /// Timestamp of the first message (session creation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// File modification time, RFC 3339.
    pub last_modified: String,
    pub status: SessionStatus,
    pub preview: String,
    pub tags: Vec<String>,
    pub is_pinned: bool,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_length: Option<usize>,
    /// Source file on disk. Internal; never serialized.
    #[serde(skip)]
    pub file_path: PathBuf,
}

impl Session {
    /// Copy with message bodies stripped, for list/search responses.
    pub fn without_messages(&self) -> Self {
        Self {
            messages: Vec::new(),
            ..self.clone()
        }
    }
}

// ============================================================================
// Raw JSONL record shapes (deserialization only)
// ============================================================================

/// One line of a transcript file, as written by the assistant.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<RawMessage>,
    pub timestamp: Option<String>,
    #[serde(rename = "isSidechain", default)]
    pub is_sidechain: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub content: Option<RawContent>,
}

/// `message.content` is either a plain string or an array of blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

// ============================================================================
// Tests
// ============================================================================
