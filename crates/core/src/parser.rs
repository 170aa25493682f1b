// crates/core/src/parser.rs
//! Transcript parser for line-delimited session logs.
//!
//! Each line is one JSON record. Parsing is tolerant by design: a malformed
//! line (including a truncated trailing line from a writer still appending)
//! is skipped and parsing continues with the next one.

use std::path::Path;

use regex_lite::Regex;
use tracing::debug;

use crate::error::ParseError;
use crate::types::{ContentBlock, Message, MessageKind, RawContent, RawRecord};

/// Marker pair wrapping system-injected content inside text blocks.
const SYSTEM_MARKUP: &str = r"(?s)<system-reminder>.*?</system-reminder>";

/// Parse raw transcript text into a cleaned, ordered message sequence.
///
/// - Lines that fail to parse as JSON are skipped, not fatal.
/// - `summary` records are metadata and never emitted.
/// - Record types other than `user`/`assistant` are skipped.
/// - Text blocks are cleaned of system-reminder markup; a record left with
///   no non-empty blocks is not materialized.
/// - String-valued `message.content` becomes a single synthetic text block.
///
/// Output order matches file order; every downstream component relies on it.
pub fn parse_transcript(raw: &str) -> Vec<Message> {
    let system_markup = Regex::new(SYSTEM_MARKUP).expect("valid markup regex");

    let mut messages = Vec::new();

    for (line_number, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: RawRecord = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                debug!(line = line_number + 1, error = %e, "Skipping malformed transcript line");
                continue;
            }
        };

        let kind = match record.kind.as_deref() {
            Some("user") => MessageKind::User,
            Some("assistant") => MessageKind::Assistant,
            // Summary records are metadata, not conversation content.
            _ => continue,
        };

        let Some(content) = record.message.and_then(|m| m.content) else {
            continue;
        };

        let blocks = clean_content(content, &system_markup);
        if blocks.is_empty() {
            continue;
        }

        let mut message = Message {
            kind,
            content: blocks,
            timestamp: None,
        };
        if let Some(ts) = record.timestamp {
            message = message.with_timestamp(ts);
        }
        messages.push(message);
    }

    messages
}

/// Read and parse a transcript file.
pub async fn parse_session_file(path: &Path) -> Result<Vec<Message>, ParseError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ParseError::io(path, e))?;
    Ok(parse_transcript(&raw))
}

/// Whether a transcript's defining (first parseable) record marks it as a
/// sidechain, i.e. a sub-agent transcript that must not surface as a
/// top-level session.
pub fn is_sidechain_transcript(raw: &str) -> bool {
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(record) = serde_json::from_str::<RawRecord>(line) {
            return record.is_sidechain;
        }
    }
    false
}

/// Normalize raw content into cleaned blocks, dropping what carries nothing.
fn clean_content(content: RawContent, system_markup: &Regex) -> Vec<ContentBlock> {
    let blocks = match content {
        RawContent::Text(text) => vec![ContentBlock::text(text)],
        RawContent::Blocks(blocks) => blocks,
    };

    blocks
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => {
                let cleaned = system_markup.replace_all(&text, "").into_owned();
                if cleaned.trim().is_empty() {
                    None
                } else {
                    Some(ContentBlock::Text { text: cleaned })
                }
            }
            // Unrecognized block kinds are dropped here, once, so every
            // consumer downstream sees only the closed set.
            ContentBlock::Other => None,
            other => Some(other),
        })
        .collect()
}
