// crates/core/src/chain.rs
//! Chain linking: sessions in the same directory that share a derived title
//! are continuations of one conversation split across restarted transcript
//! files, and get linked into an ordered chain.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::classify::parse_timestamp;
use crate::types::Session;

/// Assign `chain_id`/`chain_index`/`chain_length` to every group of two or
/// more sessions sharing a normalized title within one directory. Singleton
/// groups keep all three fields unset. Chains never span directories.
pub fn link_chains(sessions: &mut [Session]) {
    let mut groups: HashMap<(String, String), Vec<usize>> = HashMap::new();
    for (i, session) in sessions.iter().enumerate() {
        let key = (session.directory.clone(), normalize_title(&session.title));
        groups.entry(key).or_default().push(i);
    }

    for ((_, chain_id), mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by_key(|&i| sort_instant(&sessions[i]));
        let length = members.len();
        for (index, &i) in members.iter().enumerate() {
            sessions[i].chain_id = Some(chain_id.clone());
            sessions[i].chain_index = Some(index);
            sessions[i].chain_length = Some(length);
        }
    }
}

/// Case- and whitespace-normalized chain key.
fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Creation timestamp for ordering, falling back to the file mtime.
fn sort_instant(session: &Session) -> DateTime<Utc> {
    session
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| parse_timestamp(&session.last_modified))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
