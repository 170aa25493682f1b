// crates/server/src/live.rs
//! Live stream broadcaster: tails one transcript file per actively-watched
//! session and fans parse results out to every subscriber of that session.
//!
//! One watch task runs per subscribed session id, holding a private read
//! offset. New complete lines go through the transcript parser and are
//! emitted as `message` events in file order; status is recomputed after
//! each batch and emitted only when it changes. When the last subscriber of
//! a session goes away, its watch task is torn down; no watch outlives its
//! subscribers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use trailview_core::{
    determine_session_status, find_session, parse_transcript, ConfigStore, DiscoveryError,
    Message, SessionStatus,
};

/// Fallback poll cadence when no filesystem event arrives.
const FALLBACK_POLL: Duration = Duration::from_millis(500);

/// Per-session fan-out channel capacity.
const CHANNEL_CAPACITY: usize = 256;

/// One event on a session's live feed.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// A newly appended, fully parsed message.
    Message(Message),
    /// The session status, emitted only when it changed.
    Status(SessionStatus),
}

struct WatchEntry {
    tx: broadcast::Sender<LiveEvent>,
    subscribers: usize,
    task: JoinHandle<()>,
}

type WatchMap = Arc<Mutex<HashMap<String, WatchEntry>>>;

/// Per-session subscription hub. Cheap to clone.
#[derive(Clone)]
pub struct Broadcaster {
    config: ConfigStore,
    watches: WatchMap,
}

impl Broadcaster {
    pub fn new(config: ConfigStore) -> Self {
        Self {
            config,
            watches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to a session's live feed.
    ///
    /// Subscriptions to the same id share one file watch; each receives its
    /// own copy of every event. The returned handle cancels itself on drop.
    pub async fn subscribe(&self, session_id: &str) -> Result<Subscription, DiscoveryError> {
        let snapshot = self
            .config
            .load()
            .await
            .map_err(|_| DiscoveryError::SessionNotFound {
                id: session_id.to_string(),
            })?;
        let session = find_session(&snapshot, session_id).await?;

        // Seed the read position before registering the watch so a line
        // appended right after subscribe() returns is always streamed,
        // never swallowed by the initial read. Discarded when another
        // subscriber's watch already exists.
        let seed = WatchSeed::read(&session.file_path).await;

        let mut watches = self.watches.lock().expect("watch map lock");
        let entry = watches.entry(session_id.to_string()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
            let task = tokio::spawn(watch_session(
                session_id.to_string(),
                session.file_path.clone(),
                seed,
                tx.clone(),
                self.watches.clone(),
            ));
            WatchEntry {
                tx,
                subscribers: 0,
                task,
            }
        });
        entry.subscribers += 1;
        let rx = entry.tx.subscribe();

        Ok(Subscription {
            session_id: session_id.to_string(),
            rx,
            watches: self.watches.clone(),
        })
    }

    /// Number of sessions currently being watched.
    pub fn active_watch_count(&self) -> usize {
        self.watches.lock().expect("watch map lock").len()
    }
}

/// A live feed handle; dropping it unsubscribes, and the underlying watch
/// stops once its last subscriber is gone.
pub struct Subscription {
    session_id: String,
    rx: broadcast::Receiver<LiveEvent>,
    watches: WatchMap,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    /// Next event, or `None` once the feed has terminated.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(session_id = %self.session_id, skipped = n, "Live feed subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut watches = self.watches.lock().expect("watch map lock");
        if let Some(entry) = watches.get_mut(&self.session_id) {
            entry.subscribers -= 1;
            if entry.subscribers == 0 {
                let entry = watches.remove(&self.session_id).expect("entry present");
                entry.task.abort();
                debug!(session_id = %self.session_id, "Stopped file watch, last subscriber gone");
            }
        }
    }
}

/// State captured at subscribe time: everything up to the last complete
/// line is considered already delivered via the detail endpoint; only new
/// lines stream.
struct WatchSeed {
    offset: u64,
    messages: Vec<Message>,
}

impl WatchSeed {
    async fn read(path: &Path) -> Self {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let complete = complete_prefix_len(&bytes);
                Self {
                    offset: complete as u64,
                    messages: parse_transcript(&String::from_utf8_lossy(&bytes[..complete])),
                }
            }
            Err(_) => Self {
                offset: 0,
                messages: Vec::new(),
            },
        }
    }
}

/// The watch task: drain newly appended complete lines on filesystem events
/// (with a poll fallback) until the file disappears or the task is aborted.
async fn watch_session(
    session_id: String,
    path: PathBuf,
    seed: WatchSeed,
    tx: broadcast::Sender<LiveEvent>,
    watches: WatchMap,
) {
    let mut offset = seed.offset;
    let mut messages = seed.messages;
    let mut last_status = determine_session_status(&messages, None);

    // Filesystem events for the transcript's parent directory; watching the
    // file itself would miss recreation.
    let (event_tx, mut event_rx) = mpsc::channel::<()>(16);
    let _watcher = start_file_watcher(&path, event_tx);

    let mut tick = tokio::time::interval(FALLBACK_POLL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = event_rx.recv() => {}
            _ = tick.tick() => {}
        }

        match drain_appended(&path, &mut offset, &mut messages, &tx).await {
            Ok(()) => {
                let status = determine_session_status(&messages, None);
                if status != last_status {
                    last_status = status;
                    let _ = tx.send(LiveEvent::Status(status));
                }
            }
            Err(e) => {
                // The file is gone or unreadable: end the feed with a
                // terminal status instead of retrying forever.
                debug!(session_id = %session_id, error = %e, "Watched transcript unreadable, ending feed");
                if last_status != SessionStatus::Idle {
                    let _ = tx.send(LiveEvent::Status(SessionStatus::Idle));
                }
                break;
            }
        }
    }

    // Dropping the map entry drops the sender, which closes every
    // subscriber's feed.
    watches.lock().expect("watch map lock").remove(&session_id);
}

/// Read newly appended complete lines and emit one event per parsed message.
async fn drain_appended(
    path: &Path,
    offset: &mut u64,
    messages: &mut Vec<Message>,
    tx: &broadcast::Sender<LiveEvent>,
) -> std::io::Result<()> {
    let len = tokio::fs::metadata(path).await?.len();
    if len < *offset {
        // Truncated or replaced: start over from the top.
        *offset = 0;
        messages.clear();
    }
    if len == *offset {
        return Ok(());
    }

    let mut file = tokio::fs::File::open(path).await?;
    file.seek(std::io::SeekFrom::Start(*offset)).await?;
    let mut buf = Vec::with_capacity((len - *offset) as usize);
    file.read_to_end(&mut buf).await?;

    // Only complete lines are processed; a partial trailing line belongs to
    // a writer still appending and stays for the next pass.
    let complete = complete_prefix_len(&buf);
    if complete == 0 {
        return Ok(());
    }

    let chunk = String::from_utf8_lossy(&buf[..complete]);
    for message in parse_transcript(&chunk) {
        let _ = tx.send(LiveEvent::Message(message.clone()));
        messages.push(message);
    }
    *offset += complete as u64;
    Ok(())
}

/// Byte length of the prefix ending at the last newline.
fn complete_prefix_len(bytes: &[u8]) -> usize {
    bytes.iter().rposition(|&b| b == b'\n').map(|i| i + 1).unwrap_or(0)
}

/// Watch the file's parent directory, signalling on any event that touches
/// the file itself.
fn start_file_watcher(path: &Path, signal: mpsc::Sender<()>) -> Option<RecommendedWatcher> {
    let target = path.to_path_buf();
    let parent = path.parent()?.to_path_buf();

    let mut watcher = match notify::recommended_watcher(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if event.paths.iter().any(|p| p == &target) {
                    let _ = signal.try_send(());
                }
            }
            Err(e) => warn!(error = %e, "Transcript watcher error"),
        },
    ) {
        Ok(w) => w,
        Err(e) => {
            warn!(error = %e, "Could not create transcript watcher, falling back to polling");
            return None;
        }
    };

    if let Err(e) = watcher.watch(&parent, RecursiveMode::NonRecursive) {
        warn!(path = %parent.display(), error = %e, "Could not watch transcript directory");
        return None;
    }
    Some(watcher)
}
