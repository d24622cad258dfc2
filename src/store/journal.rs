//! Journal-backed event store
//!
//! Every event is appended to a JSON lines file and synced to disk before the
//! append is acknowledged. On open the journal is replayed into an in-memory
//! index, skipping expired records and lines that fail to parse (a crash can
//! leave a torn final line). Purging expired events rewrites the journal so
//! the file does not grow past the retention window.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use super::memory::MemoryEventStore;
use super::{EventStore, Result};
use crate::event::{Event, NewEvent};
use crate::registry::ChannelId;

/// Event store persisted to an append-only journal file
#[derive(Debug)]
pub struct JournalEventStore {
    /// Query index, mirrors the journal contents
    index: MemoryEventStore,
    /// Append handle; the lock also serializes timestamp assignment
    file: Mutex<File>,
    path: PathBuf,
}

impl JournalEventStore {
    /// Open (or create) a journal and replay its unexpired events
    pub async fn open(path: impl AsRef<Path>, retention: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let index = MemoryEventStore::with_retention(retention);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let (replayed, skipped) = match File::open(&path).await {
            Ok(file) => replay(file, &index).await?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (0, 0),
            Err(e) => return Err(e.into()),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        tracing::info!(
            path = %path.display(),
            replayed = replayed,
            skipped = skipped,
            "Journal opened"
        );

        Ok(Self {
            index,
            file: Mutex::new(file),
            path,
        })
    }

    /// Path of the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of events currently indexed
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the store holds no events
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Rewrite the journal with only the events still in the index
    async fn compact(&self, file: &mut File) -> Result<()> {
        let tmp_path = self.path.with_extension("compact");
        let mut tmp = File::create(&tmp_path).await?;

        for event in self.index.events() {
            tmp.write_all(&encode_line(&event)?).await?;
        }
        tmp.sync_all().await?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path).await?;
        *file = OpenOptions::new().append(true).open(&self.path).await?;

        Ok(())
    }
}

/// Replay journal lines into the index, returning (replayed, skipped)
async fn replay(file: File, index: &MemoryEventStore) -> Result<(usize, usize)> {
    let now = Utc::now();
    let mut lines = BufReader::new(file).lines();
    let (mut replayed, mut skipped) = (0, 0);

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Event>(&line) {
            Ok(event) if index.is_expired(event.received_at, now) => skipped += 1,
            Ok(event) => {
                index.insert(Arc::new(event));
                replayed += 1;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable journal line");
                skipped += 1;
            }
        }
    }

    Ok((replayed, skipped))
}

fn encode_line(event: &Event) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(line)
}

#[async_trait]
impl EventStore for JournalEventStore {
    async fn append(&self, new: NewEvent) -> Result<Arc<Event>> {
        let mut file = self.file.lock().await;

        let received_at = self.index.next_received_at(&new.channel, Utc::now());
        let event = new.into_event(received_at);

        file.write_all(&encode_line(&event)?).await?;
        file.sync_data().await?;

        let event = Arc::new(event);
        self.index.insert(Arc::clone(&event));

        Ok(event)
    }

    async fn history(&self, channel: &ChannelId, limit: usize) -> Result<Vec<Arc<Event>>> {
        Ok(self.index.history_at(channel, limit, Utc::now()))
    }

    async fn purge_expired(&self) -> Result<usize> {
        let mut file = self.file.lock().await;

        let removed = self.index.purge_at(Utc::now());
        if removed > 0 {
            self.compact(&mut file).await?;
            tracing::debug!(removed = removed, path = %self.path.display(), "Journal compacted");
        }

        Ok(removed)
    }

    fn name(&self) -> &'static str {
        "journal"
    }
}
