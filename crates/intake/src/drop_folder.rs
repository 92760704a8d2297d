//! Drop folder: a watched directory whose new files count as drops.
//!
//! Polls the directory on an interval. Files already present at start are
//! skipped; a new file is emitted once its size is unchanged across two
//! polls, so files still being copied in are not picked up half-written.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::adapter::CandidateFile;

/// Default interval between directory polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Directory scan state.
#[derive(Debug)]
pub struct DropScan {
    dir: PathBuf,
    seen: HashSet<PathBuf>,
    /// New files waiting to settle: path → size at last poll.
    pending: HashMap<PathBuf, u64>,
}

impl DropScan {
    /// Starts a scan, marking every file already in `dir` as seen.
    ///
    /// Files that disappear are forgotten, so a file re-created under the
    /// same name counts as a new drop.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let seen = list_files(&dir).into_keys().collect();
        Self {
            dir,
            seen,
            pending: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// One poll. Returns files that became stable since the previous poll,
    /// sorted by path.
    pub fn poll(&mut self) -> Vec<PathBuf> {
        let current = list_files(&self.dir);
        self.seen.retain(|path| current.contains_key(path));
        self.pending.retain(|path, _| current.contains_key(path));

        let mut ready = Vec::new();
        for (path, size) in current {
            if self.seen.contains(&path) {
                continue;
            }
            match self.pending.insert(path.clone(), size) {
                Some(previous) if previous == size => {
                    self.pending.remove(&path);
                    self.seen.insert(path.clone());
                    ready.push(path);
                }
                _ => {}
            }
        }
        ready.sort();
        ready
    }
}

/// Regular, non-hidden files in `dir` with their sizes.
fn list_files(dir: &Path) -> HashMap<PathBuf, u64> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return HashMap::new();
    };

    entries
        .flatten()
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| {
            let meta = e.metadata().ok()?;
            meta.is_file().then(|| (e.path(), meta.len()))
        })
        .collect()
}

/// Watches a drop folder and forwards settled files as candidates.
pub struct DropFolderWatcher {
    dir: PathBuf,
    interval: Duration,
    cancel: CancellationToken,
}

impl DropFolderWatcher {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops [`run`](Self::run).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Polls until cancelled or the receiver is dropped.
    pub async fn run(self, tx: mpsc::Sender<CandidateFile>) {
        if !self.dir.is_dir() {
            tracing::warn!(dir = %self.dir.display(), "drop folder does not exist");
        }

        let mut scan = DropScan::new(&self.dir);
        let mut poll_interval = tokio::time::interval(self.interval);
        poll_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(dir = %self.dir.display(), "watching drop folder");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = poll_interval.tick() => {
                    for path in scan.poll() {
                        tracing::debug!(file = %path.display(), "file dropped");
                        if tx.send(CandidateFile::new(path)).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }

        tracing::debug!(dir = %self.dir.display(), "drop folder watcher stopped");
    }
}
