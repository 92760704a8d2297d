//! Data types for an upload session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crosspost_protocol::UploadStatus;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

/// A file accepted for upload, with its resolved media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub file_name: String,
    pub media_type: String,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        let path = path.into();
        let file_name = file_name_of(&path);
        Self {
            path,
            file_name,
            media_type: media_type.into(),
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".into())
}

/// Per-session tuning.
#[derive(Debug, Clone, Default)]
pub struct SessionPolicy {
    /// Ends the session if the progress channel stays silent this long.
    /// `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Prepended to `/platform/{id}` when building error links.
    pub link_base: String,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server sent the completion sentinel.
    Completed,
    /// The channel failed, ended without a sentinel, or could not be opened.
    ChannelLost(String),
    /// The idle timeout elapsed.
    TimedOut,
}

/// Summary of a finished session, in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub end: SessionEnd,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Platforms without a terminal status, left in their last state.
    pub unfinished: Vec<String>,
}

impl SessionOutcome {
    /// Completed with every platform successful.
    pub fn all_succeeded(&self) -> bool {
        self.end == SessionEnd::Completed && self.failed.is_empty() && self.unfinished.is_empty()
    }
}

/// Events emitted during a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A submission was accepted and the upload request is being sent.
    Started {
        session_id: String,
        file_name: String,
    },
    /// The upload request failed; the gate is open again.
    SubmitFailed { session_id: String, error: String },
    /// A platform's card was updated.
    PlatformUpdated {
        session_id: String,
        platform_id: String,
        percent: u8,
        status: UploadStatus,
    },
    /// The session is over; the gate is open again.
    Ended {
        session_id: String,
        outcome: SessionOutcome,
    },
}

/// Non-blocking event emitter. A lagging receiver loses events instead of
/// stalling the session.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::Sender<SessionEvent>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if let Err(TrySendError::Full(event)) = self.tx.try_send(event) {
            trace!(?event, "session event dropped, receiver lagging");
        }
    }
}
