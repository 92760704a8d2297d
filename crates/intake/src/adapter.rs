//! Drag/drop and file-picker adapter.

use std::path::PathBuf;
use std::sync::Arc;

use crosspost_cards::CardRenderer;
use crosspost_upload::{Submission, UploadGate};
use tracing::debug;

use crate::media;

/// A file offered by the user, with the media type the source reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub media_type: Option<String>,
}

impl CandidateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// Raw user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileInput {
    /// Files dropped onto the drop zone. Only the first one counts.
    Dropped(Vec<CandidateFile>),
    /// Result of the file picker; `None` if the user cancelled.
    Picked(Option<CandidateFile>),
}

impl FileInput {
    /// The single candidate this input resolves to.
    pub fn select(self) -> Option<CandidateFile> {
        match self {
            FileInput::Dropped(files) => files.into_iter().next(),
            FileInput::Picked(file) => file,
        }
    }
}

/// What happened to an input.
#[derive(Debug)]
pub enum IntakeOutcome {
    /// Handed to the gate. The gate may still have dropped it.
    Forwarded(Submission),
    /// Not a video, no file, or no resolvable type. Nothing was sent.
    Ignored(&'static str),
}

/// Forwards qualifying inputs to the upload gate.
pub struct InputAdapter<R> {
    gate: Arc<UploadGate<R>>,
}

impl<R> Clone for InputAdapter<R> {
    fn clone(&self) -> Self {
        Self {
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<R: CardRenderer + 'static> InputAdapter<R> {
    pub fn new(gate: Arc<UploadGate<R>>) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &Arc<UploadGate<R>> {
        &self.gate
    }

    /// Handles one drop or pick.
    pub fn handle(&self, input: FileInput) -> IntakeOutcome {
        let Some(candidate) = input.select() else {
            debug!("no file selected");
            return IntakeOutcome::Ignored("no file");
        };

        match media::resolve(&candidate.path, candidate.media_type.as_deref()) {
            Some(file) => IntakeOutcome::Forwarded(self.gate.submit(file)),
            None => {
                debug!(
                    path = %candidate.path.display(),
                    media_type = candidate.media_type.as_deref().unwrap_or("unknown"),
                    "not a video, ignored"
                );
                IntakeOutcome::Ignored("not a video")
            }
        }
    }
}
