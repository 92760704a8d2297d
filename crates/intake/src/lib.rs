//! File intake for the upload gate.
//!
//! Turns dropped or picked files into [`MediaFile`](crosspost_upload::MediaFile)
//! submissions. Only `video/*` files reach the gate; everything else is
//! ignored without feedback.

pub mod adapter;
pub mod drop_folder;
pub mod media;

pub use adapter::{CandidateFile, FileInput, InputAdapter, IntakeOutcome};
pub use drop_folder::{DEFAULT_POLL_INTERVAL, DropFolderWatcher, DropScan};
pub use media::{detect_media_type, is_video};
