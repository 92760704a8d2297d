//! Wire protocol types for the crosspost upload client.
//!
//! Covers the three HTTP endpoints of the posting service (upload, progress
//! push channel, per-platform error detail), the JSON payloads carried on
//! the push channel, and the static registry of target platforms.

pub mod constants;
pub mod messages;
pub mod platform;

// Re-export primary types for convenience.
pub use messages::{PlatformReport, ProgressEvent, ProtocolError, ReportedStatus, UploadStatus};
pub use platform::{Platform, PlatformRegistry, RegistryError};
