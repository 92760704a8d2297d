//! Upload gate and progress reconciliation.
//!
//! This crate implements the **client-side session logic** of the posting
//! service. It has no UI dependency: the front end supplies a
//! [`CardRenderer`](crosspost_cards::CardRenderer) and, in production, the
//! [`HttpTransport`]; tests plug in their own [`UploadTransport`].
//!
//! # Session
//!
//! 1. **Gate**: [`UploadGate::submit`] takes the single-flight guard or
//!    drops the submission
//! 2. **Upload**: one multipart `POST /upload`
//! 3. **Progress**: one `GET /progress` push channel
//! 4. **Reconcile**: per-platform state machine feeding the cards
//! 5. **Release**: completion sentinel, channel failure or idle timeout
//!    ends the session and reopens the gate

pub mod error;
pub mod gate;
pub mod http;
pub mod reconciler;
pub mod session;
pub mod transport;
pub mod types;

// Re-export primary types for convenience.
pub use error::UploadError;
pub use gate::{Submission, UploadGate};
pub use http::HttpTransport;
pub use reconciler::{PlatformProgress, PlatformTracker, Reconciler, Transition};
pub use session::{InFlight, SessionState};
pub use transport::{
    ChannelMessage, ProgressChannel, ProgressSender, TransportFuture, UploadTransport,
    progress_channel,
};
pub use types::{MediaFile, SessionEnd, SessionEvent, SessionOutcome, SessionPolicy};
