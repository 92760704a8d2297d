//! Transport seam and the progress channel abstraction.
//!
//! `UploadTransport` is implemented by [`HttpTransport`](crate::HttpTransport)
//! for the real service. Keeping it a trait keeps the gate and the
//! reconciler testable with in-memory transports.

use std::future::Future;
use std::pin::Pin;

use crosspost_protocol::ProgressEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::UploadError;
use crate::types::MediaFile;

/// Buffered messages between the transport pump and the reconciler.
const CHANNEL_CAPACITY: usize = 64;

/// Boxed future returned by [`UploadTransport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, UploadError>> + Send + 'a>>;

/// Abstract connection to the posting service.
pub trait UploadTransport: Send + Sync {
    /// Sends the file. Resolves once the server accepted (2xx) or refused it.
    fn upload<'a>(&'a self, file: &'a MediaFile) -> TransportFuture<'a, ()>;

    /// Opens the server-push progress channel.
    fn open_progress(&self) -> TransportFuture<'_, ProgressChannel>;
}

/// One message delivered by the progress channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelMessage {
    /// A decoded progress batch.
    Event(ProgressEvent),
    /// A message that could not be decoded. The channel stays open.
    Malformed { data: String, reason: String },
    /// The channel failed. Nothing follows.
    Failed(String),
}

/// Creates a connected sender/receiver pair.
pub fn progress_channel() -> (ProgressSender, ProgressChannel) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let cancel = CancellationToken::new();
    (
        ProgressSender {
            tx,
            cancel: cancel.clone(),
        },
        ProgressChannel { rx, cancel },
    )
}

/// Receiving end, owned by the reconciler.
///
/// Closing (or dropping) it cancels the producing side.
#[derive(Debug)]
pub struct ProgressChannel {
    rx: mpsc::Receiver<ChannelMessage>,
    cancel: CancellationToken,
}

impl ProgressChannel {
    /// Next message in arrival order. `None` once the producer is gone.
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        self.rx.recv().await
    }

    pub fn close(&mut self) {
        self.cancel.cancel();
        self.rx.close();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for ProgressChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Producing end, owned by the transport's read pump.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<ChannelMessage>,
    cancel: CancellationToken,
}

impl ProgressSender {
    /// Delivers a message. Returns `false` if the channel was closed.
    pub async fn send(&self, msg: ChannelMessage) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(msg).await.is_ok()
    }

    /// Resolves when the consumer closes the channel.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
