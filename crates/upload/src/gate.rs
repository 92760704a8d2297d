//! Single-flight upload gate.
//!
//! Accepts at most one upload session at a time. A submission made while a
//! session is in flight is dropped without a request or an error.

use std::sync::Arc;

use crosspost_cards::CardRenderer;
use crosspost_protocol::PlatformRegistry;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::UploadError;
use crate::reconciler::Reconciler;
use crate::session::{InFlight, SessionState};
use crate::transport::UploadTransport;
use crate::types::{EventSink, MediaFile, SessionEnd, SessionEvent, SessionOutcome, SessionPolicy};

/// Result of [`UploadGate::submit`].
#[derive(Debug)]
pub enum Submission {
    /// A session was started for the file.
    Accepted {
        session_id: String,
        handle: JoinHandle<Result<SessionOutcome, UploadError>>,
    },
    /// A session was already in flight; the file was discarded.
    Dropped,
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted { .. })
    }
}

/// Entry point for file submissions.
pub struct UploadGate<R> {
    session: Arc<SessionState>,
    transport: Arc<dyn UploadTransport>,
    reconciler: Arc<Reconciler<R>>,
    events_rx: Option<mpsc::Receiver<SessionEvent>>,
    events: EventSink,
}

impl<R: CardRenderer + 'static> UploadGate<R> {
    pub fn new(
        session: Arc<SessionState>,
        transport: Arc<dyn UploadTransport>,
        registry: Arc<PlatformRegistry>,
        renderer: Arc<Mutex<R>>,
        policy: SessionPolicy,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        let events = EventSink::new(events_tx);
        let reconciler = Reconciler::new(registry, renderer, policy).with_events(events.clone());

        Self {
            session,
            transport,
            reconciler: Arc::new(reconciler),
            events_rx: Some(events_rx),
            events,
        }
    }

    /// Takes the session event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.events_rx.take()
    }

    pub fn is_in_flight(&self) -> bool {
        self.session.is_in_flight()
    }

    /// Submits a file. Starts a session unless one is already in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, file: MediaFile) -> Submission {
        let Some(guard) = self.session.try_begin() else {
            debug!(file = %file.file_name, "upload in flight, submission dropped");
            return Submission::Dropped;
        };

        let session_id = uuid::Uuid::new_v4().to_string();
        let handle = tokio::spawn(run_session(
            session_id.clone(),
            guard,
            file,
            Arc::clone(&self.transport),
            Arc::clone(&self.reconciler),
            self.events.clone(),
        ));

        Submission::Accepted { session_id, handle }
    }
}

async fn run_session<R: CardRenderer>(
    session_id: String,
    guard: InFlight,
    file: MediaFile,
    transport: Arc<dyn UploadTransport>,
    reconciler: Arc<Reconciler<R>>,
    events: EventSink,
) -> Result<SessionOutcome, UploadError> {
    info!(
        session = %session_id,
        file = %file.file_name,
        media_type = %file.media_type,
        "upload started"
    );
    events.emit(SessionEvent::Started {
        session_id: session_id.clone(),
        file_name: file.file_name.clone(),
    });

    if let Err(e) = transport.upload(&file).await {
        error!(session = %session_id, error = %e, "upload failed");
        guard.end();
        events.emit(SessionEvent::SubmitFailed {
            session_id,
            error: e.to_string(),
        });
        return Err(e);
    }

    let outcome = match transport.open_progress().await {
        Ok(channel) => reconciler.run(&session_id, channel).await,
        Err(e) => {
            error!(session = %session_id, error = %e, "could not open progress channel");
            reconciler.abandoned(SessionEnd::ChannelLost(e.to_string()))
        }
    };

    guard.end();
    info!(session = %session_id, end = ?outcome.end, "session ended");
    events.emit(SessionEvent::Ended {
        session_id,
        outcome: outcome.clone(),
    });

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::transport::{
        ChannelMessage, ProgressChannel, ProgressSender, TransportFuture, progress_channel,
    };
    use crosspost_cards::CardBoard;
    use crosspost_protocol::{ProgressEvent, UploadStatus};

    /// In-memory transport. Each opened channel's sender is parked in
    /// `senders` so the test drives the stream.
    #[derive(Default)]
    struct MockTransport {
        uploads: AtomicUsize,
        opens: AtomicUsize,
        fail_upload: bool,
        fail_open: bool,
        senders: std::sync::Mutex<Vec<ProgressSender>>,
    }

    impl MockTransport {
        fn sender(&self, i: usize) -> ProgressSender {
            self.senders.lock().unwrap()[i].clone()
        }
    }

    impl UploadTransport for MockTransport {
        fn upload<'a>(&'a self, _file: &'a MediaFile) -> TransportFuture<'a, ()> {
            Box::pin(async move {
                self.uploads.fetch_add(1, Ordering::SeqCst);
                if self.fail_upload {
                    return Err(UploadError::Rejected {
                        status: 500,
                        body: "boom".into(),
                    });
                }
                Ok(())
            })
        }

        fn open_progress(&self) -> TransportFuture<'_, ProgressChannel> {
            Box::pin(async move {
                self.opens.fetch_add(1, Ordering::SeqCst);
                if self.fail_open {
                    return Err(UploadError::Transport("refused".into()));
                }
                let (tx, rx) = progress_channel();
                self.senders.lock().unwrap().push(tx);
                Ok(rx)
            })
        }
    }

    fn gate(transport: Arc<MockTransport>) -> (UploadGate<CardBoard>, Arc<Mutex<CardBoard>>) {
        gate_with_policy(transport, SessionPolicy::default())
    }

    fn gate_with_policy(
        transport: Arc<MockTransport>,
        policy: SessionPolicy,
    ) -> (UploadGate<CardBoard>, Arc<Mutex<CardBoard>>) {
        let registry = Arc::new(PlatformRegistry::builtin());
        let board = Arc::new(Mutex::new(CardBoard::with_platforms(registry.as_slice())));
        let gate = UploadGate::new(
            SessionState::new(),
            transport,
            registry,
            Arc::clone(&board),
            policy,
        );
        (gate, board)
    }

    fn clip() -> MediaFile {
        MediaFile::new("/tmp/clip.mp4", "video/mp4")
    }

    async fn wait_for_channel(transport: &MockTransport, count: usize) {
        while transport.senders.lock().unwrap().len() < count {
            tokio::task::yield_now().await;
        }
    }

    fn event(json: &str) -> ChannelMessage {
        ChannelMessage::Event(ProgressEvent::parse(json).unwrap())
    }

    #[tokio::test]
    async fn second_submit_is_dropped_while_stalled() {
        let transport = Arc::new(MockTransport::default());
        let (gate, board) = gate(Arc::clone(&transport));

        let first = gate.submit(clip());
        assert!(first.is_accepted());
        wait_for_channel(&transport, 1).await;

        let sender = transport.sender(0);
        sender
            .send(event(r#"{"youtube-personal": {"progress": 20, "status": "uploading"}}"#))
            .await;

        assert!(gate.is_in_flight());
        assert!(matches!(gate.submit(clip()), Submission::Dropped));
        assert_eq!(transport.uploads.load(Ordering::SeqCst), 1);
        assert_eq!(transport.opens.load(Ordering::SeqCst), 1);

        sender.send(ChannelMessage::Event(ProgressEvent::complete())).await;
        let Submission::Accepted { handle, .. } = first else {
            unreachable!()
        };
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.end, SessionEnd::Completed);
        assert_eq!(
            board.lock().await.card("youtube-personal").unwrap().percent,
            20
        );
        assert!(!gate.is_in_flight());
    }

    #[tokio::test]
    async fn upload_failure_reopens_gate_and_leaves_cards() {
        let transport = Arc::new(MockTransport {
            fail_upload: true,
            ..MockTransport::default()
        });
        let (mut gate, board) = gate(Arc::clone(&transport));
        let mut events = gate.take_events().unwrap();
        let revision = board.lock().await.revision();

        let Submission::Accepted { session_id, handle } = gate.submit(clip()) else {
            panic!("expected accepted");
        };
        assert!(matches!(
            handle.await.unwrap(),
            Err(UploadError::Rejected { status: 500, .. })
        ));

        assert!(!gate.is_in_flight());
        assert_eq!(transport.opens.load(Ordering::SeqCst), 0);
        assert_eq!(board.lock().await.revision(), revision);

        assert!(matches!(events.recv().await, Some(SessionEvent::Started { .. })));
        match events.recv().await {
            Some(SessionEvent::SubmitFailed { session_id: id, .. }) => assert_eq!(id, session_id),
            other => panic!("unexpected event: {other:?}"),
        }

        // The gate accepts a new submission afterwards.
        assert!(gate.submit(clip()).is_accepted());
    }

    #[tokio::test]
    async fn open_failure_ends_session_as_channel_lost() {
        let transport = Arc::new(MockTransport {
            fail_open: true,
            ..MockTransport::default()
        });
        let (gate, _board) = gate(Arc::clone(&transport));

        let Submission::Accepted { handle, .. } = gate.submit(clip()) else {
            panic!("expected accepted");
        };
        let outcome = handle.await.unwrap().unwrap();
        assert!(matches!(outcome.end, SessionEnd::ChannelLost(_)));
        assert_eq!(outcome.unfinished.len(), 6);
        assert!(!gate.is_in_flight());
    }

    #[tokio::test]
    async fn gate_reopens_after_complete() {
        let transport = Arc::new(MockTransport::default());
        let (mut gate, board) = gate(Arc::clone(&transport));
        let mut events = gate.take_events().unwrap();
        assert!(gate.take_events().is_none());

        let Submission::Accepted { handle, .. } = gate.submit(clip()) else {
            panic!("expected accepted");
        };
        wait_for_channel(&transport, 1).await;
        transport
            .sender(0)
            .send(event(
                r#"{"instagram-charity": {"progress": 100, "status": "success"}, "complete": true}"#,
            ))
            .await;

        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.succeeded, vec!["instagram-charity"]);
        assert!(transport.sender(0).is_closed());
        assert_eq!(
            board.lock().await.card("instagram-charity").unwrap().status,
            UploadStatus::Success
        );

        let mut seen = Vec::new();
        while let Ok(e) = events.try_recv() {
            seen.push(e);
        }
        assert!(matches!(seen.first(), Some(SessionEvent::Started { .. })));
        assert!(matches!(seen.last(), Some(SessionEvent::Ended { .. })));

        // Second session opens its own channel.
        assert!(gate.submit(clip()).is_accepted());
        wait_for_channel(&transport, 2).await;
        assert_eq!(transport.uploads.load(Ordering::SeqCst), 2);
        assert_eq!(transport.opens.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_reopens_gate() {
        let transport = Arc::new(MockTransport::default());
        let (gate, _board) = gate_with_policy(
            Arc::clone(&transport),
            SessionPolicy {
                idle_timeout: Some(std::time::Duration::from_secs(30)),
                ..SessionPolicy::default()
            },
        );

        let Submission::Accepted { handle, .. } = gate.submit(clip()) else {
            panic!("expected accepted");
        };
        wait_for_channel(&transport, 1).await;
        assert!(gate.is_in_flight());

        // The server never sends anything; paused time runs the timeout out.
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.end, SessionEnd::TimedOut);
        assert!(transport.sender(0).is_closed());
        assert!(!gate.is_in_flight());

        assert!(gate.submit(clip()).is_accepted());
        wait_for_channel(&transport, 2).await;
        assert_eq!(transport.uploads.load(Ordering::SeqCst), 2);
    }
}
