//! Progress reconciliation: push-channel messages to card updates.
//!
//! Each platform runs an independent state machine:
//! `ready → uploading → {success, error}`. Terminal states are absorbing,
//! so a late or replayed report can never move a finished card again.

use std::collections::HashMap;
use std::sync::Arc;

use crosspost_cards::{CardRenderer, CardUpdate};
use crosspost_protocol::constants::platform_detail_path;
use crosspost_protocol::{PlatformRegistry, PlatformReport, ProgressEvent, UploadStatus};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::transport::{ChannelMessage, ProgressChannel};
use crate::types::{EventSink, SessionEnd, SessionEvent, SessionOutcome, SessionPolicy};

/// Progress of one platform within the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProgress {
    pub platform_id: String,
    pub percent: u8,
    pub status: UploadStatus,
    pub error_ref: Option<String>,
}

impl PlatformProgress {
    fn ready(platform_id: &str) -> Self {
        Self {
            platform_id: platform_id.to_owned(),
            percent: 0,
            status: UploadStatus::Ready,
            error_ref: None,
        }
    }
}

/// Result of applying one report to a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First report of the session for this platform.
    Started,
    /// Still uploading, percent unchanged or higher.
    Progressed,
    /// Still uploading, percent lower than before. Accepted as received.
    Regressed,
    /// Reached `success` or `error`.
    Finished,
    /// The platform was already terminal; nothing changed.
    Ignored,
}

/// Per-session state of every platform that has reported so far.
#[derive(Debug, Default)]
pub struct PlatformTracker {
    platforms: HashMap<String, PlatformProgress>,
}

impl PlatformTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a report. `error_link` is only called for `error` reports.
    pub fn apply(
        &mut self,
        platform_id: &str,
        report: &PlatformReport,
        error_link: impl FnOnce() -> String,
    ) -> Transition {
        let entry = self
            .platforms
            .entry(platform_id.to_owned())
            .or_insert_with(|| PlatformProgress::ready(platform_id));

        if entry.status.is_terminal() {
            return Transition::Ignored;
        }

        let was_ready = entry.status == UploadStatus::Ready;
        let status = UploadStatus::from(report.status);
        let percent = report.percent();
        let regressed = !was_ready && percent < entry.percent;

        entry.percent = percent;
        entry.status = status;
        entry.error_ref = (status == UploadStatus::Error).then(error_link);

        if status.is_terminal() {
            Transition::Finished
        } else if was_ready {
            Transition::Started
        } else if regressed {
            Transition::Regressed
        } else {
            Transition::Progressed
        }
    }

    pub fn get(&self, platform_id: &str) -> Option<&PlatformProgress> {
        self.platforms.get(platform_id)
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Sorts every registered platform into succeeded / failed / unfinished.
    pub fn outcome(&self, registry: &PlatformRegistry, end: SessionEnd) -> SessionOutcome {
        let mut outcome = SessionOutcome {
            end,
            succeeded: Vec::new(),
            failed: Vec::new(),
            unfinished: Vec::new(),
        };
        for platform in registry.iter() {
            let status = self
                .platforms
                .get(&platform.id)
                .map(|p| p.status)
                .unwrap_or_default();
            let bucket = match status {
                UploadStatus::Success => &mut outcome.succeeded,
                UploadStatus::Error => &mut outcome.failed,
                UploadStatus::Ready | UploadStatus::Uploading => &mut outcome.unfinished,
            };
            bucket.push(platform.id.clone());
        }
        outcome
    }
}

/// Consumes one progress channel and projects it onto the cards.
pub struct Reconciler<R> {
    registry: Arc<PlatformRegistry>,
    renderer: Arc<Mutex<R>>,
    policy: SessionPolicy,
    events: Option<EventSink>,
}

impl<R: CardRenderer> Reconciler<R> {
    pub fn new(
        registry: Arc<PlatformRegistry>,
        renderer: Arc<Mutex<R>>,
        policy: SessionPolicy,
    ) -> Self {
        Self {
            registry,
            renderer,
            policy,
            events: None,
        }
    }

    pub(crate) fn with_events(mut self, events: EventSink) -> Self {
        self.events = Some(events);
        self
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Runs the reconciliation loop until the sentinel, a channel failure,
    /// or the idle timeout. The channel is closed on return.
    pub async fn run(&self, session_id: &str, mut channel: ProgressChannel) -> SessionOutcome {
        let mut tracker = PlatformTracker::new();

        let end = loop {
            let next = match self.policy.idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, channel.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(session = %session_id, ?limit, "progress channel idle, giving up");
                        break SessionEnd::TimedOut;
                    }
                },
                None => channel.recv().await,
            };

            match next {
                Some(ChannelMessage::Event(event)) => {
                    self.apply_event(session_id, &mut tracker, &event).await;
                    if event.complete {
                        break SessionEnd::Completed;
                    }
                }
                Some(ChannelMessage::Malformed { data, reason }) => {
                    warn!(
                        session = %session_id,
                        %reason,
                        %data,
                        "skipping malformed progress message"
                    );
                }
                Some(ChannelMessage::Failed(reason)) => {
                    warn!(session = %session_id, %reason, "progress channel failed");
                    break SessionEnd::ChannelLost(reason);
                }
                None => {
                    warn!(session = %session_id, "progress channel closed by transport");
                    break SessionEnd::ChannelLost("progress channel closed".into());
                }
            }
        };

        channel.close();

        let outcome = tracker.outcome(&self.registry, end);
        info!(
            session = %session_id,
            end = ?outcome.end,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            unfinished = outcome.unfinished.len(),
            "progress tracking finished"
        );
        outcome
    }

    /// Outcome for a session whose channel never opened.
    pub fn abandoned(&self, end: SessionEnd) -> SessionOutcome {
        PlatformTracker::new().outcome(&self.registry, end)
    }

    async fn apply_event(
        &self,
        session_id: &str,
        tracker: &mut PlatformTracker,
        event: &ProgressEvent,
    ) {
        for (platform_id, reason) in &event.rejected {
            warn!(
                session = %session_id,
                platform = %platform_id,
                %reason,
                "skipping undecodable report"
            );
        }
        if event.reports.is_empty() {
            return;
        }

        let mut renderer = self.renderer.lock().await;

        for (platform_id, report) in &event.reports {
            if !self.registry.contains(platform_id) {
                warn!(
                    session = %session_id,
                    platform = %platform_id,
                    "report for unknown platform ignored"
                );
                continue;
            }

            let transition = tracker.apply(platform_id, report, || self.error_link(platform_id));
            match transition {
                Transition::Ignored => {
                    debug!(
                        session = %session_id,
                        platform = %platform_id,
                        "report after terminal status ignored"
                    );
                    continue;
                }
                Transition::Regressed => {
                    debug!(
                        session = %session_id,
                        platform = %platform_id,
                        percent = report.percent(),
                        "progress went backwards"
                    );
                }
                _ => {}
            }

            let Some(progress) = tracker.get(platform_id) else {
                continue;
            };

            let mut update =
                CardUpdate::new(platform_id.clone(), progress.percent, progress.status);
            if let Some(link) = &progress.error_ref {
                update = update.with_error(link.clone(), report.error.clone());
                warn!(
                    session = %session_id,
                    platform = %platform_id,
                    error = report.error.as_deref().unwrap_or(""),
                    "platform upload failed"
                );
            } else {
                debug!(
                    session = %session_id,
                    platform = %platform_id,
                    percent = progress.percent,
                    status = ?progress.status,
                    "platform progress"
                );
            }

            renderer.update(&update);

            if let Some(events) = &self.events {
                events.emit(SessionEvent::PlatformUpdated {
                    session_id: session_id.to_owned(),
                    platform_id: platform_id.clone(),
                    percent: progress.percent,
                    status: progress.status,
                });
            }
        }
    }

    fn error_link(&self, platform_id: &str) -> String {
        format!("{}{}", self.policy.link_base, platform_detail_path(platform_id))
    }
}
