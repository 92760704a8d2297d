//! Command implementations.

use std::io::Stdout;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use crosspost_cards::CardRenderer;
use crosspost_intake::{CandidateFile, DropFolderWatcher, FileInput, InputAdapter, IntakeOutcome};
use crosspost_protocol::PlatformRegistry;
use crosspost_upload::{
    HttpTransport, SessionEnd, SessionEvent, SessionOutcome, SessionPolicy, SessionState,
    Submission, UploadGate,
};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinError;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::terminal::TerminalCards;

type Cards = TerminalCards<Stdout>;

/// Wiring shared by the commands.
pub struct App {
    config: ClientConfig,
    registry: Arc<PlatformRegistry>,
    transport: Arc<HttpTransport>,
}

impl App {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let registry = Arc::new(config.registry().context("invalid platform list")?);
        let transport =
            Arc::new(HttpTransport::new(&config.server_url).context("invalid server URL")?);
        Ok(Self {
            config,
            registry,
            transport,
        })
    }

    fn policy(&self) -> SessionPolicy {
        SessionPolicy {
            idle_timeout: self.config.idle_timeout(),
            link_base: self.transport.base_url().to_string(),
        }
    }

    /// Renders the cards and builds a gate feeding them.
    fn gate(&self) -> UploadGate<Cards> {
        let mut cards = TerminalCards::new(std::io::stdout());
        cards.render(self.registry.as_slice());

        UploadGate::new(
            SessionState::new(),
            self.transport.clone(),
            Arc::clone(&self.registry),
            Arc::new(Mutex::new(cards)),
            self.policy(),
        )
    }

    /// `crosspost upload`: one file, one session.
    pub async fn upload(
        &self,
        path: PathBuf,
        media_type: Option<String>,
    ) -> anyhow::Result<ExitCode> {
        let adapter = InputAdapter::new(Arc::new(self.gate()));

        let mut candidate = CandidateFile::new(path);
        candidate.media_type = media_type;

        match adapter.handle(FileInput::Picked(Some(candidate))) {
            IntakeOutcome::Forwarded(Submission::Accepted { handle, .. }) => {
                match handle.await.context("session task failed")? {
                    Ok(outcome) => {
                        print_summary(&outcome);
                        Ok(exit_code(&outcome))
                    }
                    // Already logged by the gate.
                    Err(_) => Ok(ExitCode::FAILURE),
                }
            }
            IntakeOutcome::Forwarded(Submission::Dropped) => Ok(ExitCode::FAILURE),
            IntakeOutcome::Ignored(reason) => {
                info!(reason, "nothing uploaded");
                Ok(ExitCode::SUCCESS)
            }
        }
    }

    /// `crosspost watch`: uploads files arriving in the drop folder until Ctrl-C.
    pub async fn watch(&self, dir: Option<PathBuf>) -> anyhow::Result<ExitCode> {
        let Some(dir) = dir.or_else(|| self.config.drop_dir.clone()) else {
            bail!("no drop folder given and none configured");
        };
        if !dir.is_dir() {
            bail!("drop folder {} does not exist", dir.display());
        }

        let mut gate = self.gate();
        let events = gate.take_events();
        let adapter = InputAdapter::new(Arc::new(gate));
        if let Some(events) = events {
            tokio::spawn(report_sessions(events));
        }

        let watcher = DropFolderWatcher::new(&dir, self.config.drop_poll_interval());
        let cancel = watcher.cancel_token();
        let (tx, mut rx) = mpsc::channel(16);
        let task = tokio::spawn(watcher.run(tx));

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, stopping");
                    break;
                }
                candidate = rx.recv() => {
                    let Some(candidate) = candidate else { break };
                    match adapter.handle(FileInput::Dropped(vec![candidate])) {
                        IntakeOutcome::Forwarded(Submission::Dropped) => {
                            warn!("upload in progress, dropped file ignored");
                        }
                        IntakeOutcome::Forwarded(Submission::Accepted { .. })
                        | IntakeOutcome::Ignored(_) => {}
                    }
                }
            }
        }

        cancel.cancel();
        if watcher_stopped_cleanly(task.await) {
            Ok(ExitCode::SUCCESS)
        } else {
            Ok(ExitCode::FAILURE)
        }
    }

    /// `crosspost details`: fetches the error detail for a platform.
    pub async fn details(&self, platform_id: &str) -> anyhow::Result<ExitCode> {
        if !self.registry.contains(platform_id) {
            warn!(platform = %platform_id, "not a configured platform");
        }
        let message = self
            .transport
            .platform_detail(platform_id)
            .await
            .with_context(|| format!("fetching details for {platform_id}"))?;
        println!("{message}");
        Ok(ExitCode::SUCCESS)
    }

    /// `crosspost platforms`: lists the configured platforms.
    pub fn platforms(&self) -> ExitCode {
        for platform in self.registry.iter() {
            println!("{:<22} {}", platform.id, platform.display_name);
        }
        ExitCode::SUCCESS
    }
}

/// Prints a summary line for every finished session.
async fn report_sessions(mut events: mpsc::Receiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Started { file_name, .. } => println!("uploading {file_name}"),
            SessionEvent::SubmitFailed { error, .. } => println!("upload failed: {error}"),
            SessionEvent::Ended { outcome, .. } => print_summary(&outcome),
            SessionEvent::PlatformUpdated { .. } => {}
        }
    }
}

/// Logs a watcher task that panicked or was aborted.
fn watcher_stopped_cleanly(result: Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "drop folder watcher ended abnormally");
            false
        }
    }
}

fn print_summary(outcome: &SessionOutcome) {
    println!("{}", summary(outcome));
}

/// One-line session summary.
pub fn summary(outcome: &SessionOutcome) -> String {
    let end = match &outcome.end {
        SessionEnd::Completed => "done".to_string(),
        SessionEnd::ChannelLost(reason) => format!("progress lost ({reason})"),
        SessionEnd::TimedOut => "timed out".to_string(),
    };
    let mut line = format!(
        "{end}: {} succeeded, {} failed, {} unfinished",
        outcome.succeeded.len(),
        outcome.failed.len(),
        outcome.unfinished.len()
    );
    if !outcome.failed.is_empty() {
        line.push_str(&format!(" [failed: {}]", outcome.failed.join(", ")));
    }
    line
}

fn exit_code(outcome: &SessionOutcome) -> ExitCode {
    if outcome.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
