//! End-to-end sessions against a mock posting service over HTTP.

use std::sync::Arc;
use std::time::Duration;

use crosspost_cards::CardBoard;
use crosspost_protocol::{PlatformRegistry, UploadStatus};
use crosspost_upload::{
    HttpTransport, MediaFile, SessionEnd, SessionPolicy, SessionState, Submission, UploadError,
    UploadGate,
};
use tokio::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

struct Harness {
    server: MockServer,
    gate: UploadGate<CardBoard>,
    board: Arc<Mutex<CardBoard>>,
    _dir: tempfile::TempDir,
    file: MediaFile,
}

impl Harness {
    async fn start() -> Self {
        let server = MockServer::start().await;
        let registry = Arc::new(PlatformRegistry::builtin());
        let board = Arc::new(Mutex::new(CardBoard::with_platforms(registry.as_slice())));
        let transport = Arc::new(HttpTransport::new(&server.uri()).unwrap());
        let gate = UploadGate::new(
            SessionState::new(),
            transport,
            registry,
            Arc::clone(&board),
            SessionPolicy {
                link_base: server.uri(),
                ..SessionPolicy::default()
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("video.mp4");
        std::fs::write(&video, vec![0u8; 4096]).unwrap();

        Self {
            server,
            gate,
            board,
            _dir: dir,
            file: MediaFile::new(video, "video/mp4"),
        }
    }

    async fn accept_uploads(&self) {
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": "Upload started"})),
            )
            .mount(&self.server)
            .await;
    }

    async fn stream_progress(&self, messages: &[&str]) {
        let body: String = messages.iter().map(|m| format!("data: {m}\n\n")).collect();
        Mock::given(method("GET"))
            .and(path("/progress"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&self.server)
            .await;
    }

    async fn requests_to(&self, route: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == route)
            .collect()
    }
}

#[tokio::test]
async fn scenario_a_progress_then_complete() {
    let h = Harness::start().await;
    h.accept_uploads().await;
    h.stream_progress(&[
        r#"{"youtube-personal": {"progress": 50, "status": "uploading"}}"#,
        r#"{"youtube-personal": {"progress": 100, "status": "success"}}"#,
        r#"{"complete": true}"#,
    ])
    .await;

    let Submission::Accepted { handle, .. } = h.gate.submit(h.file.clone()) else {
        panic!("expected accepted");
    };
    let outcome = handle.await.unwrap().unwrap();

    assert_eq!(outcome.end, SessionEnd::Completed);
    assert_eq!(outcome.succeeded, vec!["youtube-personal"]);
    assert!(!h.gate.is_in_flight());

    let board = h.board.lock().await;
    let card = board.card("youtube-personal").unwrap();
    assert_eq!(card.status_text(), "Complete");
    assert_eq!(card.percent, 100);
    assert_eq!(board.card("youtube-charity").unwrap().status_text(), "Ready");

    assert_eq!(h.requests_to("/upload").await.len(), 1);
    assert_eq!(h.requests_to("/progress").await.len(), 1);
}

#[tokio::test]
async fn scenario_b_submit_while_in_flight_is_dropped() {
    let h = Harness::start().await;
    h.accept_uploads().await;
    // A stalled server: the progress response never arrives during the test.
    Mock::given(method("GET"))
        .and(path("/progress"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3600)))
        .mount(&h.server)
        .await;

    assert!(h.gate.submit(h.file.clone()).is_accepted());
    while h.requests_to("/upload").await.is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(h.gate.is_in_flight());
    for _ in 0..3 {
        assert!(matches!(h.gate.submit(h.file.clone()), Submission::Dropped));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.requests_to("/upload").await.len(), 1);
}

#[tokio::test]
async fn scenario_c_platform_error_shows_detail_link() {
    let h = Harness::start().await;
    h.accept_uploads().await;
    h.stream_progress(&[
        r#"{"tiktok-charity": {"progress": 30, "status": "error", "error": "quota exceeded"}}"#,
        r#"{"complete": true}"#,
    ])
    .await;

    let Submission::Accepted { handle, .. } = h.gate.submit(h.file.clone()) else {
        panic!("expected accepted");
    };
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome.failed, vec!["tiktok-charity"]);

    let board = h.board.lock().await;
    let card = board.card("tiktok-charity").unwrap();
    assert_eq!(card.status, UploadStatus::Error);
    assert_eq!(card.status_text(), "Failed");
    let expected = format!("{}/platform/tiktok-charity", h.server.uri());
    assert_eq!(card.visible_error_link(), Some(expected.as_str()));
}

#[tokio::test]
async fn scenario_e_server_error_reopens_gate() {
    let h = Harness::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.server)
        .await;
    let revision = h.board.lock().await.revision();

    let Submission::Accepted { handle, .. } = h.gate.submit(h.file.clone()) else {
        panic!("expected accepted");
    };
    assert!(matches!(
        handle.await.unwrap(),
        Err(UploadError::Rejected { status: 500, .. })
    ));

    assert!(!h.gate.is_in_flight());
    assert_eq!(h.board.lock().await.revision(), revision);
    assert!(h.requests_to("/progress").await.is_empty());
}

#[tokio::test]
async fn stream_end_without_sentinel_leaves_cards_stale() {
    let h = Harness::start().await;
    h.accept_uploads().await;
    h.stream_progress(&[r#"{"instagram-personal": {"progress": 40, "status": "uploading"}}"#])
        .await;

    let Submission::Accepted { handle, .. } = h.gate.submit(h.file.clone()) else {
        panic!("expected accepted");
    };
    let outcome = handle.await.unwrap().unwrap();
    assert!(matches!(outcome.end, SessionEnd::ChannelLost(_)));
    assert!(outcome.unfinished.contains(&"instagram-personal".to_string()));
    assert!(!h.gate.is_in_flight());

    let board = h.board.lock().await;
    let card = board.card("instagram-personal").unwrap();
    assert_eq!(card.status, UploadStatus::Uploading);
    assert_eq!(card.status_text(), "40%");
}
