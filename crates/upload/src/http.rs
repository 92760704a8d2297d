//! HTTP transport for the posting service.
//!
//! Async client using `reqwest`: multipart upload, `text/event-stream`
//! progress channel decoded with `eventsource-stream`.

use std::fmt::Display;

use crosspost_protocol::ProgressEvent;
use crosspost_protocol::constants::{
    EVENT_STREAM_CONTENT_TYPE, PROGRESS_PATH, UPLOAD_FIELD, UPLOAD_PATH, platform_detail_path,
};
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use tokio_util::io::ReaderStream;
use tracing::{debug, trace, warn};

use crate::error::UploadError;
use crate::transport::{
    ChannelMessage, ProgressChannel, ProgressSender, TransportFuture, UploadTransport,
    progress_channel,
};
use crate::types::MediaFile;

/// Transport talking to the posting service over HTTP.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for the service at `base_url` (`http://` or `https://`).
    pub fn new(base_url: &str) -> Result<Self, UploadError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(UploadError::InvalidUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("crosspost/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Streams the file to `POST /upload` as the `file` multipart field.
    pub async fn post_file(&self, file: &MediaFile) -> Result<(), UploadError> {
        let handle = tokio::fs::File::open(&file.path).await?;
        let len = handle.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(handle));

        let part = Part::stream_with_length(body, len)
            .file_name(file.file_name.clone())
            .mime_str(&file.media_type)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        debug!(file = %file.file_name, bytes = len, "posting upload");
        let resp = self
            .http
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// Opens `GET /progress` and spawns the pump feeding the returned channel.
    pub async fn connect_progress(&self) -> Result<ProgressChannel, UploadError> {
        let resp = self
            .http
            .get(self.url(PROGRESS_PATH))
            .header(ACCEPT, EVENT_STREAM_CONTENT_TYPE)
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let (sender, channel) = progress_channel();
        let events = resp.bytes_stream().eventsource();
        tokio::spawn(read_pump(events, sender));

        Ok(channel)
    }

    /// Fetches the error detail message for a platform.
    pub async fn platform_detail(&self, platform_id: &str) -> Result<String, UploadError> {
        let resp = self
            .http
            .get(self.url(&platform_detail_path(platform_id)))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned));
        Ok(message.unwrap_or(body))
    }
}

impl UploadTransport for HttpTransport {
    fn upload<'a>(&'a self, file: &'a MediaFile) -> TransportFuture<'a, ()> {
        Box::pin(self.post_file(file))
    }

    fn open_progress(&self) -> TransportFuture<'_, ProgressChannel> {
        Box::pin(self.connect_progress())
    }
}

/// Reads event-stream messages and forwards them until the stream ends,
/// fails, or the consumer closes the channel.
async fn read_pump<S, E>(events: S, sender: ProgressSender)
where
    S: Stream<Item = Result<Event, EventStreamError<E>>>,
    E: Display,
{
    tokio::pin!(events);

    loop {
        tokio::select! {
            () = sender.closed() => {
                debug!("progress channel closed by consumer");
                break;
            }

            next = events.next() => {
                let msg = match next {
                    Some(Ok(event)) => match decode_event(&event.data) {
                        Some(msg) => msg,
                        None => continue,
                    },
                    Some(Err(e)) => {
                        warn!("event stream error: {e}");
                        ChannelMessage::Failed(format!("event stream error: {e}"))
                    }
                    None => {
                        debug!("event stream ended");
                        ChannelMessage::Failed("event stream ended".into())
                    }
                };

                let fatal = matches!(msg, ChannelMessage::Failed(_));
                if !sender.send(msg).await || fatal {
                    break;
                }
            }
        }
    }
}

/// Decodes one event-stream message. Empty keep-alive messages yield `None`.
fn decode_event(data: &str) -> Option<ChannelMessage> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }
    trace!(len = data.len(), "progress message");

    Some(match ProgressEvent::parse(data) {
        Ok(event) => ChannelMessage::Event(event),
        Err(e) => ChannelMessage::Malformed {
            data: data.to_string(),
            reason: e.to_string(),
        },
    })
}
