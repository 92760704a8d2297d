use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{COMPLETE_KEY, MAX_PERCENT};

/// Errors decoding a progress channel message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("progress message is not a JSON object")]
    NotAnObject,
}

/// Status of a platform as displayed on its card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// No event received yet in this session.
    #[default]
    Ready,
    Uploading,
    Success,
    Error,
}

impl UploadStatus {
    /// `success` and `error` are absorbing.
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadStatus::Success | UploadStatus::Error)
    }
}

/// Status carried by a platform report on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportedStatus {
    Uploading,
    Success,
    Error,
}

impl From<ReportedStatus> for UploadStatus {
    fn from(status: ReportedStatus) -> Self {
        match status {
            ReportedStatus::Uploading => UploadStatus::Uploading,
            ReportedStatus::Success => UploadStatus::Success,
            ReportedStatus::Error => UploadStatus::Error,
        }
    }
}

/// Progress of one platform inside a progress message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformReport {
    #[serde(default)]
    pub progress: f64,
    pub status: ReportedStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlatformReport {
    /// Reported progress rounded and clamped into `0..=100`.
    pub fn percent(&self) -> u8 {
        if !self.progress.is_finite() {
            return 0;
        }
        self.progress.round().clamp(0.0, f64::from(MAX_PERCENT)) as u8
    }
}

/// One decoded push-channel message.
///
/// A message carries any number of platform reports and, optionally, the
/// completion sentinel. Reports are kept sorted by platform id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressEvent {
    pub reports: BTreeMap<String, PlatformReport>,
    pub complete: bool,
    /// Entries that did not decode as a report: `(platform id, reason)`.
    pub rejected: Vec<(String, String)>,
}

impl ProgressEvent {
    /// Creates the bare completion sentinel.
    pub fn complete() -> Self {
        Self {
            reports: BTreeMap::new(),
            complete: true,
            rejected: Vec::new(),
        }
    }

    /// Parses the `data` payload of one event-stream message.
    ///
    /// `{"complete": true}` sets the sentinel; every other key is a platform
    /// id mapped to a [`PlatformReport`]. A `complete` key with any value
    /// other than `true` is discarded. Entries that fail to decode land in
    /// `rejected` without affecting the others.
    pub fn parse(data: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(data)?;
        let serde_json::Value::Object(mut map) = value else {
            return Err(ProtocolError::NotAnObject);
        };

        let complete = matches!(map.remove(COMPLETE_KEY), Some(serde_json::Value::Bool(true)));

        let mut reports = BTreeMap::new();
        let mut rejected = Vec::new();
        for (platform, raw) in map {
            match serde_json::from_value::<PlatformReport>(raw) {
                Ok(report) => {
                    reports.insert(platform, report);
                }
                Err(e) => rejected.push((platform, e.to_string())),
            }
        }

        Ok(Self {
            reports,
            complete,
            rejected,
        })
    }

    /// Serializes the message back to its wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut map = serde_json::Map::new();
        for (platform, report) in &self.reports {
            map.insert(platform.clone(), serde_json::to_value(report)?);
        }
        if self.complete {
            map.insert(COMPLETE_KEY.into(), serde_json::Value::Bool(true));
        }
        serde_json::to_string(&serde_json::Value::Object(map))
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty() && !self.complete && self.rejected.is_empty()
    }
}
