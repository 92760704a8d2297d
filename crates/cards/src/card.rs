use crosspost_protocol::{Platform, UploadStatus};

/// New visible state for one platform's card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardUpdate {
    pub platform_id: String,
    pub percent: u8,
    pub status: UploadStatus,
    /// Link to the error detail page; only shown while `status` is `Error`.
    pub error_ref: Option<String>,
    /// Error text reported by the service, if any.
    pub error_message: Option<String>,
}

impl CardUpdate {
    pub fn new(platform_id: impl Into<String>, percent: u8, status: UploadStatus) -> Self {
        Self {
            platform_id: platform_id.into(),
            percent,
            status,
            error_ref: None,
            error_message: None,
        }
    }

    pub fn with_error(mut self, error_ref: impl Into<String>, message: Option<String>) -> Self {
        self.error_ref = Some(error_ref.into());
        self.error_message = message;
        self
    }
}

/// Visible state of one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub platform: Platform,
    pub percent: u8,
    pub status: UploadStatus,
    pub error_ref: Option<String>,
    pub error_message: Option<String>,
}

impl Card {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            percent: 0,
            status: UploadStatus::Ready,
            error_ref: None,
            error_message: None,
        }
    }

    pub fn platform_id(&self) -> &str {
        &self.platform.id
    }

    /// Footer label: `Ready`, live `NN%`, `Complete` or `Failed`.
    pub fn status_text(&self) -> String {
        match self.status {
            UploadStatus::Ready => "Ready".into(),
            UploadStatus::Uploading => format!("{}%", self.percent),
            UploadStatus::Success => "Complete".into(),
            UploadStatus::Error => "Failed".into(),
        }
    }

    /// The error link, if it should be visible.
    pub fn visible_error_link(&self) -> Option<&str> {
        match self.status {
            UploadStatus::Error => self.error_ref.as_deref(),
            _ => None,
        }
    }

    /// Overwrites the visible fields. Returns `true` if anything changed.
    pub(crate) fn apply(&mut self, update: &CardUpdate) -> bool {
        let before = (
            self.percent,
            self.status,
            self.error_ref.clone(),
            self.error_message.clone(),
        );

        self.percent = update.percent;
        self.status = update.status;
        if update.status == UploadStatus::Error {
            self.error_ref = update.error_ref.clone();
            self.error_message = update.error_message.clone();
        } else {
            self.error_ref = None;
            self.error_message = None;
        }

        before
            != (
                self.percent,
                self.status,
                self.error_ref.clone(),
                self.error_message.clone(),
            )
    }
}
