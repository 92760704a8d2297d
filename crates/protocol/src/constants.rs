use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Endpoint receiving the multipart file upload.
pub const UPLOAD_PATH: &str = "/upload";

/// Server-push progress channel (`text/event-stream`).
pub const PROGRESS_PATH: &str = "/progress";

/// Prefix of the per-platform error detail page.
pub const PLATFORM_DETAIL_PREFIX: &str = "/platform/";

/// Multipart field name carrying the file.
pub const UPLOAD_FIELD: &str = "file";

/// Content type of the progress channel.
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Media types accepted by the upload gate start with this prefix.
pub const VIDEO_MEDIA_PREFIX: &str = "video/";

/// Key of the completion sentinel in a progress message.
pub const COMPLETE_KEY: &str = "complete";

/// Upper bound of a platform's progress percentage.
pub const MAX_PERCENT: u8 = 100;

/// Characters left as-is in a path segment (RFC 3986 unreserved set).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Returns the error detail path for a platform, e.g. `/platform/tiktok-charity`.
pub fn platform_detail_path(platform_id: &str) -> String {
    let encoded = utf8_percent_encode(platform_id, PATH_SEGMENT);
    format!("{PLATFORM_DETAIL_PREFIX}{encoded}")
}
