use std::path::Path;

use crosspost_protocol::constants::VIDEO_MEDIA_PREFIX;
use crosspost_upload::MediaFile;

/// Guesses a media type from the file extension (case-insensitive).
pub fn detect_media_type(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("mp4" | "m4v") => Some("video/mp4"),
        Some("mov") => Some("video/quicktime"),
        Some("webm") => Some("video/webm"),
        Some("mkv") => Some("video/x-matroska"),
        Some("avi") => Some("video/x-msvideo"),
        Some("mpeg" | "mpg") => Some("video/mpeg"),
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("gif") => Some("image/gif"),
        Some("webp") => Some("image/webp"),
        Some("mp3") => Some("audio/mpeg"),
        Some("wav") => Some("audio/wav"),
        Some("txt") => Some("text/plain"),
        Some("pdf") => Some("application/pdf"),
        _ => None,
    }
}

/// Whether `media_type` is accepted for upload.
pub fn is_video(media_type: &str) -> bool {
    media_type.starts_with(VIDEO_MEDIA_PREFIX)
}

/// Builds a [`MediaFile`] if the resolved type is a video.
pub(crate) fn resolve(path: &Path, explicit: Option<&str>) -> Option<MediaFile> {
    let media_type = explicit
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| detect_media_type(path))?;
    is_video(media_type).then(|| MediaFile::new(path, media_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_known_video() {
        assert_eq!(detect_media_type(Path::new("clip.mp4")), Some("video/mp4"));
        assert_eq!(detect_media_type(Path::new("clip.MOV")), Some("video/quicktime"));
        assert_eq!(detect_media_type(Path::new("a/b/c.webm")), Some("video/webm"));
    }

    #[test]
    fn detect_unknown() {
        assert_eq!(detect_media_type(Path::new("notes")), None);
        assert_eq!(detect_media_type(Path::new("archive.zip")), None);
    }

    #[test]
    fn only_video_is_accepted() {
        assert!(is_video("video/mp4"));
        assert!(!is_video("image/png"));
        assert!(!is_video("application/video"));
    }

    #[test]
    fn explicit_type_wins_over_extension() {
        let file = resolve(Path::new("clip.bin"), Some("video/mp4")).unwrap();
        assert_eq!(file.media_type, "video/mp4");
        assert!(resolve(Path::new("clip.mp4"), Some("image/png")).is_none());
    }

    #[test]
    fn blank_explicit_type_falls_back() {
        let file = resolve(Path::new("clip.mkv"), Some("  ")).unwrap();
        assert_eq!(file.media_type, "video/x-matroska");
        assert!(resolve(Path::new("shot.png"), None).is_none());
        assert!(resolve(Path::new("mystery"), None).is_none());
    }
}
