//! Content-type lookup by file extension.

/// Guess a MIME type from an attachment's filename extension.
///
/// Covers the media types MMS attachments actually carry. Unknown
/// extensions return `None`; callers decide between a generic
/// `application/octet-stream` and failing.
pub fn guess_content_type(filename: &str) -> Option<&'static str> {
    let ext = filename.rsplit_once('.')?.1.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "mp3" | "mp2" | "m2a" | "mpga" => "audio/mpeg",
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mpg" | "mpeg" | "m1v" | "m2v" => "video/mpeg",
        "avi" => "video/avi",
        "3gp" => "video/3gpp",
        _ => return None,
    };
    Some(mime)
}

/// Coarse media kind for stats output: "image", "audio", "video", "file".
pub fn media_kind(filename: &str) -> &'static str {
    match guess_content_type(filename) {
        Some(mime) if mime.starts_with("image/") => "image",
        Some(mime) if mime.starts_with("audio/") => "audio",
        Some(mime) if mime.starts_with("video/") => "video",
        _ => "file",
    }
}
