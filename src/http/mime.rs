//! MIME type detection module
//!
//! Fixed extension table for the static asset fallback. Unlike a general file
//! server, an extension outside this table is rejected rather than served as
//! `application/octet-stream`.

/// Get MIME Content-Type for a known extension
///
/// # Examples
/// ```
/// use rustroute::http::mime::get_content_type;
/// assert_eq!(get_content_type("html"), Some("text/html"));
/// assert_eq!(get_content_type("jpeg"), Some("image/jpeg"));
/// assert_eq!(get_content_type("mp4"), None);
/// ```
pub fn get_content_type(extension: &str) -> Option<&'static str> {
    match extension {
        "html" => Some("text/html"),
        "css" => Some("text/css"),
        "js" => Some("application/javascript"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "json" => Some("application/json"),
        "xml" => Some("application/xml"),
        _ => None,
    }
}

/// Content type sent with every thumbnail response
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";
