//! MIME type detection module
//!
//! Resolves the Content-Type for a file path.

/// Resolve the Content-Type for a file path.
///
/// `.js` and `.wasm` are checked before the generic database lookup: the
/// database maps `.js` to the legacy `text/javascript`, and module loading
/// in browsers requires `application/javascript` and `application/wasm`.
/// Paths with no known mapping fall back to `application/octet-stream`.
pub fn content_type_for(path: &str) -> &'static str {
    if path.ends_with(".js") {
        return "application/javascript";
    }
    if path.ends_with(".wasm") {
        return "application/wasm";
    }
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream")
}
