//! Static file serving module
//!
//! Resolves request paths under the served root, loads file content, and
//! builds responses with the resolved MIME type.

use crate::config::AppState;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime};
use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::io;
use std::path::Path;
use tokio::fs;

/// Per-request file errors, mapped to HTTP status codes
#[derive(Debug, PartialEq, Eq)]
pub enum FileError {
    /// Target does not exist under the served root (or escapes it)
    NotFound,
    /// Target exists but is unreadable by the server process
    Forbidden,
}

/// Serve the request path from the served root
pub async fn serve(ctx: &RequestContext<'_>, state: &AppState) -> Response<Full<Bytes>> {
    match load(&state.root, ctx.path, &state.config.content.index_files).await {
        Ok((content, content_type)) => build_file_response(content, content_type, ctx),
        Err(FileError::Forbidden) => http::build_403_response(),
        Err(FileError::NotFound) => http::build_404_response(),
    }
}

/// Resolve `request_path` under `root` and read its content.
///
/// Directories are served through the first matching index file, or a
/// generated listing when none exists. The resolved path is canonicalized
/// and must stay inside the canonical root.
pub async fn load(
    root: &Path,
    request_path: &str,
    index_files: &[String],
) -> Result<(Vec<u8>, &'static str), FileError> {
    let relative = request_path.trim_start_matches('/');
    let joined = root.join(relative);

    let target = joined.canonicalize().map_err(|e| io_error(&joined, &e))?;

    if !target.starts_with(root) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {request_path} -> {}",
            target.display()
        ));
        return Err(FileError::NotFound);
    }

    let metadata = fs::metadata(&target).await.map_err(|e| io_error(&target, &e))?;

    if metadata.is_dir() {
        for index in index_files {
            let candidate = target.join(index);
            if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                return read_file(&candidate).await;
            }
        }
        let listing = render_directory_listing(&target, request_path).await?;
        return Ok((listing.into_bytes(), "text/html; charset=utf-8"));
    }

    read_file(&target).await
}

/// Read a file and resolve its content type from the filesystem path
async fn read_file(path: &Path) -> Result<(Vec<u8>, &'static str), FileError> {
    let content = fs::read(path).await.map_err(|e| io_error(path, &e))?;
    let content_type = mime::content_type_for(&path.to_string_lossy());
    Ok((content, content_type))
}

/// Map an I/O error to the per-request error taxonomy
fn io_error(path: &Path, error: &io::Error) -> FileError {
    if error.kind() == io::ErrorKind::PermissionDenied {
        logger::log_warning(&format!("Access denied for '{}': {error}", path.display()));
        FileError::Forbidden
    } else {
        // File not found is common (404), no need to log
        FileError::NotFound
    }
}

/// Build the file response with `ETag` and HEAD support
fn build_file_response(
    content: Vec<u8>,
    content_type: &'static str,
    ctx: &RequestContext<'_>,
) -> Response<Full<Bytes>> {
    let etag = cache::generate_etag(&content);

    if cache::check_etag_match(ctx.if_none_match.as_deref(), &etag) {
        return http::build_304_response(&etag);
    }

    http::response::build_cached_response(Bytes::from(content), content_type, &etag, ctx.is_head)
}

/// Render a directory listing page for a directory without an index file
async fn render_directory_listing(dir: &Path, request_path: &str) -> Result<String, FileError> {
    let mut reader = fs::read_dir(dir).await.map_err(|e| io_error(dir, &e))?;

    let mut names: Vec<String> = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(|e| io_error(dir, &e))? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let display_path = if request_path.is_empty() { "/" } else { request_path };
    let mut items = String::new();
    for name in &names {
        let href = format!("{}/{}", display_path.trim_end_matches('/'), name);
        items.push_str(&format!(
            "        <li><a href=\"{}\">{}</a></li>\n",
            escape_html(&href),
            escape_html(name)
        ));
    }

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Directory listing for {path}</title>
</head>
<body>
    <h1>Directory listing for {path}</h1>
    <hr>
    <ul>
{items}    </ul>
    <hr>
</body>
</html>"#,
        path = escape_html(display_path),
        items = items
    ))
}

/// Escape special characters for HTML output
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn index_files() -> Vec<String> {
        vec!["index.html".to_string(), "index.htm".to_string()]
    }

    fn test_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "cors_static_server_{}_{name}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir.canonicalize().unwrap()
    }

    #[tokio::test]
    async fn test_serves_file_bytes_with_database_type() {
        let root = test_root("html_file");
        std::fs::write(root.join("page.html"), b"<html>hi</html>").unwrap();

        let (content, content_type) = load(&root, "/page.html", &index_files()).await.unwrap();
        assert_eq!(content, b"<html>hi</html>");
        assert_eq!(content_type, "text/html");
    }

    #[tokio::test]
    async fn test_wasm_gets_modern_type() {
        let root = test_root("wasm_file");
        std::fs::write(root.join("app.wasm"), b"\0asm").unwrap();

        let (_, content_type) = load(&root, "/app.wasm", &index_files()).await.unwrap();
        assert_eq!(content_type, "application/wasm");
    }

    #[tokio::test]
    async fn test_js_override_applies_to_served_files() {
        let root = test_root("js_file");
        std::fs::write(root.join("app.js"), b"console.log(1)").unwrap();

        let (_, content_type) = load(&root, "/app.js", &index_files()).await.unwrap();
        assert_eq!(content_type, "application/javascript");
    }

    #[tokio::test]
    async fn test_directory_serves_index_file() {
        let root = test_root("dir_index");
        std::fs::write(root.join("index.html"), b"home").unwrap();

        let (content, content_type) = load(&root, "/", &index_files()).await.unwrap();
        assert_eq!(content, b"home");
        assert_eq!(content_type, "text/html");
    }

    #[tokio::test]
    async fn test_directory_listing_when_no_index() {
        let root = test_root("dir_listing");
        std::fs::write(root.join("data.txt"), b"x").unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();

        let (content, content_type) = load(&root, "/", &index_files()).await.unwrap();
        let page = String::from_utf8(content).unwrap();
        assert_eq!(content_type, "text/html; charset=utf-8");
        assert!(page.contains("data.txt"));
        assert!(page.contains("sub/"));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let root = test_root("missing");

        let err = load(&root, "/missing.txt", &index_files()).await.unwrap_err();
        assert_eq!(err, FileError::NotFound);
    }

    #[tokio::test]
    async fn test_traversal_is_blocked() {
        let root = test_root("traversal");
        let outside = root.parent().unwrap().join(format!(
            "cors_static_server_{}_outside.txt",
            std::process::id()
        ));
        std::fs::write(&outside, b"secret").unwrap();
        let escape = format!("/../{}", outside.file_name().unwrap().to_string_lossy());

        let err = load(&root, &escape, &index_files()).await.unwrap_err();
        assert_eq!(err, FileError::NotFound);
    }
}
