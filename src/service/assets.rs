use std::path::{Path, PathBuf};

use http::{header, HeaderValue, Response, StatusCode};

use crate::{
    core::{ErrorContext, SiteResult},
    utils::response::{content_type, ResponseBuilder},
};

const HTML_CACHE: &str = "no-store";
const ASSET_CACHE: &str = "public, max-age=31536000, immutable";

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Avalance Tech Solutions</title></head>
<body>
<h1>Avalance Tech Solutions</h1>
<p>The site is being updated. Please check back soon.</p>
</body>
</html>
"#;

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => content_type::TEXT_HTML,
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => content_type::APPLICATION_JSON,
        "webmanifest" => "application/manifest+json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Serves files below a public directory for every non-API path.
pub struct StaticAssets {
    root: Option<PathBuf>,
}

impl StaticAssets {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// Files to try for a request path, in order. `None` for paths that
    /// try to leave the public directory.
    pub fn candidates(path: &str) -> Option<Vec<PathBuf>> {
        let rel = path.trim_start_matches('/');
        if rel.split('/').any(|seg| seg == ".." || seg.contains('\\')) {
            return None;
        }

        if rel.is_empty() || rel.ends_with('/') {
            return Some(vec![PathBuf::from(format!("{rel}index.html"))]);
        }

        let rel = PathBuf::from(rel);
        if rel.extension().is_some() {
            return Some(vec![rel]);
        }
        Some(vec![rel.with_extension("html"), rel.join("index.html")])
    }

    pub async fn serve(&self, path: &str) -> SiteResult<Response<Vec<u8>>> {
        let Some(candidates) = Self::candidates(path) else {
            log::warn!("Rejected static path {path}");
            return Ok(ResponseBuilder::error_http(StatusCode::NOT_FOUND, "Not Found"));
        };

        if let Some(root) = &self.root {
            for candidate in candidates {
                let full = root.join(&candidate);
                match tokio::fs::metadata(&full).await {
                    Ok(meta) if meta.is_file() => {
                        let body = tokio::fs::read(&full)
                            .await
                            .internal_context(&format!("read {}", full.display()))?;
                        return Ok(Self::file_response(&full, body));
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        log::trace!("No static file at {}: {e}", full.display());
                        continue;
                    }
                }
            }
        }

        if path == "/" {
            return Ok(Self::with_cache(
                ResponseBuilder::http(
                    StatusCode::OK,
                    LANDING_PAGE.as_bytes().to_vec(),
                    Some(content_type::TEXT_HTML),
                ),
                HTML_CACHE,
            ));
        }
        Ok(ResponseBuilder::error_http(StatusCode::NOT_FOUND, "Not Found"))
    }

    fn file_response(path: &Path, body: Vec<u8>) -> Response<Vec<u8>> {
        let mime = mime_for(path);
        let cache = if mime == content_type::TEXT_HTML {
            HTML_CACHE
        } else {
            ASSET_CACHE
        };
        Self::with_cache(ResponseBuilder::http(StatusCode::OK, body, Some(mime)), cache)
    }

    fn with_cache(mut resp: Response<Vec<u8>>, cache: &'static str) -> Response<Vec<u8>> {
        resp.headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(cache));
        resp
    }
}

#[cfg(test)]
mod tests {
    use tempfile::{tempdir, TempDir};

    use super::*;

    fn temp_root() -> TempDir {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        dir
    }

    #[test]
    fn test_candidates() {
        assert_eq!(
            StaticAssets::candidates("/").unwrap(),
            vec![PathBuf::from("index.html")]
        );
        assert_eq!(
            StaticAssets::candidates("/about").unwrap(),
            vec![PathBuf::from("about.html"), PathBuf::from("about/index.html")]
        );
        assert_eq!(
            StaticAssets::candidates("/css/site.css").unwrap(),
            vec![PathBuf::from("css/site.css")]
        );
        assert!(StaticAssets::candidates("/../etc/passwd").is_none());
        assert!(StaticAssets::candidates("/a/../../b").is_none());
    }

    #[tokio::test]
    async fn test_serve_files_with_cache_headers() {
        let dir = temp_root();
        let root = dir.path();
        std::fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(root.join("about.html"), "<h1>about</h1>").unwrap();
        std::fs::write(root.join("css/site.css"), "body{}").unwrap();
        let assets = StaticAssets::new(Some(root.to_path_buf()));

        let resp = assets.serve("/").await.unwrap();
        assert_eq!(resp.body(), b"<h1>home</h1>");
        assert_eq!(resp.headers()[header::CACHE_CONTROL], HTML_CACHE);

        let resp = assets.serve("/about").await.unwrap();
        assert_eq!(resp.body(), b"<h1>about</h1>");

        let resp = assets.serve("/css/site.css").await.unwrap();
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/css; charset=utf-8");
        assert_eq!(resp.headers()[header::CACHE_CONTROL], ASSET_CACHE);

        let resp = assets.serve("/missing.png").await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_landing_page_without_root() {
        let assets = StaticAssets::new(None);

        let resp = assets.serve("/").await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(String::from_utf8_lossy(resp.body()).contains("Avalance Tech Solutions"));

        let resp = assets.serve("/pricing").await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
