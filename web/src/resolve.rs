//! Mapping of site-relative URL paths onto files in the served tree, and the
//! response headers that go with each kind of file.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use axum::extract::Request;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::classify::{extension, is_page_extension, is_static_asset, strip_query};
use crate::error::{Error, WebErrorKind};

const INDEX_FILE: &str = "index.html";

const PAGE_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, max-age=0";
const STATIC_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Page,
    Static,
}

impl AssetKind {
    /// Kind implied by a request path: anything with a non-HTML extension is
    /// static, everything else follows page rules.
    pub fn of_request_path(path: &str) -> Self {
        if is_static_asset(path) {
            AssetKind::Static
        } else {
            AssetKind::Page
        }
    }

    /// Kind of a concrete file, by its extension.
    pub fn of_file(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if is_page_extension(ext) => AssetKind::Page,
            _ => AssetKind::Static,
        }
    }

    /// Cache directives for responses serving this kind of file.
    pub fn cache_headers(self) -> Vec<(HeaderName, HeaderValue)> {
        match self {
            AssetKind::Page => vec![
                (
                    header::CACHE_CONTROL,
                    HeaderValue::from_static(PAGE_CACHE_CONTROL),
                ),
                (header::PRAGMA, HeaderValue::from_static("no-cache")),
                (header::EXPIRES, HeaderValue::from_static("0")),
            ],
            AssetKind::Static => vec![(
                header::CACHE_CONTROL,
                HeaderValue::from_static(STATIC_CACHE_CONTROL),
            )],
        }
    }
}

/// A file inside the site root, ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub path: PathBuf,
    pub kind: AssetKind,
    /// `NOT_FOUND` when this is the configured not-found page standing in for
    /// a missing document.
    pub status: StatusCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    NotFound,
    /// The path resolved to a location outside the site root.
    Escapes,
}

impl From<ResolveError> for Error {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound => Error::Web(WebErrorKind::NotFound),
            ResolveError::Escapes => Error::Web(WebErrorKind::Forbidden),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    not_found_page: Option<PathBuf>,
}

impl Resolver {
    /// `root` is canonicalized so containment checks compare like with like.
    /// `not_found_page` is relative to the root.
    pub fn new(root: impl Into<PathBuf>, not_found_page: Option<&str>) -> Self {
        let root = root.into();
        let root = std::fs::canonicalize(&root).unwrap_or(root);
        let not_found_page = not_found_page
            .map(|page| join_segments(&normalize(page)))
            .filter(|page| !page.as_os_str().is_empty());
        Self {
            root,
            not_found_page,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a request path to a file under the root.
    ///
    /// Candidates are tried in order; for pages a missing document falls back
    /// to the not-found page when one is configured and present.
    pub async fn resolve(&self, path: &str, kind: AssetKind) -> Result<FileRef, ResolveError> {
        for candidate in candidates(path, kind) {
            if let Some(file) = self.locate(&candidate).await? {
                debug!("Resolved {path} to {}", file.display());
                return Ok(FileRef {
                    kind: AssetKind::of_file(&file),
                    path: file,
                    status: StatusCode::OK,
                });
            }
        }

        if kind == AssetKind::Page {
            if let Some(page) = &self.not_found_page {
                if let Some(file) = self.locate(page).await? {
                    debug!("No file for {path}, using not-found page");
                    return Ok(FileRef {
                        kind: AssetKind::of_file(&file),
                        path: file,
                        status: StatusCode::NOT_FOUND,
                    });
                }
            }
        }

        Err(ResolveError::NotFound)
    }

    /// Returns the canonical path when `relative` names a regular file that
    /// stays inside the root after symlinks are followed.
    async fn locate(&self, relative: &Path) -> Result<Option<PathBuf>, ResolveError> {
        let full = self.root.join(relative);
        let canonical = match tokio::fs::canonicalize(&full).await {
            Ok(canonical) => canonical,
            Err(_) => return Ok(None),
        };
        if !canonical.starts_with(&self.root) {
            warn!(
                "Refusing {} which resolves outside the site root",
                relative.display()
            );
            return Err(ResolveError::Escapes);
        }
        match tokio::fs::metadata(&canonical).await {
            Ok(meta) if meta.is_file() => Ok(Some(canonical)),
            _ => Ok(None),
        }
    }
}

/// Root-relative file candidates for a request path, most specific first.
///
/// * `/` or `.../` becomes `.../index.html`
/// * an extension-less page gets `.html`, then `/index.html` as a fallback
/// * anything else is used as-is
pub fn candidates(path: &str, kind: AssetKind) -> Vec<PathBuf> {
    let path = strip_query(path);
    let mut segments = normalize(path);
    let directory_like = segments.is_empty() || path.ends_with('/');

    match kind {
        AssetKind::Page if directory_like => {
            segments.push(INDEX_FILE.to_string());
            vec![join_segments(&segments)]
        }
        AssetKind::Page if extension(path).is_none() => {
            let mut html = segments.clone();
            if let Some(last) = html.last_mut() {
                last.push_str(".html");
            }
            segments.push(INDEX_FILE.to_string());
            vec![join_segments(&html), join_segments(&segments)]
        }
        _ => vec![join_segments(&segments)],
    }
}

/// Split a URL path into segments, dropping empty and `.` segments and
/// applying `..` without ever climbing above the root. Backslashes are
/// treated as separators.
fn normalize(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
    segments
}

fn join_segments(segments: &[String]) -> PathBuf {
    segments.iter().collect()
}

/// Serve a resolved file with content type from its extension and cache
/// headers from its kind.
pub async fn serve(file: &FileRef, mut request: Request) -> Response {
    if file.status != StatusCode::OK {
        // The not-found page is always sent in full.
        for name in [
            header::RANGE,
            header::IF_RANGE,
            header::IF_MODIFIED_SINCE,
            header::IF_UNMODIFIED_SINCE,
        ] {
            request.headers_mut().remove(name);
        }
    }

    let result: Result<_, Infallible> = ServeFile::new(&file.path).oneshot(request).await;
    let mut response = match result {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };

    if file.status != StatusCode::OK && response.status() == StatusCode::OK {
        *response.status_mut() = file.status;
    }
    let headers = response.headers_mut();
    for (name, value) in file.kind.cache_headers() {
        headers.insert(name, value);
    }
    response
}
