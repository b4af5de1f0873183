//! Request path classification.
//!
//! Every inbound path falls into exactly one [`Classification`], which together
//! with the session state drives the dispatcher. Static assets are recognised
//! by extension alone so that a script, stylesheet or image request is never
//! answered with an HTML login redirect.

use service::config::Config;

/// Extensions that denote HTML documents. Compared case-insensitively.
const PAGE_EXTENSIONS: [&str; 2] = ["html", "htm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEndpoint {
    Callback,
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    ControlEndpoint(ControlEndpoint),
    AlwaysAllowedAsset,
    StaticAsset,
    ProtectedPage,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    public_paths: Vec<String>,
    callback_path: String,
    logout_path: String,
}

impl Classifier {
    pub fn new(
        public_paths: impl IntoIterator<Item = String>,
        callback_path: impl Into<String>,
        logout_path: impl Into<String>,
    ) -> Self {
        Self {
            public_paths: public_paths
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            callback_path: callback_path.into(),
            logout_path: logout_path.into(),
        }
    }

    /// The configured public paths plus the forbidden/landing page, if any.
    pub fn from_config(config: &Config) -> Self {
        let public_paths = config
            .public_paths
            .iter()
            .cloned()
            .chain(config.forbidden_page.clone());
        Self::new(public_paths, config.callback_path(), config.logout_path.clone())
    }

    pub fn classify(&self, path: &str) -> Classification {
        let path = strip_query(path);

        if self.public_paths.iter().any(|p| p == path) {
            Classification::AlwaysAllowedAsset
        } else if path == self.callback_path {
            Classification::ControlEndpoint(ControlEndpoint::Callback)
        } else if path == self.logout_path {
            Classification::ControlEndpoint(ControlEndpoint::Logout)
        } else if is_static_asset(path) {
            Classification::StaticAsset
        } else {
            Classification::ProtectedPage
        }
    }
}

/// Drops any `?query` or `#fragment` suffix.
pub fn strip_query(path: &str) -> &str {
    match path.find(['?', '#']) {
        Some(idx) => &path[..idx],
        None => path,
    }
}

/// Extension of the final path segment, without the dot. A trailing dot
/// (`file.`) counts as no extension.
pub fn extension(path: &str) -> Option<&str> {
    let path = strip_query(path);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rfind('.') {
        Some(idx) if idx + 1 < segment.len() => Some(&segment[idx + 1..]),
        _ => None,
    }
}

pub fn is_page_extension(ext: &str) -> bool {
    PAGE_EXTENSIONS
        .iter()
        .any(|page| page.eq_ignore_ascii_case(ext))
}

/// True for any path whose final segment carries a non-HTML extension.
pub fn is_static_asset(path: &str) -> bool {
    extension(path).is_some_and(|ext| !is_page_extension(ext))
}
