//! Image source rewriting.

use crate::links::is_external;

/// How relative image sources are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetPolicy {
    /// Prefix sources with the routing context's `assets_path_prefix`
    #[default]
    Prefixed,
    /// Make root-absolute sources (`/img/a.png`) relative to a document
    /// nested `depth` directories below the output root. Used for static builds.
    RelativeToDocument { depth: usize },
}

impl AssetPolicy {
    pub(crate) fn apply(&self, src: &str, assets_path_prefix: &str) -> String {
        match self {
            AssetPolicy::Prefixed => rewrite_asset(src, assets_path_prefix),
            AssetPolicy::RelativeToDocument { depth } => relative_to_document(src, *depth),
        }
    }
}

/// Check whether an image source must be left alone: a URL with a scheme,
/// a protocol-relative URL, or a data URI.
pub fn is_absolute_source(src: &str) -> bool {
    src.starts_with("data:") || is_external(src)
}

/// Prefix a relative image source with the static asset root.
///
/// ```
/// use helpmark::rewrite_asset;
///
/// assert_eq!(rewrite_asset("img/logo.png", "dist/md/"), "dist/md/img/logo.png");
/// assert_eq!(rewrite_asset("https://x.io/a.png", "dist/md/"), "https://x.io/a.png");
/// ```
pub fn rewrite_asset(src: &str, assets_path_prefix: &str) -> String {
    if is_absolute_source(src) {
        return src.to_string();
    }
    format!("{assets_path_prefix}{src}")
}

/// Turn a root-absolute source into one relative to a document `depth`
/// directories deep. Other sources are returned unchanged.
pub fn relative_to_document(src: &str, depth: usize) -> String {
    if is_absolute_source(src) {
        return src.to_string();
    }
    match src.strip_prefix('/') {
        Some(rooted) => {
            let mut out = "../".repeat(depth);
            out.push_str(rooted);
            out
        }
        None => src.to_string(),
    }
}
