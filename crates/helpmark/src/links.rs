//! Link classification and rewriting.

use percent_encoding::percent_decode_str;

use crate::routing::{RouteTarget, RoutingContext, UrlRouter, resolve_relative};
use crate::slug::slugify;

/// What a raw markdown link destination points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A URL with a scheme (or protocol-relative); left untouched
    External(String),
    /// `#fragment` on the current document
    Fragment { fragment: String },
    /// Another document, extension stripped
    InternalDocument { path: String },
    /// Another document plus an anchor inside it
    InternalDocumentWithFragment { path: String, fragment: String },
}

/// Check whether `href` carries a URL scheme (`https:`, `mailto:`, `data:`, ...)
/// or is protocol-relative.
pub(crate) fn is_external(href: &str) -> bool {
    href.starts_with("//") || url::Url::parse(href).is_ok()
}

/// Classify a link destination.
///
/// Internal destinations lose their `.md` extension, and fragments are
/// normalized the same way heading ids are, so `#Section Title` targets the
/// heading rendered from `## Section Title`.
pub fn classify_link(href: &str) -> LinkTarget {
    if is_external(href) {
        return LinkTarget::External(href.to_string());
    }

    let (document, fragment) = match href.split_once('#') {
        Some((document, fragment)) => (document, Some(normalize_fragment(fragment))),
        None => (href, None),
    };
    let path = document.strip_suffix(".md").unwrap_or(document).to_string();

    match fragment {
        Some(fragment) if path.is_empty() => LinkTarget::Fragment { fragment },
        Some(fragment) => LinkTarget::InternalDocumentWithFragment { path, fragment },
        None => LinkTarget::InternalDocument { path },
    }
}

fn normalize_fragment(fragment: &str) -> String {
    slugify(&percent_decode_str(fragment).decode_utf8_lossy())
}

fn is_relative(path: &str) -> bool {
    path == "." || path == ".." || path.starts_with("./") || path.starts_with("../")
}

fn resolve_document(path: &str, ctx: &RoutingContext) -> Vec<String> {
    if is_relative(path) {
        resolve_relative(&ctx.current_path, path)
    } else {
        RouteTarget::from_path(&format!("{}{}", ctx.base_url, path), None).segments
    }
}

/// Resolve a link destination to a route target.
///
/// Returns `None` for external links, which are not routed.
pub fn resolve_link(href: &str, ctx: &RoutingContext) -> Option<RouteTarget> {
    let target = match classify_link(href) {
        LinkTarget::External(_) => return None,
        LinkTarget::Fragment { fragment } => RouteTarget {
            segments: ctx.current_path.clone(),
            fragment: Some(fragment),
        },
        LinkTarget::InternalDocument { path } => RouteTarget {
            segments: resolve_document(&path, ctx),
            fragment: None,
        },
        LinkTarget::InternalDocumentWithFragment { path, fragment } => RouteTarget {
            segments: resolve_document(&path, ctx),
            fragment: Some(fragment),
        },
    };
    Some(target)
}

/// Rewrite a link destination into an `href` attribute value.
///
/// External links come back unchanged; everything else is routed through
/// `router`. Never fails: odd input degrades to a best-effort route.
pub fn rewrite_link(href: &str, ctx: &RoutingContext, router: &dyn UrlRouter) -> String {
    match resolve_link(href, ctx) {
        Some(target) => router.serialize(&target),
        None => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::PathRouter;

    fn ctx() -> RoutingContext {
        RoutingContext::new(["docs", "intro"]).with_base_url("docs/")
    }

    #[test]
    fn test_classify_external() {
        for href in [
            "https://example.com/page.md",
            "http://example.com",
            "mailto:help@example.com",
            "//cdn.example.com/lib.js",
        ] {
            assert_eq!(classify_link(href), LinkTarget::External(href.to_string()));
        }
    }

    #[test]
    fn test_classify_fragment() {
        assert_eq!(
            classify_link("#Usage Notes"),
            LinkTarget::Fragment {
                fragment: "usage-notes".into()
            }
        );
    }

    #[test]
    fn test_classify_document() {
        assert_eq!(
            classify_link("setup.md"),
            LinkTarget::InternalDocument {
                path: "setup".into()
            }
        );
        // No extension is still an internal document.
        assert_eq!(
            classify_link("setup"),
            LinkTarget::InternalDocument {
                path: "setup".into()
            }
        );
    }

    #[test]
    fn test_classify_document_with_fragment() {
        assert_eq!(
            classify_link("./page.md#Section%20Title"),
            LinkTarget::InternalDocumentWithFragment {
                path: "./page".into(),
                fragment: "section-title".into()
            }
        );
    }

    #[test]
    fn test_resolve_relative_with_fragment() {
        let target = resolve_link("./page.md#Section Title", &ctx()).unwrap();
        assert_eq!(target.path(), "docs/page");
        assert_eq!(target.fragment.as_deref(), Some("section-title"));
    }

    #[test]
    fn test_resolve_against_base_url() {
        let ctx = RoutingContext::new(["help", "guide", "intro"]).with_base_url("help/");
        let target = resolve_link("reference/api.md", &ctx).unwrap();
        assert_eq!(target.path(), "help/reference/api");
        assert_eq!(target.fragment, None);
    }

    #[test]
    fn test_resolve_parent_directory() {
        let ctx = RoutingContext::new(["help", "guide", "intro"]).with_base_url("help/");
        let target = resolve_link("../faq.md#Top", &ctx).unwrap();
        assert_eq!(target.path(), "help/faq");
        assert_eq!(target.fragment.as_deref(), Some("top"));
    }

    #[test]
    fn test_resolve_fragment_stays_on_current_route() {
        let target = resolve_link("#Install", &ctx()).unwrap();
        assert_eq!(target.path(), "docs/intro");
        assert_eq!(target.fragment.as_deref(), Some("install"));
    }

    #[test]
    fn test_rewrite_link() {
        let router = PathRouter;
        assert_eq!(rewrite_link("setup.md", &ctx(), &router), "/docs/setup");
        assert_eq!(
            rewrite_link("./page.md#Section Title", &ctx(), &router),
            "/docs/page#section-title"
        );
        assert_eq!(rewrite_link("#Install", &ctx(), &router), "/docs/intro#install");
        assert_eq!(
            rewrite_link("https://example.com/a.md", &ctx(), &router),
            "https://example.com/a.md"
        );
    }

    #[test]
    fn test_md_only_stripped_as_extension() {
        assert_eq!(
            classify_link("notes.mdx"),
            LinkTarget::InternalDocument {
                path: "notes.mdx".into()
            }
        );
    }
}
