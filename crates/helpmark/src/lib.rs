//! # helpmark
//!
//! Markdown rendering for help pages embedded in an application shell.
//!
//! helpmark turns markdown into HTML that plays well with a client-side router:
//! - **Headings**: `id` attributes derived from the heading text (see [`slugify`])
//! - **Links**: internal `.md` links become router URLs, with relative paths and
//!   fragments resolved against a [`RoutingContext`]
//! - **Images**: relative sources are prefixed with a static asset root
//! - **Code blocks**: pluggable handlers for syntax highlighting and diagrams
//! - **Includes**: `@INCLUDEMD#path@` directives expanded before rendering
//! - **Link merging**: a build-time pass that flattens linked documents into one
//!
//! ## Example
//!
//! ```text
//! use helpmark::{render, RenderOptions, RoutingContext};
//!
//! let ctx = RoutingContext::new(["help", "intro"]).with_base_url("help/");
//! let doc = render("# Getting Started\n\nSee [setup](./setup.md).", &ctx, &RenderOptions::default()).await?;
//!
//! assert!(doc.html.contains(r#"<h1 id="getting-started">"#));
//! assert!(doc.html.contains(r#"href="/help/setup""#));
//! ```

mod assets;
mod flatten;
mod handler;
mod handlers;
mod include;
mod links;
mod page;
mod render;
mod routing;
mod slug;

pub use assets::{AssetPolicy, is_absolute_source, relative_to_document, rewrite_asset};
pub use flatten::{DirReader, ROOT_ANCHOR, ReadText, flatten};
pub use handler::{BoxedHandler, CodeBlockHandler, RawCodeHandler};
pub use handlers::{MermaidHandler, highlight, supported_languages};
pub use include::{FetchError, IncludeLimits, TextSource, resolve_includes};
pub use links::{LinkTarget, classify_link, resolve_link, rewrite_link};
pub use page::{PageOptions, load_page};
pub use render::{Document, RenderOptions, render, render_html};
pub use routing::{
    ClickAction, DEFAULT_ASSETS_PATH_PREFIX, DocumentRelativeRouter, PathRouter, RouteTarget,
    RoutingContext, UrlRouter, intercept_click, resolve_relative, route_path,
};
pub use slug::{Heading, UniqueSlugs, slugify};

// Feature-gated handler exports
#[cfg(feature = "highlight")]
pub use handlers::ArboriumHandler;

/// Error type for helpmark operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested document does not exist
    #[error("document not found: {0}")]
    NotFound(String),

    /// Fetching a document failed for a reason other than not-found
    #[error("failed to fetch '{path}': {message}")]
    Fetch { path: String, message: String },

    /// An include directive (transitively) includes itself
    #[error("cyclic include: {}", chain.join(" -> "))]
    CyclicInclude { chain: Vec<String> },

    /// Includes nested deeper than the configured limit
    #[error("include depth limit of {limit} exceeded at '{path}'")]
    IncludeDepthExceeded { path: String, limit: usize },

    /// Code block handler failed
    #[error("code block handler error for language '{language}': {message}")]
    CodeBlockHandler { language: String, message: String },
}

impl Error {
    /// Whether this error means "no such document", as opposed to a failure the
    /// user should be notified about.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(path) => Error::NotFound(path),
            FetchError::Failed { path, message } => Error::Fetch { path, message },
        }
    }
}

/// Result type alias for helpmark operations.
pub type Result<T> = std::result::Result<T, Error>;
