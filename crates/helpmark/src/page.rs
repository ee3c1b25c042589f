//! Loading and rendering the help page for the current route.

use crate::include::{IncludeLimits, TextSource, resolve_includes};
use crate::render::{Document, RenderOptions, render};
use crate::routing::{RoutingContext, route_path};
use crate::{Error, Result};

/// How a page is turned from a fetched document into HTML.
#[derive(Default)]
pub struct PageOptions {
    /// Expand `@INCLUDEMD#path@` markers before rendering
    pub includes: bool,

    /// Bounds on include expansion
    pub include_limits: IncludeLimits,

    /// Renderer configuration
    pub render: RenderOptions,
}

impl PageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand include markers, fetching included documents from the page's source.
    pub fn with_includes(mut self) -> Self {
        self.includes = true;
        self
    }

    pub fn with_include_limits(mut self, limits: IncludeLimits) -> Self {
        self.include_limits = limits;
        self
    }

    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }
}

/// Fetch the document for `ctx.current_path` from `source` and render it.
///
/// An empty route is reported as [`Error::NotFound`], like a missing document,
/// so the host can show its not-found view for both.
pub async fn load_page(
    source: &dyn TextSource,
    ctx: &RoutingContext,
    options: &PageOptions,
) -> Result<Document> {
    let path = route_path(&ctx.current_path).ok_or_else(|| Error::NotFound(String::new()))?;

    tracing::debug!(%path, "loading help page");
    let mut markdown = source.fetch_text(&path).await?;

    if options.includes {
        markdown = resolve_includes(&markdown, source, options.include_limits).await?;
    }

    render(&markdown, ctx, &options.render).await
}
