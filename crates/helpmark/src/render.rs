//! Main rendering pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};

use crate::Result;
use crate::assets::AssetPolicy;
use crate::handler::{BoxedHandler, CodeBlockHandler, RawCodeHandler};
use crate::handlers::{MERMAID, MermaidHandler};
use crate::links::rewrite_link;
use crate::routing::{PathRouter, RoutingContext, UrlRouter};
use crate::slug::{Heading, UniqueSlugs, slugify};

/// Options for rendering markdown.
///
/// This is the whole renderer configuration: every call gets its handlers
/// from here, nothing is shared between calls.
pub struct RenderOptions {
    /// Code block handlers keyed by language
    pub code_handlers: HashMap<String, BoxedHandler>,

    /// Default handler for languages without a specific handler
    pub default_handler: Option<BoxedHandler>,

    /// Router used to serialize internal link targets
    pub router: Arc<dyn UrlRouter>,

    /// How image sources are rewritten
    pub asset_policy: AssetPolicy,

    /// Suffix repeated heading ids (`-1`, `-2`, ...) instead of emitting duplicates
    pub unique_heading_ids: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        let mut code_handlers: HashMap<String, BoxedHandler> = HashMap::new();
        code_handlers.insert(MERMAID.to_string(), Arc::new(MermaidHandler));

        #[cfg(feature = "highlight")]
        let default_handler: Option<BoxedHandler> =
            Some(Arc::new(crate::handlers::ArboriumHandler::new()));
        #[cfg(not(feature = "highlight"))]
        let default_handler: Option<BoxedHandler> = None;

        Self {
            code_handlers,
            default_handler,
            router: Arc::new(PathRouter),
            asset_policy: AssetPolicy::default(),
            unique_heading_ids: false,
        }
    }
}

impl RenderOptions {
    /// Create new render options with the built-in handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one or more languages.
    pub fn with_handler<H: CodeBlockHandler + 'static>(
        mut self,
        languages: &[&str],
        handler: H,
    ) -> Self {
        let handler: BoxedHandler = Arc::new(handler);
        for language in languages {
            self.code_handlers
                .insert(language.to_string(), handler.clone());
        }
        self
    }

    /// Set the default handler for unregistered languages.
    pub fn with_default_handler<H: CodeBlockHandler + 'static>(mut self, handler: H) -> Self {
        self.default_handler = Some(Arc::new(handler));
        self
    }

    /// Use a custom router for internal links.
    pub fn with_router<R: UrlRouter + 'static>(mut self, router: R) -> Self {
        self.router = Arc::new(router);
        self
    }

    /// Set how image sources are rewritten.
    pub fn with_asset_policy(mut self, policy: AssetPolicy) -> Self {
        self.asset_policy = policy;
        self
    }

    /// Deduplicate heading ids within a document.
    pub fn with_unique_heading_ids(mut self) -> Self {
        self.unique_heading_ids = true;
        self
    }
}

/// A rendered markdown document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Rendered HTML content
    pub html: String,

    /// Extracted headings, in document order, for menus and TOCs
    pub headings: Vec<Heading>,
}

pub(crate) fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Render markdown to HTML.
///
/// Headings, links, images and code blocks get custom treatment; every other
/// node is rendered exactly as pulldown-cmark would.
///
/// # Example
///
/// ```rust,ignore
/// use helpmark::{render, RenderOptions, RoutingContext};
///
/// let ctx = RoutingContext::new(["help", "index"]).with_base_url("help/");
/// let doc = render("# Title\n\n[Next](next.md)", &ctx, &RenderOptions::default()).await?;
/// assert_eq!(doc.headings[0].id, "title");
/// ```
pub async fn render(
    markdown: &str,
    ctx: &RoutingContext,
    options: &RenderOptions,
) -> Result<Document> {
    let events: Vec<Event<'_>> = Parser::new_ext(markdown, parser_options()).collect();
    let mut heading_titles = heading_titles(&events).into_iter();

    let fallback: BoxedHandler = Arc::new(RawCodeHandler);
    let mut slugs = UniqueSlugs::new();
    let mut headings: Vec<Heading> = Vec::new();
    let mut output: Vec<Event<'_>> = Vec::with_capacity(events.len());

    let mut iter = events.into_iter();
    while let Some(event) = iter.next() {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let title = heading_titles.next().unwrap_or_default();
                // An explicit `{#id}` wins over the generated slug
                let mut anchor = id.map_or_else(|| slugify(&title), |id| id.to_string());
                if options.unique_heading_ids {
                    anchor = slugs.claim(&anchor);
                }
                headings.push(Heading {
                    title,
                    id: anchor.clone(),
                    level: level as u8,
                });
                output.push(Event::Start(Tag::Heading {
                    level,
                    id: Some(anchor.into()),
                    classes,
                    attrs,
                }));
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = match link_type {
                    // Autolinks are absolute by construction; email autolinks
                    // get their `mailto:` from the HTML writer.
                    LinkType::Autolink | LinkType::Email => dest_url,
                    _ => rewrite_link(&dest_url, ctx, options.router.as_ref()).into(),
                };
                output.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = options
                    .asset_policy
                    .apply(&dest_url, &ctx.assets_path_prefix);
                output.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url: dest_url.into(),
                    title,
                    id,
                }));
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match &kind {
                    CodeBlockKind::Fenced(lang) => {
                        lang.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };

                let mut code = String::new();
                for inner in iter.by_ref() {
                    match inner {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(text) => code.push_str(&text),
                        _ => {}
                    }
                }

                let handler = options
                    .code_handlers
                    .get(language.as_str())
                    .or(options.default_handler.as_ref())
                    .unwrap_or(&fallback);
                let rendered = handler.render(&language, &code).await?;
                output.push(Event::Html(CowStr::from(rendered)));
            }
            other => output.push(other),
        }
    }

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, output.into_iter());

    Ok(Document { html, headings })
}

/// Render markdown with the default options and return only the HTML.
pub async fn render_html(markdown: &str, ctx: &RoutingContext) -> Result<String> {
    Ok(render(markdown, ctx, &RenderOptions::default()).await?.html)
}

/// Plain text of every heading, in document order.
fn heading_titles(events: &[Event<'_>]) -> Vec<String> {
    let mut titles = Vec::new();
    let mut current: Option<String> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { .. }) => current = Some(String::new()),
            Event::End(TagEnd::Heading(_)) => titles.extend(current.take()),
            Event::Text(text) | Event::Code(text) => {
                if let Some(title) = current.as_mut() {
                    title.push_str(text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(title) = current.as_mut() {
                    title.push(' ');
                }
            }
            _ => {}
        }
    }
    titles
}
