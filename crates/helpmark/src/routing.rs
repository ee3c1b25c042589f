//! Routing context and the router capability used to build link targets.
//!
//! The renderer never talks to a concrete client-side router. It builds
//! [`RouteTarget`]s and hands them to a [`UrlRouter`] for serialization; the
//! host can plug in its own router or use [`PathRouter`].

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::links::is_external;

/// Default prefix for static assets referenced from markdown.
pub const DEFAULT_ASSETS_PATH_PREFIX: &str = "dist/md";

/// Characters escaped in serialized fragments.
const FRAGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

/// Characters escaped in serialized path segments.
const SEGMENT: &AsciiSet = &FRAGMENT.add(b'#').add(b'?').add(b'{').add(b'}');

/// Where the document being rendered lives, and how to reach others.
///
/// Supplied per render call and never mutated by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingContext {
    /// Route segments of the document being rendered (e.g. `["help", "intro"]`)
    pub current_path: Vec<String>,
    /// Route prefix prepended to non-relative internal links (e.g. `"help/"`)
    pub base_url: String,
    /// Prefix prepended to relative image sources
    pub assets_path_prefix: String,
}

impl Default for RoutingContext {
    fn default() -> Self {
        Self {
            current_path: Vec::new(),
            base_url: String::new(),
            assets_path_prefix: DEFAULT_ASSETS_PATH_PREFIX.to_string(),
        }
    }
}

impl RoutingContext {
    /// Create a context for the document at `current_path`.
    pub fn new<I, S>(current_path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            current_path: current_path.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the route prefix for non-relative internal links.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the prefix for relative image sources.
    pub fn with_assets_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.assets_path_prefix = prefix.into();
        self
    }
}

/// A router-resolvable path plus optional fragment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteTarget {
    pub segments: Vec<String>,
    pub fragment: Option<String>,
}

impl RouteTarget {
    /// Build a target from a `/`-separated path. Empty segments are dropped.
    pub fn from_path(path: &str, fragment: Option<String>) -> Self {
        Self {
            segments: split_segments(path).map(str::to_string).collect(),
            fragment,
        }
    }

    /// The path without leading slash or fragment, e.g. `docs/page`.
    pub fn path(&self) -> String {
        self.segments.join("/")
    }
}

/// Turns route targets into `href` values and back.
pub trait UrlRouter: Send + Sync {
    /// Serialize a target into a URL usable as an anchor `href`.
    fn serialize(&self, target: &RouteTarget) -> String;

    /// Parse an `href` produced by [`UrlRouter::serialize`] back into a target.
    fn parse(&self, href: &str) -> RouteTarget;
}

/// Router producing root-absolute paths: `/seg/seg#fragment`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathRouter;

impl UrlRouter for PathRouter {
    fn serialize(&self, target: &RouteTarget) -> String {
        let mut url = String::from("/");
        let segments: Vec<String> = target
            .segments
            .iter()
            .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
            .collect();
        url.push_str(&segments.join("/"));

        if let Some(fragment) = &target.fragment {
            url.push('#');
            url.extend(utf8_percent_encode(fragment, FRAGMENT));
        }
        url
    }

    fn parse(&self, href: &str) -> RouteTarget {
        let (rest, fragment) = match href.split_once('#') {
            Some((rest, fragment)) => (
                rest,
                Some(percent_decode_str(fragment).decode_utf8_lossy().into_owned()),
            ),
            None => (href, None),
        };
        let path = rest.split_once('?').map_or(rest, |(path, _query)| path);

        RouteTarget {
            segments: split_segments(path)
                .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
                .collect(),
            fragment,
        }
    }
}

/// Router for static output: each route is a file `{route}{extension}`, and
/// hrefs are relative to the file of the document being rendered. Routes whose
/// last segment already has an extension (`files/manual.pdf`) are copied files
/// and keep their name.
///
/// Lets a built help tree be browsed from any directory, or straight off disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRelativeRouter {
    from: Vec<String>,
    extension: String,
}

impl DocumentRelativeRouter {
    /// Route file name used for an empty route.
    pub const INDEX: &'static str = "index";

    /// Create a router for hrefs written into the document at `from`.
    pub fn new(from: &[String], extension: impl Into<String>) -> Self {
        Self {
            from: from.to_vec(),
            extension: extension.into(),
        }
    }

    fn file_segments<'a>(&self, segments: &'a [String]) -> Vec<&'a str> {
        if segments.is_empty() {
            vec![Self::INDEX]
        } else {
            segments.iter().map(String::as_str).collect()
        }
    }
}

impl UrlRouter for DocumentRelativeRouter {
    fn serialize(&self, target: &RouteTarget) -> String {
        let fragment = target
            .fragment
            .as_ref()
            .map(|f| format!("#{}", utf8_percent_encode(f, FRAGMENT)));

        if target.segments == self.from
            && let Some(fragment) = &fragment
        {
            return fragment.clone();
        }

        let from = self.file_segments(&self.from);
        let to = self.file_segments(&target.segments);
        let from_dir = &from[..from.len() - 1];
        let (to_dir, to_file) = to.split_at(to.len() - 1);

        let common = from_dir
            .iter()
            .zip(to_dir)
            .take_while(|(a, b)| a == b)
            .count();

        let mut parts: Vec<String> = vec!["..".to_string(); from_dir.len() - common];
        parts.extend(
            to_dir[common..]
                .iter()
                .chain(to_file)
                .map(|s| utf8_percent_encode(s, SEGMENT).to_string()),
        );

        let mut href = parts.join("/");
        if is_document(to_file[0]) {
            href.push_str(&self.extension);
        }
        if let Some(fragment) = fragment {
            href.push_str(&fragment);
        }
        href
    }

    fn parse(&self, href: &str) -> RouteTarget {
        let (path, fragment) = match href.split_once('#') {
            Some((path, fragment)) => (
                path,
                Some(percent_decode_str(fragment).decode_utf8_lossy().into_owned()),
            ),
            None => (href, None),
        };

        if path.is_empty() {
            return RouteTarget {
                segments: self.from.clone(),
                fragment,
            };
        }

        let path = percent_decode_str(path).decode_utf8_lossy();
        let path = path.strip_suffix(self.extension.as_str()).unwrap_or(&path);
        let mut segments = resolve_relative(&self.from, path);
        if segments.len() == 1 && segments[0] == Self::INDEX {
            segments.clear();
        }
        RouteTarget { segments, fragment }
    }
}

/// Whether a route's last segment names a rendered document rather than a
/// copied file such as `manual.pdf`.
fn is_document(segment: &str) -> bool {
    !segment.contains('.')
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Resolve a relative document path against the route of the current document.
///
/// The current route names a document, so `./x` is its sibling and `../x`
/// lives one level further up. An empty `path` refers to the current route.
///
/// These are file-system semantics, the same the flattener uses, and they
/// deliberately differ from router-relative navigation that only rewrites a
/// leading `./` to `../`. Under that scheme `../x` would also be a sibling.
///
/// ```
/// use helpmark::resolve_relative;
///
/// let current = vec!["docs".to_string(), "guide".to_string(), "intro".to_string()];
/// assert_eq!(resolve_relative(&current, "./setup"), ["docs", "guide", "setup"]);
/// assert_eq!(resolve_relative(&current, "../faq"), ["docs", "faq"]);
/// ```
pub fn resolve_relative(current: &[String], path: &str) -> Vec<String> {
    if path.is_empty() {
        return current.to_vec();
    }

    let mut segments: Vec<String> = current
        .split_last()
        .map(|(_, dir)| dir.to_vec())
        .unwrap_or_default();

    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
    segments
}

/// Join route URL segments into the document path to fetch for a page.
///
/// Returns `None` for an empty route, which callers treat as not-found.
pub fn route_path<S: AsRef<str>>(segments: &[S]) -> Option<String> {
    let path = segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    (!path.is_empty()).then_some(path)
}

/// What the host should do when an anchor inside rendered help is clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Let the browser handle it (external URL or a fragment on this page)
    Passthrough,
    /// Prevent the default action and navigate the client-side router
    Navigate(RouteTarget),
}

/// Decide how a click on a link with `href` should be handled while the router
/// is showing `current_url`.
pub fn intercept_click(href: &str, current_url: &str, router: &dyn UrlRouter) -> ClickAction {
    if is_external(href) || href.starts_with('#') || href.contains(&format!("{current_url}#")) {
        return ClickAction::Passthrough;
    }
    ClickAction::Navigate(router.parse(href))
}
