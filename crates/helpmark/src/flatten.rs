//! Link merging: flatten a root document and every markdown document it
//! (transitively) links to into a single document.
//!
//! Each merged document is appended once, behind a `<div id="{anchor}">`
//! marker, and links to it are rewritten to `#{anchor}`. Links that carry a
//! fragment (`other.md#usage`) are rewritten to that fragment instead, since
//! the heading it names now lives on the same page.

use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::Result;
use crate::include::FetchError;
use crate::links::is_external;
use crate::slug::{UniqueSlugs, slugify};

/// Anchor of the root document in a flattened document.
pub const ROOT_ANCHOR: &str = "index";

static MD_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?P<text>[^\]]*)\]\((?P<path>[^()\s#]+?\.md)(?:#(?P<fragment>[^()\s]*))?\)")
        .unwrap()
});

/// Synchronous access to markdown documents by path, used at build time.
pub trait ReadText {
    fn read_text(&self, path: &str) -> std::result::Result<String, FetchError>;
}

impl<F> ReadText for F
where
    F: Fn(&str) -> std::result::Result<String, FetchError>,
{
    fn read_text(&self, path: &str) -> std::result::Result<String, FetchError> {
        self(path)
    }
}

/// Reads documents from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirReader {
    base: Utf8PathBuf,
}

impl DirReader {
    pub fn new(base: impl Into<Utf8PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl ReadText for DirReader {
    fn read_text(&self, path: &str) -> std::result::Result<String, FetchError> {
        fs_err::read_to_string(self.base.join(path)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound(path.to_string()),
            _ => FetchError::Failed {
                path: path.to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// Anchors assigned during one flatten call.
struct MergeState {
    anchors: HashMap<String, String>,
    slugs: UniqueSlugs,
}

impl MergeState {
    fn new(root: &str) -> Self {
        let mut slugs = UniqueSlugs::new();
        slugs.reserve(ROOT_ANCHOR);
        let mut anchors = HashMap::new();
        anchors.insert(root.to_string(), ROOT_ANCHOR.to_string());
        Self { anchors, slugs }
    }

    /// Assign an anchor derived from the file name of `path`.
    fn assign(&mut self, path: &str) -> String {
        let stem = Utf8Path::new(path).file_stem().unwrap_or(path);
        let anchor = self.slugs.claim(&slugify(stem));
        self.anchors.insert(path.to_string(), anchor.clone());
        anchor
    }
}

/// A merged document waiting to have its own links processed.
struct Pending {
    path: String,
    anchor: String,
    text: String,
}

/// Flatten `root` and every document it links to into one markdown document.
///
/// Link paths starting with `/` are relative to the directory `reader` serves;
/// others are relative to the linking document. Documents are appended in the
/// order they are first linked, and each is appended once however many links
/// point at it, so link cycles terminate.
pub fn flatten(root: &str, reader: &dyn ReadText) -> Result<String> {
    let root = normalize_path(root);
    let mut state = MergeState::new(&root);
    let mut queue = VecDeque::from([Pending {
        text: reader.read_text(&root)?,
        path: root,
        anchor: ROOT_ANCHOR.to_string(),
    }]);

    let mut merged = String::new();
    while let Some(doc) = queue.pop_front() {
        let body = rewrite_links(&doc, &mut state, reader, &mut queue)?;
        if doc.anchor != ROOT_ANCHOR {
            merged.push_str(&format!("\n\n<div id=\"{}\"></div>\n\n", doc.anchor));
        }
        merged.push_str(&body);
    }

    Ok(merged)
}

fn rewrite_links(
    doc: &Pending,
    state: &mut MergeState,
    reader: &dyn ReadText,
    queue: &mut VecDeque<Pending>,
) -> Result<String> {
    let text = doc.text.as_str();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in MD_LINK_REGEX.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let link_path = &caps["path"];

        // Images and external documents stay as they are
        if text[..whole.start()].ends_with('!') || is_external(link_path) {
            continue;
        }

        let target = resolve_path(&doc.path, link_path);
        let anchor = match state.anchors.get(&target) {
            Some(anchor) => anchor.clone(),
            None => {
                let contents = reader.read_text(&target)?;
                let anchor = state.assign(&target);
                tracing::debug!(path = %target, %anchor, from = %doc.path, "merging linked document");
                queue.push_back(Pending {
                    path: target,
                    anchor: anchor.clone(),
                    text: contents,
                });
                anchor
            }
        };

        let href = match caps.name("fragment").map(|f| f.as_str()) {
            Some(fragment) if !fragment.is_empty() => {
                slugify(&percent_decode_str(fragment).decode_utf8_lossy())
            }
            _ => anchor,
        };

        out.push_str(&text[last..whole.start()]);
        out.push_str(&format!("[{}](#{})", &caps["text"], href));
        last = whole.end();
    }

    out.push_str(&text[last..]);
    Ok(out)
}

/// Resolve a link path found in `from` to a normalized document path.
fn resolve_path(from: &str, link: &str) -> String {
    let link = percent_decode_str(link).decode_utf8_lossy();
    match link.strip_prefix('/') {
        Some(rooted) => normalize_path(rooted),
        None => {
            let dir = Utf8Path::new(from).parent().unwrap_or(Utf8Path::new(""));
            normalize_path(dir.join(link.as_ref()).as_str())
        }
    }
}

/// Collapse `.`/`..` components and drop leading and repeated slashes.
fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn reader(docs: &'static [(&'static str, &'static str)]) -> impl ReadText {
        move |path: &str| -> std::result::Result<String, FetchError> {
            docs.iter()
                .find(|(p, _)| *p == path)
                .map(|(_, text)| text.to_string())
                .ok_or_else(|| FetchError::NotFound(path.to_string()))
        }
    }

    #[test]
    fn test_merges_linked_child_once() {
        let docs = reader(&[
            ("root.md", "# Root\n\nSee [child](/child.md) and [again](/child.md).\n"),
            ("child.md", "# Child\n\nChild body.\n"),
        ]);
        let merged = flatten("root.md", &docs).unwrap();

        assert_eq!(
            merged,
            "# Root\n\nSee [child](#child) and [again](#child).\n\
             \n\n<div id=\"child\"></div>\n\n\
             # Child\n\nChild body.\n"
        );
        assert_eq!(merged.matches("Child body.").count(), 1);
    }

    #[test]
    fn test_no_links_is_identity() {
        let docs = reader(&[("root.md", "just text, [not a doc](https://example.com)")]);
        assert_eq!(
            flatten("/root.md", &docs).unwrap(),
            "just text, [not a doc](https://example.com)"
        );
    }

    #[test]
    fn test_cycle_back_to_root() {
        let docs = reader(&[
            ("root.md", "[a](/a.md)"),
            ("a.md", "[home](/root.md) [self](/a.md)"),
        ]);
        let merged = flatten("root.md", &docs).unwrap();

        assert_eq!(
            merged,
            "[a](#a)\n\n<div id=\"a\"></div>\n\n[home](#index) [self](#a)"
        );
    }

    #[test]
    fn test_fragment_links_point_at_heading() {
        let docs = reader(&[
            ("root.md", "[usage](/guide.md#Basic%20Usage) [guide](/guide.md)"),
            ("guide.md", "## Basic Usage"),
        ]);
        let merged = flatten("root.md", &docs).unwrap();

        assert!(merged.starts_with("[usage](#basic-usage) [guide](#guide)"));
        assert_eq!(merged.matches("## Basic Usage").count(), 1);
    }

    #[test]
    fn test_relative_links_resolve_from_linking_document() {
        let docs = reader(&[
            ("docs/index.md", "[setup](guide/setup.md)"),
            ("docs/guide/setup.md", "[faq](../faq.md)"),
            ("docs/faq.md", "FAQ"),
        ]);
        let merged = flatten("docs/index.md", &docs).unwrap();

        assert!(merged.contains("[setup](#setup)"));
        assert!(merged.contains("[faq](#faq)"));
        assert!(merged.ends_with("<div id=\"faq\"></div>\n\nFAQ"));
    }

    #[test]
    fn test_documents_appended_in_discovery_order() {
        let docs = reader(&[
            ("root.md", "[b](/b.md) [c](/c.md)"),
            ("b.md", "B [d](/d.md)"),
            ("c.md", "C"),
            ("d.md", "D"),
        ]);
        let merged = flatten("root.md", &docs).unwrap();

        let b = merged.find("id=\"b\"").unwrap();
        let c = merged.find("id=\"c\"").unwrap();
        let d = merged.find("id=\"d\"").unwrap();
        assert!(b < c && c < d);
    }

    #[test]
    fn test_anchor_collisions_get_suffixes() {
        let docs = reader(&[
            ("index.md", "[a](/a/intro.md) [b](/b/intro.md) [c](/c/index.md)"),
            ("a/intro.md", "A"),
            ("b/intro.md", "B"),
            ("c/index.md", "C"),
        ]);
        let merged = flatten("index.md", &docs).unwrap();

        assert!(merged.starts_with("[a](#intro) [b](#intro-1) [c](#index-1)"));
        assert!(merged.contains("<div id=\"intro-1\"></div>\n\nB"));
    }

    #[test]
    fn test_image_links_untouched() {
        let docs = reader(&[("root.md", "![diagram](/img/diagram.md)")]);
        assert_eq!(
            flatten("root.md", &docs).unwrap(),
            "![diagram](/img/diagram.md)"
        );
    }

    #[test]
    fn test_missing_document() {
        let docs = reader(&[("root.md", "[gone](/gone.md)")]);
        let err = flatten("root.md", &docs).unwrap_err();
        assert!(matches!(err, Error::NotFound(path) if path == "gone.md"));
    }

    #[test]
    fn test_dir_reader() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs_err::create_dir_all(base.join("sub")).unwrap();
        fs_err::write(base.join("root.md"), "[child](sub/child.md)").unwrap();
        fs_err::write(base.join("sub/child.md"), "child").unwrap();

        let reader = DirReader::new(base);
        let merged = flatten("root.md", &reader).unwrap();
        assert_eq!(merged, "[child](#child)\n\n<div id=\"child\"></div>\n\nchild");

        assert!(matches!(
            reader.read_text("nope.md"),
            Err(FetchError::NotFound(_))
        ));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a//b/./c/../d.md"), "a/b/d.md");
        assert_eq!(normalize_path("../../x.md"), "x.md");
    }
}
