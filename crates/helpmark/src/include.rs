//! `@INCLUDEMD#path@` expansion.
//!
//! Each marker is replaced by the text of the document it names, fetched
//! through a [`TextSource`]. Markers are expanded leftmost first and one at a
//! time, and markers inside included text are expanded before anything to
//! their right.

use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

static INCLUDE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@INCLUDEMD#(.*?)@").unwrap());

/// Why a document could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Nothing exists at this path
    #[error("not found: {0}")]
    NotFound(String),

    /// Network or storage failure
    #[error("failed to fetch '{path}': {message}")]
    Failed { path: String, message: String },
}

/// Asynchronous access to markdown documents by path.
///
/// Implemented by the host (HTTP client, file system, embedded assets, ...).
/// Retries and timeouts are the implementation's business.
pub trait TextSource: Send + Sync {
    fn fetch_text<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<String, FetchError>> + Send + 'a>>;
}

/// Bounds on include expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncludeLimits {
    /// Maximum nesting of includes inside included documents
    pub max_depth: usize,
}

impl Default for IncludeLimits {
    fn default() -> Self {
        Self { max_depth: 16 }
    }
}

/// A document whose remaining text still has to be scanned for markers.
struct Frame {
    /// Path this text was fetched from, `None` for the top-level document
    path: Option<String>,
    remaining: String,
}

/// Expand every `@INCLUDEMD#path@` marker in `markdown`.
///
/// Fetches happen sequentially, in document order. A document that includes
/// itself, directly or through others, fails with [`Error::CyclicInclude`];
/// nesting deeper than `limits.max_depth` fails with
/// [`Error::IncludeDepthExceeded`]. Fetch failures are returned as
/// [`Error::NotFound`] or [`Error::Fetch`].
pub async fn resolve_includes(
    markdown: &str,
    source: &dyn TextSource,
    limits: IncludeLimits,
) -> Result<String> {
    let mut output = String::with_capacity(markdown.len());
    let mut stack = vec![Frame {
        path: None,
        remaining: markdown.to_string(),
    }];

    while let Some(frame) = stack.last_mut() {
        let found = INCLUDE_REGEX.captures(&frame.remaining).and_then(|captures| {
            let marker = captures.get(0)?;
            Some((marker.start(), marker.end(), captures[1].to_string()))
        });
        let Some((start, end, path)) = found else {
            output.push_str(&frame.remaining);
            stack.pop();
            continue;
        };

        output.push_str(&frame.remaining[..start]);
        frame.remaining.drain(..end);

        let chain: Vec<String> = stack.iter().filter_map(|f| f.path.clone()).collect();
        if chain.contains(&path) {
            let mut chain = chain;
            chain.push(path);
            return Err(Error::CyclicInclude { chain });
        }
        if chain.len() >= limits.max_depth {
            return Err(Error::IncludeDepthExceeded {
                path,
                limit: limits.max_depth,
            });
        }

        tracing::debug!(%path, depth = chain.len() + 1, "expanding include");
        let included = source.fetch_text(&path).await?;
        stack.push(Frame {
            path: Some(path),
            remaining: included,
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory documents that record the order they were fetched in.
    #[derive(Default)]
    struct MemorySource {
        docs: HashMap<String, String>,
        fetched: Mutex<Vec<String>>,
    }

    impl MemorySource {
        fn with(mut self, path: &str, text: &str) -> Self {
            self.docs.insert(path.to_string(), text.to_string());
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    impl TextSource for MemorySource {
        fn fetch_text<'a>(
            &'a self,
            path: &'a str,
        ) -> Pin<Box<dyn Future<Output = std::result::Result<String, FetchError>> + Send + 'a>>
        {
            Box::pin(async move {
                self.fetched.lock().unwrap().push(path.to_string());
                if path == "broken.md" {
                    return Err(FetchError::Failed {
                        path: path.to_string(),
                        message: "connection reset".into(),
                    });
                }
                self.docs
                    .get(path)
                    .cloned()
                    .ok_or_else(|| FetchError::NotFound(path.to_string()))
            })
        }
    }

    #[tokio::test]
    async fn test_single_include() {
        let source = MemorySource::default().with("a.md", "INSERTED");
        let out = resolve_includes("before @INCLUDEMD#a.md@ after", &source, IncludeLimits::default())
            .await
            .unwrap();
        assert_eq!(out, "before INSERTED after");
    }

    #[tokio::test]
    async fn test_no_markers() {
        let source = MemorySource::default();
        let out = resolve_includes("plain @text@ here", &source, IncludeLimits::default())
            .await
            .unwrap();
        assert_eq!(out, "plain @text@ here");
        assert!(source.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_nested_includes_expand_before_later_markers() {
        let source = MemorySource::default()
            .with("outer.md", "[outer @INCLUDEMD#inner.md@]")
            .with("inner.md", "inner")
            .with("last.md", "last");
        let out = resolve_includes(
            "@INCLUDEMD#outer.md@ then @INCLUDEMD#last.md@",
            &source,
            IncludeLimits::default(),
        )
        .await
        .unwrap();

        assert_eq!(out, "[outer inner] then last");
        assert_eq!(source.fetched(), ["outer.md", "inner.md", "last.md"]);
    }

    #[tokio::test]
    async fn test_marker_split_across_include_boundary_stays_literal() {
        // The included text ends mid-marker; the rest of the marker follows
        // the include in the parent. Emitted text is never scanned again.
        let source = MemorySource::default()
            .with("head.md", "@INCLUDEMD#tail.")
            .with("tail.md", "TAIL");
        let out = resolve_includes("@INCLUDEMD#head.md@md@", &source, IncludeLimits::default())
            .await
            .unwrap();

        assert_eq!(out, "@INCLUDEMD#tail.md@");
        assert_eq!(source.fetched(), ["head.md"]);
    }

    #[tokio::test]
    async fn test_same_document_included_twice() {
        let source = MemorySource::default().with("note.md", "N");
        let out = resolve_includes(
            "@INCLUDEMD#note.md@ and @INCLUDEMD#note.md@",
            &source,
            IncludeLimits::default(),
        )
        .await
        .unwrap();
        assert_eq!(out, "N and N");
    }

    #[tokio::test]
    async fn test_cyclic_include() {
        let source = MemorySource::default()
            .with("a.md", "A @INCLUDEMD#b.md@")
            .with("b.md", "B @INCLUDEMD#a.md@");
        let err = resolve_includes("@INCLUDEMD#a.md@", &source, IncludeLimits::default())
            .await
            .unwrap_err();

        match err {
            Error::CyclicInclude { chain } => assert_eq!(chain, ["a.md", "b.md", "a.md"]),
            other => panic!("expected cyclic include, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_self_include() {
        let source = MemorySource::default().with("self.md", "@INCLUDEMD#self.md@");
        let err = resolve_includes("@INCLUDEMD#self.md@", &source, IncludeLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CyclicInclude { .. }));
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let source = MemorySource::default()
            .with("1.md", "@INCLUDEMD#2.md@")
            .with("2.md", "@INCLUDEMD#3.md@")
            .with("3.md", "deep");

        let limits = IncludeLimits { max_depth: 2 };
        let err = resolve_includes("@INCLUDEMD#1.md@", &source, limits)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IncludeDepthExceeded { limit: 2, .. }));

        let limits = IncludeLimits { max_depth: 3 };
        let out = resolve_includes("@INCLUDEMD#1.md@", &source, limits)
            .await
            .unwrap();
        assert_eq!(out, "deep");
    }

    #[tokio::test]
    async fn test_not_found_is_distinguishable() {
        let source = MemorySource::default();
        let err = resolve_includes("@INCLUDEMD#missing.md@", &source, IncludeLimits::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = resolve_includes("@INCLUDEMD#broken.md@", &source, IncludeLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
        assert!(!err.is_not_found());
    }
}
