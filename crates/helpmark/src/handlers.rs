//! Built-in code block handlers and the highlight adapter.
//!
//! - [`MermaidHandler`] tags diagram sources for a client-side mermaid renderer
//! - [`ArboriumHandler`] highlights via arborium (requires the `highlight` feature)
//! - [`highlight`] is the one-shot adapter used outside of the renderer

use std::future::Future;
use std::pin::Pin;

use crate::Result;
use crate::handler::{CodeBlockHandler, plain_code_block};

/// Language tag whose blocks are handed to a diagram renderer untouched.
pub const MERMAID: &str = "mermaid";

/// Languages arborium is built with in this crate.
#[cfg(feature = "highlight")]
const LANGUAGES: &[&str] = &[
    "bash",
    "c",
    "cpp",
    "css",
    "dockerfile",
    "go",
    "html",
    "java",
    "javascript",
    "json",
    "markdown",
    "python",
    "rust",
    "sql",
    "toml",
    "typescript",
    "yaml",
];

/// Language tags that get real highlighting, in addition to their aliases.
///
/// Empty without the `highlight` feature: every block renders as plain text.
pub fn supported_languages() -> Vec<&'static str> {
    #[cfg(feature = "highlight")]
    {
        LANGUAGES.to_vec()
    }
    #[cfg(not(feature = "highlight"))]
    {
        Vec::new()
    }
}

/// Map common aliases to grammar names (`js` -> `javascript`, `sh` -> `bash`).
#[cfg_attr(not(feature = "highlight"), allow(dead_code))]
pub(crate) fn normalize_language(lang: &str) -> String {
    // "rust,ignore" -> "rust"
    let lang = lang.split(',').next().unwrap_or(lang).trim().to_lowercase();
    match lang.as_str() {
        "js" => "javascript".to_string(),
        "ts" => "typescript".to_string(),
        "py" => "python".to_string(),
        "rs" => "rust".to_string(),
        "sh" | "shell" | "zsh" | "console" => "bash".to_string(),
        "yml" => "yaml".to_string(),
        "md" => "markdown".to_string(),
        "c++" | "cc" | "cxx" => "cpp".to_string(),
        "plaintext" | "plain" | "txt" => "text".to_string(),
        _ => lang,
    }
}

/// Render a mermaid diagram container. The source is escaped; the diagram
/// library reads it back through `textContent`.
pub(crate) fn mermaid_block(code: &str) -> String {
    format!("<div class=\"mermaid\">{}</div>\n", html_escape::encode_text(code))
}

/// Highlight `code` as `language` and wrap it in a code block.
///
/// Unknown languages fall back to escaped plain text, and `mermaid` blocks are
/// wrapped for the diagram renderer instead of being highlighted. Never fails.
///
/// ```
/// let html = helpmark::highlight("<b>", "no-such-language");
/// assert!(html.contains("&lt;b&gt;"));
/// ```
pub fn highlight(code: &str, language: &str) -> String {
    if language == MERMAID {
        return mermaid_block(code);
    }

    #[cfg(feature = "highlight")]
    {
        let mut highlighter = arborium::Highlighter::new();
        if let Some(html) = try_highlight(&mut highlighter, language, code) {
            return crate::handler::code_block(language, &html);
        }
    }

    plain_code_block(language, code)
}

/// Run arborium, treating both errors and panics (tree-sitter has a few edge
/// cases) as "not highlighted".
#[cfg(feature = "highlight")]
fn try_highlight(
    highlighter: &mut arborium::Highlighter,
    language: &str,
    code: &str,
) -> Option<String> {
    let lang = normalize_language(language);
    if lang.is_empty() || lang == "text" {
        return None;
    }

    let attempt = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        highlighter.highlight(&lang, code)
    }));
    match attempt {
        Ok(Ok(html)) => Some(html),
        Ok(Err(e)) => {
            tracing::debug!(language = %lang, "falling back to plain text: {e}");
            None
        }
        Err(_) => {
            tracing::warn!(language = %lang, "highlighter panicked, falling back to plain text");
            None
        }
    }
}

/// Wraps code in a container picked up by a client-side mermaid renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MermaidHandler;

impl CodeBlockHandler for MermaidHandler {
    fn render<'a>(
        &'a self,
        _language: &'a str,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move { Ok(mermaid_block(code)) })
    }
}

/// Syntax highlighting handler using arborium.
///
/// Requires the `highlight` feature.
#[cfg(feature = "highlight")]
pub struct ArboriumHandler {
    highlighter: std::sync::Mutex<arborium::Highlighter>,
}

#[cfg(feature = "highlight")]
impl ArboriumHandler {
    /// Create a new ArboriumHandler with default config.
    pub fn new() -> Self {
        Self {
            highlighter: std::sync::Mutex::new(arborium::Highlighter::new()),
        }
    }
}

#[cfg(feature = "highlight")]
impl Default for ArboriumHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "highlight")]
impl CodeBlockHandler for ArboriumHandler {
    fn render<'a>(
        &'a self,
        language: &'a str,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let highlighted = {
                let mut hl = self
                    .highlighter
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                try_highlight(&mut hl, language, code)
            };

            Ok(match highlighted {
                Some(html) => crate::handler::code_block(language, &html),
                None => plain_code_block(language, code),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("JS"), "javascript");
        assert_eq!(normalize_language("rust,ignore"), "rust");
        assert_eq!(normalize_language("sh"), "bash");
        assert_eq!(normalize_language("haskell"), "haskell");
    }

    #[test]
    fn test_highlight_unknown_language_escapes() {
        let html = highlight("if a < b && c > d { \"x\" }", "definitely-not-a-language");
        assert!(html.starts_with("<pre><code class=\"language-definitely-not-a-language\">"));
        assert!(html.contains("a &lt; b &amp;&amp; c &gt; d"));
        assert!(!html.contains("a < b"));
    }

    #[test]
    fn test_highlight_without_language() {
        assert_eq!(highlight("<x>", ""), "<pre><code>&lt;x&gt;</code></pre>\n");
    }

    #[test]
    fn test_highlight_mermaid_bypasses_highlighter() {
        let html = highlight("graph TD; A-->B", "mermaid");
        assert_eq!(html, "<div class=\"mermaid\">graph TD; A--&gt;B</div>\n");
    }

    #[tokio::test]
    async fn test_mermaid_handler() {
        let html = MermaidHandler.render("mermaid", "sequenceDiagram").await.unwrap();
        assert_eq!(html, "<div class=\"mermaid\">sequenceDiagram</div>\n");
    }

    #[cfg(feature = "highlight")]
    #[tokio::test]
    async fn test_arborium_handler_falls_back() {
        let handler = ArboriumHandler::new();
        let html = handler.render("no-such-grammar", "<tag>").await.unwrap();
        assert!(html.contains("&lt;tag&gt;"));
    }

    #[cfg(feature = "highlight")]
    #[tokio::test]
    async fn test_arborium_handler_highlights_rust() {
        let handler = ArboriumHandler::new();
        let html = handler.render("rust", "fn main() {}").await.unwrap();
        assert!(html.starts_with("<pre><code class=\"language-rust\">"));
        assert!(html.contains("main"));
    }
}
