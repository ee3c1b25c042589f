//! The code block handler seam.
//!
//! Fenced and indented code blocks are handed to a [`CodeBlockHandler`]
//! picked by language tag; whatever HTML it returns replaces the block.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::Result;

/// Turns the contents of a code block into HTML.
///
/// The returned HTML is inserted as-is, so implementations are responsible
/// for escaping the code.
///
/// ```rust,ignore
/// struct Shouting;
///
/// impl CodeBlockHandler for Shouting {
///     fn render<'a>(
///         &'a self,
///         _language: &'a str,
///         code: &'a str,
///     ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
///         Box::pin(async move { Ok(format!("<pre>{}</pre>", code.to_uppercase())) })
///     }
/// }
/// ```
pub trait CodeBlockHandler: Send + Sync {
    /// `language` is the first word of the fence info string, empty for
    /// indented blocks and bare fences.
    fn render<'a>(
        &'a self,
        language: &'a str,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}

pub type BoxedHandler = Arc<dyn CodeBlockHandler>;

/// Escaped, unhighlighted `<pre><code>`. Used when nothing else claims a block.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodeHandler;

impl CodeBlockHandler for RawCodeHandler {
    fn render<'a>(
        &'a self,
        language: &'a str,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(async move { Ok(plain_code_block(language, code)) })
    }
}

/// Wrap already-escaped HTML in `<pre><code>`, with a `language-*` class when
/// there is a language.
pub(crate) fn code_block(language: &str, inner_html: &str) -> String {
    if language.is_empty() {
        return format!("<pre><code>{inner_html}</code></pre>\n");
    }
    format!(
        "<pre><code class=\"language-{}\">{inner_html}</code></pre>\n",
        html_escape::encode_double_quoted_attribute(language)
    )
}

pub(crate) fn plain_code_block(language: &str, code: &str) -> String {
    code_block(language, &html_escape::encode_text(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_raw_code_handler() {
        let result = RawCodeHandler.render("rust", "fn main() {}").await.unwrap();
        assert_eq!(
            result,
            "<pre><code class=\"language-rust\">fn main() {}</code></pre>\n"
        );
    }

    #[tokio::test]
    async fn test_raw_code_handler_without_language() {
        let result = RawCodeHandler.render("", "plain").await.unwrap();
        assert_eq!(result, "<pre><code>plain</code></pre>\n");
    }

    #[tokio::test]
    async fn test_raw_code_handler_escapes() {
        let result = RawCodeHandler
            .render("html", "<div class=\"x\">a & b</div>")
            .await
            .unwrap();
        assert!(result.contains("&lt;div class=\"x\"&gt;a &amp; b&lt;/div&gt;"));
    }

    #[test]
    fn test_language_cannot_break_out_of_attribute() {
        let html = code_block("x\"><script>", "");
        assert!(!html.contains("<script>"));
        assert!(html.starts_with("<pre><code class=\"language-x&quot;"));
    }
}
