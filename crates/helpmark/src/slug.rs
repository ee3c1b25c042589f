//! Heading extraction and slug generation.

use std::collections::HashSet;

/// A heading extracted from the markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// The heading text (without the `#` prefix)
    pub title: String,
    /// The anchor ID for linking (e.g., "my-heading")
    pub id: String,
    /// The heading level (1-6)
    pub level: u8,
}

/// Generate an anchor id from text.
///
/// Lowercases the input and replaces every run of whitespace with a single
/// hyphen. Punctuation is kept as-is.
///
/// # Example
///
/// ```
/// use helpmark::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("My API (v2)"), "my-api-(v2)");
/// assert_eq!(slugify("a \t\n b"), "a-b");
/// ```
pub fn slugify(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_whitespace = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                result.push('-');
                in_whitespace = true;
            }
        } else {
            result.extend(c.to_lowercase());
            in_whitespace = false;
        }
    }

    result
}

/// Hands out slugs that are unique within one document.
///
/// The first claim of a slug gets it unchanged; later claims get `-1`, `-2`,
/// ... appended, skipping suffixed forms that are already taken.
#[derive(Debug, Default)]
pub struct UniqueSlugs {
    taken: HashSet<String>,
}

impl UniqueSlugs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `slug` as used without suffixing it.
    pub fn reserve(&mut self, slug: &str) {
        self.taken.insert(slug.to_string());
    }

    /// Claim `slug`, returning it or the first free suffixed variant.
    pub fn claim(&mut self, slug: &str) -> String {
        if self.taken.insert(slug.to_string()) {
            return slug.to_string();
        }

        let mut n = 1;
        loop {
            let candidate = format!("{slug}-{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
