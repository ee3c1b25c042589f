//! Serving markdown documents from the content directory.

use std::future::Future;
use std::io;
use std::pin::Pin;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use helpmark::{FetchError, TextSource};

/// [`TextSource`] reading documents below a directory with `tokio::fs`.
///
/// Route paths have no extension, so `.md` is tried first for paths without
/// it: `guide/setup` serves `guide/setup.md`.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: Utf8PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<Utf8PathBuf, FetchError> {
        let relative = Utf8Path::new(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir));
        if escapes || relative.as_str().is_empty() {
            return Err(FetchError::NotFound(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    async fn read(&self, file: &Utf8Path, path: &str) -> Result<String, FetchError> {
        tokio::fs::read_to_string(file)
            .await
            .map_err(|e| fetch_error(path, e))
    }
}

fn fetch_error(path: &str, err: io::Error) -> FetchError {
    match err.kind() {
        io::ErrorKind::NotFound => FetchError::NotFound(path.to_string()),
        _ => FetchError::Failed {
            path: path.to_string(),
            message: err.to_string(),
        },
    }
}

impl TextSource for FsSource {
    fn fetch_text<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let file = self.resolve(path)?;
            if path.ends_with(".md") {
                return self.read(&file, path).await;
            }

            // A route may name both `guide.md` and the directory `guide/`
            match self.read(&Utf8PathBuf::from(format!("{file}.md")), path).await {
                Err(FetchError::NotFound(_)) => self.read(&file, path).await,
                result => result,
            }
        })
    }
}
