//! Static build: render every markdown document under the content directory
//! into a mirrored tree of `.html` pages.

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result, WrapErr, eyre};
use helpmark::{
    AssetPolicy, DirReader, Document, DocumentRelativeRouter, PageOptions, RenderOptions,
    RoutingContext, flatten, load_page, render, resolve_includes,
};
use ignore::WalkBuilder;

use crate::config::ResolvedConfig;
use crate::fs_source::FsSource;

const PAGE_EXTENSION: &str = ".html";

/// What a build produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub pages: usize,
    pub merged: usize,
    pub assets: usize,
}

/// Build the content directory of `config` into its output directory.
pub async fn build(config: &ResolvedConfig) -> Result<BuildSummary> {
    let files = collect_files(&config.content_dir)?;

    for root in &config.merge {
        if !files.iter().any(|f| f.as_str() == root) {
            tracing::warn!(%root, "merge root not found in content directory");
        }
    }

    let source = FsSource::new(config.content_dir.clone());
    let reader = DirReader::new(config.content_dir.clone());
    let mut summary = BuildSummary::default();

    for file in &files {
        let output = config.output_dir.join(file);
        if file.extension() != Some("md") {
            ensure_parent(&output)?;
            fs_err::copy(config.content_dir.join(file), &output)?;
            summary.assets += 1;
            continue;
        }

        let doc = render_document(config, file, &source, &reader)
            .await
            .wrap_err_with(|| format!("rendering {file}"))?;
        if config.is_merge_root(file.as_str()) {
            summary.merged += 1;
        }

        let title = doc
            .headings
            .first()
            .map(|h| h.title.clone())
            .unwrap_or_else(|| file.file_stem().unwrap_or(file.as_str()).to_string());
        let html = page_shell(&title, &doc.html);
        let output = output.with_extension("html");
        ensure_parent(&output)?;
        fs_err::write(&output, html)?;
        tracing::trace!(%output, "wrote page");
        summary.pages += 1;
    }

    tracing::info!(
        pages = summary.pages,
        merged = summary.merged,
        assets = summary.assets,
        output = %config.output_dir,
        "build finished"
    );
    Ok(summary)
}

/// Route segments for a content-relative markdown file: `guide/setup.md` is
/// `["guide", "setup"]`.
pub fn route_for(file: &Utf8Path) -> Vec<String> {
    file.with_extension("")
        .components()
        .map(|c| c.as_str().to_string())
        .collect()
}

async fn render_document(
    config: &ResolvedConfig,
    file: &Utf8Path,
    source: &FsSource,
    reader: &DirReader,
) -> Result<Document> {
    let route = route_for(file);
    let mut ctx = RoutingContext::new(route.iter().cloned()).with_base_url(&config.base_url);

    let mut options = RenderOptions::default()
        .with_router(DocumentRelativeRouter::new(&route, PAGE_EXTENSION))
        .with_unique_heading_ids();
    options = match &config.assets_path_prefix {
        Some(prefix) => {
            ctx = ctx.with_assets_path_prefix(prefix);
            options.with_asset_policy(AssetPolicy::Prefixed)
        }
        None => options.with_asset_policy(AssetPolicy::RelativeToDocument {
            depth: route.len().saturating_sub(1),
        }),
    };

    if config.is_merge_root(file.as_str()) {
        tracing::debug!(%file, "flattening merge root");
        let merged = flatten(file.as_str(), reader)?;
        let expanded = resolve_includes(&merged, source, config.include_limits).await?;
        return Ok(render(&expanded, &ctx, &options).await?);
    }

    let options = PageOptions::new()
        .with_includes()
        .with_include_limits(config.include_limits)
        .with_render_options(options);
    Ok(load_page(source, &ctx, &options).await?)
}

/// Every file below `dir` that is not hidden or ignored, content-relative and sorted.
fn collect_files(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    if !dir.is_dir() {
        return Err(eyre!("content directory {dir} does not exist"));
    }

    let mut files = Vec::new();
    for entry in WalkBuilder::new(dir).build() {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = Utf8Path::from_path(entry.path())
            .ok_or_else(|| eyre!("non UTF-8 path: {}", entry.path().display()))?;
        let relative = path.strip_prefix(dir).wrap_err("walked outside of content dir")?;
        files.push(relative.to_owned());
    }
    files.sort();
    Ok(files)
}

fn ensure_parent(output: &Utf8Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs_err::create_dir_all(parent)?;
    }
    Ok(())
}

fn page_shell(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        html_escape::encode_text(title),
        body
    )
}
