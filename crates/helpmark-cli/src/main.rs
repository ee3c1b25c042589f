//! hmk: build and preview markdown help pages

mod build;
mod config;
mod fs_source;

use std::env;
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result, eyre};
use facet::Facet;
use facet_args as args;
use helpmark::{
    DEFAULT_ASSETS_PATH_PREFIX, DirReader, IncludeLimits, RenderOptions, RoutingContext, flatten,
    render, resolve_includes,
};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use crate::config::ResolvedConfig;
use crate::fs_source::FsSource;

/// Build command - render the configured content directory to HTML
#[derive(Facet, Debug)]
struct BuildArgs {
    /// Project directory containing `.config/helpmark.yaml` (default: search upwards)
    #[facet(args::named, args::short = 'p', default)]
    project: Option<String>,
}

/// Render command - print the HTML for one markdown file
#[derive(Facet, Debug)]
struct RenderArgs {
    /// Markdown file to render
    #[facet(args::positional)]
    file: String,

    /// Route prefix for non-relative internal links
    #[facet(args::named, default)]
    base_url: Option<String>,

    /// Prefix for relative image sources
    #[facet(args::named, default)]
    assets: Option<String>,

    /// Leave `@INCLUDEMD#...@` markers unexpanded
    #[facet(args::named)]
    no_includes: bool,
}

/// Flatten command - print a document with every linked document merged in
#[derive(Facet, Debug)]
struct FlattenArgs {
    /// Root markdown file
    #[facet(args::positional)]
    file: String,
}

#[derive(Facet, Debug)]
#[repr(u8)]
enum HmkCommand {
    /// Render the content directory to a static HTML tree
    Build(BuildArgs),
    /// Render a single markdown file to stdout
    Render(RenderArgs),
    /// Merge a document and the documents it links to, print markdown
    Flatten(FlattenArgs),
}

#[derive(Facet, Debug)]
struct HmkArgs {
    #[facet(args::subcommand)]
    command: HmkCommand,
}

fn parse_args() -> std::result::Result<HmkCommand, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let args_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    let parsed: HmkArgs = facet_args::from_slice(&args_refs).map_err(|e| {
        eprintln!("{:?}", miette::Report::new(e));
        "Failed to parse arguments".to_string()
    })?;

    Ok(parsed.command)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("helpmark=info,hmk=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))
    .ok();

    let cmd = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing();

    let result = match cmd {
        HmkCommand::Build(args) => run_build(args).await,
        HmkCommand::Render(args) => run_render(args).await,
        HmkCommand::Flatten(args) => run_flatten(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e:?}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run_build(args: BuildArgs) -> Result<()> {
    let config = match &args.project {
        Some(project) => ResolvedConfig::discover_from(Utf8Path::new(project))?,
        None => ResolvedConfig::discover()?,
    };
    let config = config.ok_or_else(|| {
        eyre!(
            "No .config/helpmark.yaml found.\n\n\
            Example config:\n\
            ```yaml\n\
            content: help/\n\
            output: dist/help/\n\
            ```"
        )
    })?;

    tracing::info!(root = %config.root, content = %config.content_dir, "building help");
    let summary = build::build(&config).await?;

    eprintln!(
        "{} {} pages ({} merged), {} assets -> {}",
        "Built".green().bold(),
        summary.pages,
        summary.merged,
        summary.assets,
        config.output_dir.cyan()
    );
    Ok(())
}

/// Split a file argument into its directory and its name within it.
fn split_file(file: &str) -> Result<(Utf8PathBuf, String)> {
    let path = Utf8Path::new(file);
    let name = path
        .file_name()
        .ok_or_else(|| eyre!("{file} is not a file"))?
        .to_string();
    let dir = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir.to_owned(),
        _ => Utf8PathBuf::from("."),
    };
    Ok((dir, name))
}

async fn run_render(args: RenderArgs) -> Result<()> {
    let (dir, name) = split_file(&args.file)?;
    let mut markdown = fs_err::tokio::read_to_string(&args.file).await?;

    if !args.no_includes {
        let source = FsSource::new(dir);
        markdown = resolve_includes(&markdown, &source, IncludeLimits::default()).await?;
    }

    let route = build::route_for(Utf8Path::new(&name));
    let ctx = RoutingContext::new(route)
        .with_base_url(args.base_url.unwrap_or_default())
        .with_assets_path_prefix(
            args.assets
                .unwrap_or_else(|| DEFAULT_ASSETS_PATH_PREFIX.to_string()),
        );

    let doc = render(&markdown, &ctx, &RenderOptions::default()).await?;
    print!("{}", doc.html);
    Ok(())
}

fn run_flatten(args: FlattenArgs) -> Result<()> {
    let (dir, name) = split_file(&args.file)?;
    let merged = flatten(&name, &DirReader::new(dir))?;
    print!("{merged}");
    Ok(())
}
