//! Configuration file discovery and parsing
//!
//! Searches for `.config/helpmark.yaml` walking up from the current directory.
//! The project root is the parent of `.config/`.

use camino::{Utf8Path, Utf8PathBuf};
use eyre::{Result, eyre};
use facet::Facet;
use helpmark::IncludeLimits;
use std::env;

const CONFIG_DIR: &str = ".config";
const CONFIG_FILE: &str = "helpmark.yaml";

/// helpmark configuration from `.config/helpmark.yaml`
#[derive(Debug, Clone, Facet)]
#[facet(rename_all = "snake_case")]
pub struct HelpmarkConfig {
    /// Content directory (relative to project root)
    pub content: String,

    /// Output directory (relative to project root)
    pub output: String,

    /// Route prefix for non-relative internal links, relative to the content
    /// directory. Defaults to the content root.
    #[facet(default)]
    pub base_url: Option<String>,

    /// Prefix for relative image sources. When unset, root-absolute image
    /// sources are made relative to each page instead.
    #[facet(default)]
    pub assets_path_prefix: Option<String>,

    /// Documents (relative to the content directory) that get every document
    /// they link to merged into them before rendering
    #[facet(default)]
    pub merge: Option<Vec<String>>,

    /// Maximum nesting of `@INCLUDEMD#...@` includes
    #[facet(default)]
    pub include_depth: Option<usize>,
}

/// Discovered configuration with resolved paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Project root (parent of .config/)
    pub root: Utf8PathBuf,
    /// Absolute path to content directory
    pub content_dir: Utf8PathBuf,
    /// Absolute path to output directory
    pub output_dir: Utf8PathBuf,
    pub base_url: String,
    pub assets_path_prefix: Option<String>,
    /// Merge roots, normalized to content-relative paths without leading slash
    pub merge: Vec<String>,
    pub include_limits: IncludeLimits,
}

impl ResolvedConfig {
    /// Discover and load configuration from current directory
    pub fn discover() -> Result<Option<Self>> {
        let cwd = env::current_dir()?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| {
            eyre!(
                "Current directory is not valid UTF-8: {}",
                e.as_path().display()
            )
        })?;

        match find_config_file(&cwd) {
            Some(path) => load_config(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Discover and load configuration from a specific project path
    pub fn discover_from(project_path: &Utf8Path) -> Result<Option<Self>> {
        let yaml_file = project_path.join(CONFIG_DIR).join(CONFIG_FILE);
        if yaml_file.exists() {
            load_config(&yaml_file).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Whether `path` (content-relative) is configured as a merge root
    pub fn is_merge_root(&self, path: &str) -> bool {
        self.merge.iter().any(|m| m == path)
    }
}

/// Search for `.config/helpmark.yaml` walking up from `start`
fn find_config_file(start: &Utf8Path) -> Option<Utf8PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
        .find(|candidate| candidate.exists())
}

/// Load and resolve configuration from a config file path
fn load_config(config_path: &Utf8Path) -> Result<ResolvedConfig> {
    let content = fs_err::read_to_string(config_path)?;

    let config: HelpmarkConfig = facet_yaml::from_str(&content)
        .map_err(|e| eyre!("Failed to parse {}: {}", config_path, e))?;

    // Project root is the parent of .config/
    let root = config_path
        .parent()
        .and_then(Utf8Path::parent)
        .ok_or_else(|| eyre!("{} is not inside a .config directory", config_path))?
        .to_owned();

    tracing::debug!(config = %config_path, root = %root, "loaded configuration");
    Ok(resolve(root, config))
}

fn resolve(root: Utf8PathBuf, config: HelpmarkConfig) -> ResolvedConfig {
    let include_limits = match config.include_depth {
        Some(max_depth) => IncludeLimits { max_depth },
        None => IncludeLimits::default(),
    };

    let merge = config
        .merge
        .unwrap_or_default()
        .into_iter()
        .map(|path| path.trim_start_matches('/').to_string())
        .collect();

    ResolvedConfig {
        content_dir: root.join(&config.content),
        output_dir: root.join(&config.output),
        base_url: config.base_url.unwrap_or_default(),
        assets_path_prefix: config.assets_path_prefix,
        merge,
        include_limits,
        root,
    }
}
