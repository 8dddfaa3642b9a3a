use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::{fmt, fs};

use anyhow::Context;
use itertools::Itertools;
use serde::Deserialize;

use crate::colorize_bool;

const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

/// Default similarity threshold in percent.
pub const DEFAULT_FACTOR: f64 = 50.0;

/// Path to the user config file: `$HOME/.config/dir-sort.toml`
///
/// Returns `None` if the home directory cannot be determined.
pub static CONFIG_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join(".config").join(format!("{PROJECT_NAME}.toml")))
});

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct DirSortConfig {
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub directories: bool,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub factor: Option<f64>,
    #[serde(default)]
    pub files: bool,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub log: bool,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub verbose: bool,
}

/// Wrapper needed for parsing the config section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    dirsort: DirSortConfig,
}

/// Final config combined from CLI arguments and user config file.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directories whose direct children are sorted.
    pub roots: Vec<PathBuf>,
    /// Accept every action at or above the threshold without asking.
    pub auto: bool,
    pub debug: bool,
    /// Compare directories with each other and merge similar ones.
    pub directories: bool,
    /// Only print what would be done.
    pub dryrun: bool,
    pub exclude: Vec<String>,
    /// Similarity threshold in percent.
    pub factor: f64,
    /// Compare files with each other and group similar ones into new directories.
    pub files: bool,
    pub include: Vec<String>,
    /// Write a run log file.
    pub log: bool,
    /// Prefix for new directory names.
    pub prefix: Option<String>,
    pub verbose: bool,
}

impl DirSortConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> anyhow::Result<Self> {
        let Some(path) = CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.dirsort)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            auto: false,
            debug: false,
            directories: false,
            dryrun: false,
            exclude: Vec::new(),
            factor: DEFAULT_FACTOR,
            files: false,
            include: Vec::new(),
            log: false,
            prefix: None,
            verbose: false,
        }
    }
}

impl Config {
    /// Create a config for the given root directories with default options.
    #[must_use]
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Self::default()
        }
    }

    /// Combine user config file values with command line values.
    ///
    /// Booleans are enabled if either side enables them,
    /// lists are concatenated, and command line values win for factor and prefix.
    /// File pairs are also compared when a prefix is given.
    ///
    /// # Errors
    /// Returns an error if a root is not an existing directory
    /// or the factor is outside 0..=100.
    pub fn from_parts(paths: &[PathBuf], user_config: DirSortConfig, cli: DirSortConfig) -> anyhow::Result<Self> {
        let include: Vec<String> = user_config.include.into_iter().chain(cli.include).unique().collect();
        let exclude: Vec<String> = user_config.exclude.into_iter().chain(cli.exclude).unique().collect();
        let prefix = cli.prefix.or(user_config.prefix);

        let config = Self {
            roots: resolve_roots(paths)?,
            auto: cli.auto || user_config.auto,
            debug: cli.debug || user_config.debug,
            directories: cli.directories || user_config.directories,
            dryrun: cli.dryrun || user_config.dryrun,
            exclude,
            factor: cli.factor.or(user_config.factor).unwrap_or(DEFAULT_FACTOR),
            files: cli.files || user_config.files || prefix.is_some(),
            include,
            log: cli.log || user_config.log,
            prefix,
            verbose: cli.verbose || user_config.verbose,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the options describe a runnable sort.
    ///
    /// # Errors
    /// Returns an error if the factor is outside 0..=100 or a root is not a directory.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.factor.is_finite() || !(0.0..=100.0).contains(&self.factor) {
            anyhow::bail!("Similarity factor must be between 0 and 100, got {}", self.factor);
        }
        if let Some(root) = self.roots.iter().find(|root| !root.is_dir()) {
            anyhow::bail!("Argument \"{}\" is not a directory", root.display());
        }
        Ok(())
    }

    /// Check if an entry name passes the include and exclude filters.
    /// Patterns match case-insensitively anywhere in the name.
    #[must_use]
    pub fn is_included(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let include = self.include.is_empty()
            || self
                .include
                .iter()
                .any(|pattern| name.contains(&pattern.to_lowercase()));
        let exclude = self
            .exclude
            .iter()
            .any(|pattern| name.contains(&pattern.to_lowercase()));
        include && !exclude
    }
}

/// Resolve root directories to absolute paths.
/// With no paths given, the current working directory is used.
///
/// # Errors
/// Returns an error if a path does not exist or is not a directory.
pub fn resolve_roots(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    if paths.is_empty() {
        return Ok(vec![crate::resolve_input_path(None)?]);
    }
    paths
        .iter()
        .map(|path| -> anyhow::Result<PathBuf> {
            let resolved = crate::resolve_input_path(Some(path))
                .with_context(|| format!("Argument \"{}\" is not a directory", path.display()))?;
            ensure_directory(&resolved)?;
            Ok(resolved)
        })
        .process_results(|roots| roots.unique().collect())
}

fn ensure_directory(path: &Path) -> anyhow::Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Argument \"{}\" is not a directory", path.display());
    }
    Ok(())
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roots = self.roots.iter().map(|root| format!("    {}", root.display())).join("\n");
        let include = if self.include.is_empty() {
            "include: []".to_string()
        } else {
            "include:\n".to_string() + &*self.include.iter().map(|name| format!("    {name}")).join("\n")
        };
        let exclude = if self.exclude.is_empty() {
            "exclude: []".to_string()
        } else {
            "exclude:\n".to_string() + &*self.exclude.iter().map(|name| format!("    {name}")).join("\n")
        };
        writeln!(f, "Config:")?;
        writeln!(f, "  roots:\n{roots}")?;
        writeln!(f, "  auto:        {}", colorize_bool(self.auto))?;
        writeln!(f, "  debug:       {}", colorize_bool(self.debug))?;
        writeln!(f, "  directories: {}", colorize_bool(self.directories))?;
        writeln!(f, "  dryrun:      {}", colorize_bool(self.dryrun))?;
        writeln!(f, "  files:       {}", colorize_bool(self.files))?;
        writeln!(f, "  log:         {}", colorize_bool(self.log))?;
        writeln!(f, "  verbose:     {}", colorize_bool(self.verbose))?;
        writeln!(f, "  factor:      {:.2}%", self.factor)?;
        writeln!(f, "  prefix:      {:?}", self.prefix)?;
        writeln!(f, "  {include}")?;
        write!(f, "  {exclude}")
    }
}
