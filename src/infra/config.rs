use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::extract::CommandOrder;

/// Config file names, first match wins
const CONFIG_FILES: [&str; 4] = ["edict.toml", ".edict.toml", "edict.yaml", "edict.json"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Extra ignore globs for snapshots (in addition to .gitignore)
    pub ignore_patterns: Vec<String>,

    /// Include dotfiles in snapshots
    pub include_hidden: bool,

    /// Order in which extracted commands are returned
    pub order: CommandOrder,

    /// Diff preview settings
    pub diff: DiffConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig
{
    pub context_lines: usize,
    pub color: bool,
}

impl Default for DiffConfig
{
    fn default() -> Self
    {
        Self { context_lines: 3, color: true }
    }
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            ignore_patterns: vec![
                "**/target".to_string(),
                "**/node_modules".to_string(),
                "**/dist".to_string(),
                "**/__pycache__".to_string(),
                "**/*.pyc".to_string(),
                "**/.DS_Store".to_string(),
            ],
            include_hidden: true,
            order: CommandOrder::default(),
            diff: DiffConfig::default(),
        }
    }
}

/// Load config from the current directory plus `EDICT__*` environment.
pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Load config from `dir` plus `EDICT__*` environment variables
/// (e.g. `EDICT__ORDER=response`, `EDICT__DIFF__CONTEXT_LINES=5`).
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    for name in &CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("EDICT")
            .prefix_separator("__")
            .separator("__"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let toml_string = toml::to_string_pretty(&Config::default())
        .context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        println!("{toml_string}");
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
