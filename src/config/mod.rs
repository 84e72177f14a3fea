//! Configuration management for `blueprint.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                        |
//! |---------------|------------------------------------------------|
//! | `[templates]` | Master, extras, source and generated dirs      |
//! | `[serve]`     | HTTP server (interface, port, static, 404)     |
//!
//! The file is optional: every field has a default and command-line flags
//! override whatever the file sets.
//!
//! # Example
//!
//! ```toml
//! [templates]
//! master = "Master.html"
//! dir = "templates"
//! extra = ["Nav.html"]
//!
//! [serve]
//! port = 8080
//! ```

pub mod defaults;
mod error;
mod serve;
mod templates;

pub use error::ConfigError;
pub use serve::ServeConfig;
pub use templates::TemplatesConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing blueprint.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BlueprintConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Template settings
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// HTTP server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl BlueprintConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: BlueprintConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load the config named by the CLI (if present), apply flags, validate.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = if cli.config.exists() {
            Self::from_path(&cli.config)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        self.config_path = Self::normalize_path(&cli.config);

        Self::update_option(&mut self.templates.master, cli.master.as_ref());
        Self::update_option(&mut self.templates.extra, cli.extra.as_ref());
        Self::update_option(&mut self.templates.dir, cli.dir.as_ref());
        Self::update_option(&mut self.templates.output, cli.output.as_ref());
        Self::update_option(&mut self.serve.static_dir, cli.static_dir.as_ref());
        Self::update_option(&mut self.serve.not_found, cli.not_found.as_ref());

        if let Commands::Serve {
            interface,
            port,
            watch,
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
        }

        // Empty entries come from stray commas: "-x Nav.html,"
        self.templates.extra.retain(|name| !name.trim().is_empty());

        self.templates.dir = Self::normalize_path(&self.templates.dir);
        self.templates.output = Self::normalize_path(&self.templates.output);
        self.serve.static_dir = Self::normalize_path(&self.serve.static_dir);
        self.serve.not_found = Self::normalize_path(&self.serve.not_found);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before anything touches disk
    pub fn validate(&self) -> Result<()> {
        let templates = &self.templates;

        if !templates.dir.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[templates.dir] `{}` is not a directory",
                templates.dir.display()
            )));
        }

        if templates.master.is_empty() {
            bail!(ConfigError::Validation("[templates.master] must not be empty".into()));
        }

        if !templates.dir.join(&templates.master).is_file() {
            bail!(ConfigError::Validation(format!(
                "[templates.master] `{}` not found in {}",
                templates.master,
                templates.dir.display()
            )));
        }

        // Full saves clear the output directory
        if templates.dir.starts_with(&templates.output) {
            bail!(ConfigError::Validation(
                "[templates.output] must not be [templates.dir] or one of its parents".into()
            ));
        }

        if self.serve.interface.parse::<std::net::IpAddr>().is_err() {
            bail!(ConfigError::Validation(format!(
                "[serve.interface] `{}` is not an IP address",
                self.serve.interface
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
