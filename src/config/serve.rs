//! `[serve]` section configuration.
//!
//! Contains HTTP server settings.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[serve]` section in blueprint.toml.
///
/// # Example
/// ```toml
/// [serve]
/// interface = "0.0.0.0"          # Listen on all interfaces
/// port = 8080
/// static_dir = "static"          # Served after generated pages
/// not_found = "static/404.html"  # Body of 404 responses
/// watch = true                   # Rebuild on template changes
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    /// Network interface to bind.
    #[serde(default = "defaults::serve::interface")]
    #[educe(Default = defaults::serve::interface())]
    pub interface: String,

    /// HTTP port number (default: 80).
    #[serde(default = "defaults::serve::port")]
    #[educe(Default = defaults::serve::port())]
    pub port: u16,

    /// Directory of static files served as-is.
    #[serde(default = "defaults::serve::static_dir")]
    #[educe(Default = defaults::serve::static_dir())]
    pub static_dir: PathBuf,

    /// Page served with 404 responses.
    #[serde(default = "defaults::serve::not_found")]
    #[educe(Default = defaults::serve::not_found())]
    pub not_found: PathBuf,

    /// Enable the template watcher.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub watch: bool,
}
