//! `[templates]` section configuration.
//!
//! Where page templates live and where the generated site goes.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// `[templates]` section in blueprint.toml.
///
/// # Example
/// ```toml
/// [templates]
/// master = "Master.html"   # Root layout every page extends
/// dir = "templates"        # Source directory (not recursive)
/// extra = ["Nav.html"]     # Shared partials compiled into every page
/// output = "generated"     # Generated directory, cleared on full saves
/// settle_ms = 500          # Wait after a change before rebuilding
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Master template file name.
    #[serde(default = "defaults::templates::master")]
    #[educe(Default = defaults::templates::master())]
    pub master: String,

    /// Template source directory.
    #[serde(default = "defaults::templates::dir")]
    #[educe(Default = defaults::templates::dir())]
    pub dir: PathBuf,

    /// Extra shared file names, relative to `dir`.
    #[serde(default)]
    pub extra: Vec<String>,

    /// Generated output directory.
    #[serde(default = "defaults::templates::output")]
    #[educe(Default = defaults::templates::output())]
    pub output: PathBuf,

    /// Settle interval in milliseconds.
    #[serde(default = "defaults::templates::settle_ms")]
    #[educe(Default = defaults::templates::settle_ms())]
    pub settle_ms: u64,
}

impl TemplatesConfig {
    pub const fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
