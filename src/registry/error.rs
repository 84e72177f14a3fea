//! Template registry error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while compiling, looking up, rendering or saving pages.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template `{0}` not found")]
    NotFound(String),

    #[error("failed to read template directory `{}`", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile `{name}`")]
    Compile {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error("`{name}` does not extend master template `{master}`")]
    MasterMissing { name: String, master: String },

    #[error("failed to render `{name}`")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },

    #[error(
        "refusing to clear `{}`: it holds the working directory or template sources",
        .0.display()
    )]
    UnsafeOutput(PathBuf),

    #[error("IO error at `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TemplateError {
    /// Whether this is a lookup miss rather than a real failure.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
