//! Blueprint: compile a directory of page templates against a master layout,
//! keep the compiled pages in a shared registry, write them to a generated
//! directory and rebuild on change.
//!
//! ```no_run
//! use blueprint::{Registry, watch::begin_watching, rebuild::SETTLE};
//! use std::{path::Path, sync::Arc};
//!
//! # fn main() -> anyhow::Result<()> {
//! let registry = Arc::new(Registry::new());
//! registry.compile_directory("Master.html", Path::new("templates"), &["Nav.html"])?;
//! registry.save_all(Path::new("generated"))?;
//!
//! let _watch = begin_watching(Arc::clone(&registry), "generated".into(), SETTLE)?;
//! # Ok(())
//! # }
//! ```

pub mod logger;

pub mod cli;
pub mod compiler;
pub mod config;
pub mod persist;
pub mod rebuild;
pub mod registry;
pub mod serve;
pub mod watch;

pub use registry::{Page, Registry, Settings, TemplateError};
