//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Blueprint template server CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Master template file name, inside the template directory
    #[arg(short, long, global = true)]
    pub master: Option<String>,

    /// Extra shared template files, comma separated
    #[arg(short = 'x', long, global = true, value_delimiter = ',')]
    pub extra: Option<Vec<String>>,

    /// Template source directory
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Generated output directory
    #[arg(long, global = true)]
    pub output: Option<PathBuf>,

    /// Static files directory
    #[arg(long = "static", global = true)]
    pub static_dir: Option<PathBuf>,

    /// Page served with 404 responses
    #[arg(long = "nf", global = true)]
    pub not_found: Option<PathBuf>,

    /// Config file name (default: blueprint.toml)
    #[arg(short = 'C', long, global = true, default_value = "blueprint.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile the templates and write the generated directory
    Build,

    /// Compile, then serve pages and rebuild on template changes
    Serve {
        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// enable watch
        #[arg(
            short,
            long,
            action = clap::ArgAction::Set,
            num_args = 0..=1,
            default_missing_value = "true",
            require_equals = false
        )]
        watch: Option<bool>,
    },
}
