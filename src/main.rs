//! bp-server: build and serve a template directory.

use anyhow::{Context, Result};
use blueprint::{
    Registry,
    cli::{Cli, Commands},
    config::BlueprintConfig,
    log,
    serve::serve_site,
    watch::begin_watching,
};
use clap::Parser;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = BlueprintConfig::load(&cli)?;
    let registry = Arc::new(Registry::new());

    build_all(&config, &registry)?;

    match &cli.command {
        Commands::Build => Ok(()),
        Commands::Serve { .. } => {
            // Watching stops when the handle drops at the end of serving
            let _watch = if config.serve.watch {
                Some(begin_watching(
                    Arc::clone(&registry),
                    config.templates.output.clone(),
                    config.templates.settle(),
                )?)
            } else {
                None
            };
            serve_site(&config, registry)
        }
    }
}

/// Compile every page and write the generated directory.
///
/// Any failure here aborts startup.
fn build_all(config: &BlueprintConfig, registry: &Registry) -> Result<()> {
    let templates = &config.templates;

    let count = registry
        .compile_directory(&templates.master, &templates.dir, &templates.extra)
        .with_context(|| format!("Failed to compile {}", templates.dir.display()))?;
    log!("compile"; "compiled {} pages from {}", count, templates.dir.display());

    registry
        .save_all(&templates.output)
        .with_context(|| format!("Failed to write {}", templates.output.display()))?;

    Ok(())
}
