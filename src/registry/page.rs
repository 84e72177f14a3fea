//! A compiled page: one Tera set holding the master, extras and leaf.

use super::{FunctionTable, TemplateError};
use std::{io::Write, path::PathBuf};
use tera::{Context, Tera};

/// Executable artifact stored under one page name.
///
/// Every source file is registered under its base name, so a leaf can
/// `{% extends "Master.html" %}` and `{% include "Nav.html" %}`. Rendering
/// starts at the leaf, which pulls the master in through inheritance.
#[derive(Debug)]
pub struct Page {
    tera: Tera,
    entry: String,
}

impl Page {
    /// Parse `sources` (path, template name) into a page entered at `entry`.
    ///
    /// Fails if any file cannot be read or parsed, or if `entry` does not
    /// extend `master`.
    pub(crate) fn compile(
        entry: &str,
        master: &str,
        sources: &[(PathBuf, String)],
        functions: &FunctionTable,
    ) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        functions.install(&mut tera, entry);

        tera.add_template_files(sources.iter().map(|(path, name)| (path, Some(name))))
            .map_err(|source| TemplateError::Compile {
                name: entry.to_owned(),
                source,
            })?;

        Self::from_parsed(tera, entry, master)
    }

    /// Build a page from in-memory sources, e.g. `[("Master.html", "..."), ("Home.html", "...")]`.
    pub fn from_raw(
        entry: &str,
        master: &str,
        sources: &[(&str, &str)],
        functions: &FunctionTable,
    ) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        functions.install(&mut tera, entry);

        tera.add_raw_templates(sources.iter().copied())
            .map_err(|source| TemplateError::Compile {
                name: entry.to_owned(),
                source,
            })?;

        Self::from_parsed(tera, entry, master)
    }

    fn from_parsed(tera: Tera, entry: &str, master: &str) -> Result<Self, TemplateError> {
        // Every page renders through the master layout
        let extends_master = tera
            .get_template(entry)
            .is_ok_and(|template| template.parents.iter().any(|parent| parent == master));
        if !extends_master {
            return Err(TemplateError::MasterMissing {
                name: entry.to_owned(),
                master: master.to_owned(),
            });
        }

        Ok(Self {
            tera,
            entry: entry.to_owned(),
        })
    }

    /// Render into `sink`.
    pub fn render_to(&self, sink: impl Write, data: &Context) -> Result<(), TemplateError> {
        self.tera
            .render_to(&self.entry, data, sink)
            .map_err(|source| TemplateError::Render {
                name: self.entry.clone(),
                source,
            })
    }
}
