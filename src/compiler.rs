//! Page compilation from a template directory.
//!
//! # Layout
//!
//! ```text
//! templates/
//! ├── Master.html   master: root layout, `{% block content %}`
//! ├── Nav.html      extra: included by the master or pages
//! ├── Home.html     leaf  → page "Home.html"
//! └── About.html    leaf  → page "About.html"
//! ```
//!
//! Each leaf is compiled together with the extras and the master into its own
//! [`Page`]. Leaves compile in parallel; results are stored under one write
//! lock.

use crate::{
    log,
    logger::error_chain,
    registry::{Page, Registry, Settings, TemplateError},
    watch::is_temp_file,
};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

impl Registry {
    /// Compile every leaf file in `dir` against `master` and `extra`.
    ///
    /// Editor artifacts the watcher ignores (`*.tmp`, backups, swap files,
    /// dotfiles) are not leaves. Extras missing from `dir` are dropped with a
    /// warning. The resolved settings are stored for the watcher. A failing
    /// leaf does not stop the others: successfully compiled pages are stored
    /// and the last error (in file name order) is returned.
    ///
    /// Returns the number of pages stored.
    pub fn compile_directory<S: AsRef<str>>(
        &self,
        master: &str,
        dir: &Path,
        extra: &[S],
    ) -> Result<usize, TemplateError> {
        let entries = fs::read_dir(dir).map_err(|source| TemplateError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let extra = resolve_extras(dir, extra);
        let settings = Settings {
            dir: dir.to_path_buf(),
            master: master.to_owned(),
            extra,
        };
        self.set_settings(settings.clone());

        let mut leaves: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
            .filter(|entry| !is_temp_file(&entry.path()))
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| !settings.is_shared(name))
            .collect();
        leaves.sort();

        let functions = self.function_table();
        let results: Vec<_> = leaves
            .par_iter()
            .map(|name| {
                let sources = page_sources(&settings, name);
                (name, Page::compile(name, master, &sources, &functions))
            })
            .collect();

        let mut compiled = Vec::with_capacity(results.len());
        let mut last_error = None;
        for (name, result) in results {
            match result {
                Ok(page) => compiled.push((name.clone(), page)),
                Err(err) => {
                    log!("compile"; "{}", error_chain(&err));
                    last_error = Some(err);
                }
            }
        }

        let count = compiled.len();
        self.set_many(compiled);

        match last_error {
            Some(err) => Err(err),
            None => Ok(count),
        }
    }

    /// Compile the single leaf `name`, replacing its stored page on success.
    ///
    /// Stored settings are left untouched; on failure the previous page (if
    /// any) stays servable.
    pub fn compile_template<S: AsRef<str>>(
        &self,
        name: &str,
        master: &str,
        dir: &Path,
        extra: &[S],
    ) -> Result<(), TemplateError> {
        let settings = Settings {
            dir: dir.to_path_buf(),
            master: master.to_owned(),
            extra: extra.iter().map(|e| e.as_ref().to_owned()).collect(),
        };
        let page = Page::compile(
            name,
            master,
            &page_sources(&settings, name),
            &self.function_table(),
        )?;
        self.set(name, page);
        Ok(())
    }
}

/// Keep the extras that exist in `dir`, warning about the rest.
fn resolve_extras<S: AsRef<str>>(dir: &Path, extra: &[S]) -> Vec<String> {
    extra
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| {
            let exists = dir.join(name).exists();
            if !exists {
                log!("warn"; "extra file `{}` not found in {}, skipping", name, dir.display());
            }
            exists
        })
        .map(str::to_owned)
        .collect()
}

/// Source files for one page: extras, then master, then the leaf itself.
fn page_sources(settings: &Settings, leaf: &str) -> Vec<(PathBuf, String)> {
    settings
        .extra
        .iter()
        .chain([&settings.master])
        .map(String::as_str)
        .chain([leaf])
        .map(|name| (settings.dir.join(name), name.to_owned()))
        .collect()
}
