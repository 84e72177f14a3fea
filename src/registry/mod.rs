//! Compiled template registry.
//!
//! One [`Registry`] exists per process, shared as `Arc<Registry>` between the
//! serving layer, the watcher and the rebuild worker.
//!
//! # Thread Safety
//!
//! Uses `RwLock` to allow:
//! - Multiple concurrent renders (`execute`, `exists`, saves)
//! - Exclusive writes (`set`, settings updates)
//!
//! A render holds the read lock for its full duration, so a page is never
//! swapped out from under a reader: it sees either the old page or the new
//! one.

mod error;
mod functions;
mod page;

pub use error::TemplateError;
pub use functions::FunctionTable;
pub use page::Page;

use crate::{log, logger::error_chain};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::{io::Write, path::PathBuf, sync::Arc};
use tera::{Context, Function};

/// Callback receiving render failures that saves swallow.
pub type RenderErrorHook = Arc<dyn Fn(&str, &TemplateError) + Send + Sync>;

/// Where pages come from: set by each directory compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Source directory
    pub dir: PathBuf,
    /// Master (root layout) file name
    pub master: String,
    /// Extra shared file names that exist on disk, in the order given
    pub extra: Vec<String>,
}

impl Settings {
    /// Whether `name` is the master or one of the extras.
    pub fn is_shared(&self, name: &str) -> bool {
        name == self.master || self.extra.iter().any(|e| e == name)
    }
}

#[derive(Debug, Default)]
struct State {
    pages: FxHashMap<String, Page>,
    settings: Settings,
}

/// Thread-safe store of compiled pages plus the function table.
#[derive(Default)]
pub struct Registry {
    state: RwLock<State>,
    functions: RwLock<FunctionTable>,
    render_error_hook: RwLock<Option<RenderErrorHook>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Registry")
            .field("pages", &state.pages.len())
            .field("settings", &state.settings)
            .field("functions", &*self.functions.read())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the page stored under `name`.
    pub fn set(&self, name: &str, page: Page) {
        self.state.write().pages.insert(name.to_owned(), page);
    }

    /// Insert a batch of pages under a single write lock.
    pub(crate) fn set_many(&self, pages: impl IntoIterator<Item = (String, Page)>) {
        self.state.write().pages.extend(pages);
    }

    /// Check whether a page is stored under `name`.
    pub fn exists(&self, name: &str) -> bool {
        self.state.read().pages.contains_key(name)
    }

    /// Render the page `name` into `sink`.
    ///
    /// Returns [`TemplateError::NotFound`] if no such page was compiled.
    pub fn execute(
        &self,
        sink: impl Write,
        name: &str,
        data: &Context,
    ) -> Result<(), TemplateError> {
        let state = self.state.read();
        let page = state
            .pages
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_owned()))?;
        page.render_to(sink, data)
    }

    /// Add or overwrite a function available to templates.
    ///
    /// Only pages compiled after this call can use it; register functions
    /// before the first compile.
    pub fn register_function<F: Function + 'static>(&self, name: &str, function: F) {
        self.functions.write().insert(name, function);
    }

    /// Install a callback for render failures swallowed by saves.
    pub fn set_render_error_hook<F>(&self, hook: F)
    where
        F: Fn(&str, &TemplateError) + Send + Sync + 'static,
    {
        *self.render_error_hook.write() = Some(Arc::new(hook));
    }

    /// Current source settings.
    pub fn settings(&self) -> Settings {
        self.state.read().settings.clone()
    }

    pub(crate) fn set_settings(&self, settings: Settings) {
        self.state.write().settings = settings;
    }

    /// Names of all stored pages, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.read().pages.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.state.read().pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().pages.is_empty()
    }

    /// Snapshot of the function table for a compile.
    pub(crate) fn function_table(&self) -> FunctionTable {
        self.functions.read().clone()
    }

    /// Run `f` for every stored page under the read lock.
    pub(crate) fn with_pages<R>(&self, f: impl FnOnce(&FxHashMap<String, Page>) -> R) -> R {
        f(&self.state.read().pages)
    }

    pub(crate) fn report_render_error(&self, name: &str, err: &TemplateError) {
        match &*self.render_error_hook.read() {
            Some(hook) => hook(name, err),
            None => log!("error"; "{}", error_chain(err)),
        }
    }
}
