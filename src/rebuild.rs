//! Rebuild worker: turns changed file names into recompiles and re-saves.
//!
//! # Relationship with `watch.rs`
//!
//! ```text
//! watch.rs                         rebuild.rs
//! ────────────────────────────     ────────────────────────────
//! • notify subscription            • Settle delay + coalescing
//! • Temp file filtering            • Shared vs leaf decision
//! • Event classification           • Recompile + re-save
//!         │
//!         └──── bounded queue ────► RebuildWorker::run()
//! ```
//!
//! A change to the master or an extra recompiles the whole directory and
//! rewrites the generated directory. A change to a leaf recompiles and
//! rewrites that page only. Failures are logged and the registry keeps its
//! last good pages.

use crate::{
    log,
    logger::error_chain,
    registry::{Registry, Settings},
};
use crossbeam::channel::Receiver;
use rustc_hash::FxHashSet;
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

/// Default wait after a change before acting on it.
pub const SETTLE: Duration = Duration::from_millis(500);

/// What a batch of changed names requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rebuild {
    /// A shared file changed: recompile every page.
    Directory { trigger: String },
    /// Only leaves changed: recompile these pages.
    Templates(Vec<String>),
}

impl Rebuild {
    /// Decide the rebuild for `names` given the current settings.
    pub fn plan(names: &[String], settings: &Settings) -> Self {
        match names.iter().find(|name| settings.is_shared(name)) {
            Some(trigger) => Self::Directory {
                trigger: trigger.clone(),
            },
            None => Self::Templates(names.to_vec()),
        }
    }
}

/// Base names collected within one settle window, first-seen order.
#[derive(Debug, Default)]
struct Pending {
    names: Vec<String>,
    seen: FxHashSet<String>,
}

impl Pending {
    fn push(&mut self, path: &Path) {
        if let Some(name) = base_name(path)
            && self.seen.insert(name.clone())
        {
            self.names.push(name);
        }
    }

    fn take(&mut self) -> Vec<String> {
        self.seen.clear();
        std::mem::take(&mut self.names)
    }
}

fn base_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
}

/// Single consumer of the change queue.
#[derive(Debug)]
pub struct RebuildWorker {
    registry: Arc<Registry>,
    output: PathBuf,
    settle: Duration,
}

impl RebuildWorker {
    pub fn new(registry: Arc<Registry>, output: PathBuf, settle: Duration) -> Self {
        Self {
            registry,
            output,
            settle,
        }
    }

    /// Run on a dedicated thread until the queue's senders are gone.
    pub fn spawn(self, changes: Receiver<PathBuf>) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("bp-rebuild".into())
            .spawn(move || self.run(&changes))
    }

    /// Process changes one settle window at a time, in arrival order.
    pub fn run(&self, changes: &Receiver<PathBuf>) {
        let mut pending = Pending::default();

        while let Ok(path) = changes.recv() {
            pending.push(&path);
            thread::sleep(self.settle);

            // Saves of the same file during the window collapse into one rebuild
            for path in changes.try_iter() {
                pending.push(&path);
            }

            let names = pending.take();
            if !names.is_empty() {
                self.handle(&names);
            }
        }
    }

    /// Rebuild for a batch of changed base names.
    pub fn handle(&self, names: &[String]) -> Rebuild {
        let settings = self.registry.settings();
        let plan = Rebuild::plan(names, &settings);

        match &plan {
            Rebuild::Directory { trigger } => self.rebuild_directory(&settings, trigger),
            Rebuild::Templates(names) => {
                for name in names {
                    self.rebuild_template(&settings, name);
                }
            }
        }

        plan
    }

    fn rebuild_directory(&self, settings: &Settings, trigger: &str) {
        match self
            .registry
            .compile_directory(&settings.master, &settings.dir, &settings.extra)
        {
            Ok(count) => {
                log!("watch"; "{trigger} changed, recompiled {count} pages");
                if let Err(err) = self.registry.save_all(&self.output) {
                    log!("error"; "{}", error_chain(&err));
                }
            }
            Err(err) => {
                log!("watch"; "recompile failed ({trigger}): {}", error_chain(&err));
            }
        }
    }

    fn rebuild_template(&self, settings: &Settings, name: &str) {
        if settings.dir.join(name).is_dir() {
            return;
        }

        match self
            .registry
            .compile_template(name, &settings.master, &settings.dir, &settings.extra)
        {
            Ok(()) => {
                log!("watch"; "recompiled {name}");
                if let Err(err) = self.registry.save_one(name, &self.output) {
                    log!("error"; "{}", error_chain(&err));
                }
            }
            Err(err) => log!("watch"; "compile failed ({name}): {}", error_chain(&err)),
        }
    }
}
