//! File system watcher for the template directory.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐    ┌────────────────┐    ┌─────────────┐    ┌───────────────┐
//! │ notify   │───▶│ watcher thread │───▶│ queue (10)  │───▶│ rebuild worker│
//! │ events   │    │ filter+classify│    │ (bounded)   │    │ (rebuild.rs)  │
//! └──────────┘    └────────────────┘    └─────────────┘    └───────────────┘
//! ```
//!
//! The queue is bounded: when the worker falls behind, the watcher thread
//! blocks on send instead of buffering without limit.

use crate::{log, rebuild::RebuildWorker, registry::Registry};
use anyhow::{Context, Result, bail};
use crossbeam::channel::{self, Sender};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind};
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, LazyLock, mpsc},
    thread::{self, JoinHandle},
    time::Duration,
};

/// Capacity of the queue between the watcher thread and the worker.
pub const QUEUE_CAPACITY: usize = 10;

/// Temp files written by editors while saving.
static TEMP_FILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i-u)\.tmp$").unwrap());

// =============================================================================
// Event Classification
// =============================================================================

/// Kind of a raw change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Renamed,
    Other,
}

impl ChangeKind {
    pub const fn of(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Created,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Renamed,
            EventKind::Modify(_) => Self::Modified,
            _ => Self::Other,
        }
    }

    /// Deletions and unrecognized kinds never trigger a rebuild.
    pub const fn is_relevant(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// One changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Check if path is a temp/backup file (editor artifacts).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    TEMP_FILE.is_match(name)
        || matches!(ext, "bak" | "swp" | "swo")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Split a raw event into the changes worth forwarding.
pub fn relevant_changes(event: Event) -> impl Iterator<Item = Change> {
    let kind = ChangeKind::of(&event.kind);
    event
        .paths
        .into_iter()
        .filter(|path| !is_temp_file(path))
        .map(move |path| Change { path, kind })
        .filter(|change| change.kind.is_relevant())
}

// =============================================================================
// Watcher Setup
// =============================================================================

/// Live watcher plus its two threads.
///
/// Watching stops when the handle is dropped.
pub struct WatchHandle {
    watcher: RecommendedWatcher,
    forwarder: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").finish_non_exhaustive()
    }
}

impl WatchHandle {
    /// Stop watching and wait for both threads to finish pending work.
    pub fn shutdown(self) {
        let Self {
            watcher,
            forwarder,
            worker,
        } = self;
        drop(watcher);
        forwarder.join().ok();
        worker.join().ok();
    }
}

/// Watch the registry's source directory and keep `output` in sync.
///
/// The directory comes from the settings stored by the last
/// `compile_directory`. Fails if the subscription cannot be created or
/// attached.
pub fn begin_watching(
    registry: Arc<Registry>,
    output: PathBuf,
    settle: Duration,
) -> Result<WatchHandle> {
    let dir = registry.settings().dir;
    if !dir.is_dir() {
        bail!("template directory `{}` does not exist", dir.display());
    }

    let (event_tx, event_rx) = mpsc::channel();
    let mut watcher =
        notify::recommended_watcher(event_tx).context("Failed to create file watcher")?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;

    let (change_tx, change_rx) = channel::bounded(QUEUE_CAPACITY);
    let worker = RebuildWorker::new(registry, output, settle)
        .spawn(change_rx)
        .context("Failed to start rebuild worker")?;
    let forwarder = thread::Builder::new()
        .name("bp-watch".into())
        .spawn(move || forward(event_rx, change_tx))
        .context("Failed to start watcher thread")?;

    log!("watch"; "watching {}", dir.display());

    Ok(WatchHandle {
        watcher,
        forwarder,
        worker,
    })
}

/// Filter raw events and pass changed paths to the worker.
fn forward(events: mpsc::Receiver<notify::Result<Event>>, changes: Sender<PathBuf>) {
    for result in events {
        match result {
            Ok(event) => {
                for change in relevant_changes(event) {
                    log!("watch"; "{:?}: {}", change.kind, change.path.display());
                    // Blocks while the queue is full
                    if changes.send(change.path).is_err() {
                        return;
                    }
                }
            }
            Err(e) => log!("watch"; "error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::tests::{leaf, site};
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};
    use std::{fs, time::Instant};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("/t/Home.html.tmp")));
        assert!(is_temp_file(Path::new("/t/Home.html.TMP")));
        assert!(is_temp_file(Path::new("/t/Home.html.Tmp")));
        assert!(is_temp_file(Path::new("/t/.Home.html.swp")));
        assert!(is_temp_file(Path::new("/t/Home.html~")));
        assert!(!is_temp_file(Path::new("/t/Home.html")));
        assert!(!is_temp_file(Path::new("/t/tmp.html")));
    }

    #[test]
    fn test_change_kind_classification() {
        assert_eq!(
            ChangeKind::of(&EventKind::Create(CreateKind::File)),
            ChangeKind::Created
        );
        assert_eq!(
            ChangeKind::of(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            ChangeKind::Modified
        );
        assert_eq!(
            ChangeKind::of(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
            ChangeKind::Renamed
        );
        assert_eq!(
            ChangeKind::of(&EventKind::Remove(RemoveKind::File)),
            ChangeKind::Other
        );
        assert!(!ChangeKind::Other.is_relevant());
    }

    #[test]
    fn test_relevant_changes_drops_temp_and_removals() {
        let modify = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Any)),
            &["/t/Home.html", "/t/Home.html.tmp"],
        );
        let changes: Vec<_> = relevant_changes(modify).collect();
        assert_eq!(
            changes,
            vec![Change {
                path: PathBuf::from("/t/Home.html"),
                kind: ChangeKind::Modified,
            }]
        );

        let remove = event(EventKind::Remove(RemoveKind::File), &["/t/Home.html"]);
        assert_eq!(relevant_changes(remove).count(), 0);
    }

    #[test]
    fn test_relevant_changes_keeps_both_rename_paths() {
        let rename = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/t/Old.html", "/t/New.html"],
        );
        let paths: Vec<_> = relevant_changes(rename).map(|c| c.path).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/t/Old.html"), PathBuf::from("/t/New.html")]
        );
    }

    #[test]
    fn test_begin_watching_missing_dir_fails() {
        let registry = Arc::new(Registry::new());
        let out = tempfile::tempdir().unwrap();
        // No directory compiled yet: nothing to attach to
        assert!(begin_watching(registry, out.path().to_path_buf(), Duration::ZERO).is_err());
    }

    /// File names and mtimes of everything in `dir`, sorted.
    fn snapshot(dir: &Path) -> Vec<(String, std::time::SystemTime)> {
        let mut entries: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                let modified = entry.metadata().unwrap().modified().unwrap();
                (entry.file_name().into_string().unwrap(), modified)
            })
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_watcher_ignores_temp_only_change() {
        let src = site();
        let out = tempfile::tempdir().unwrap();
        let registry = Arc::new(Registry::new());
        registry
            .compile_directory("Master.html", src.path(), &["Extra.html"])
            .unwrap();
        registry.save_all(out.path()).unwrap();
        let before = snapshot(out.path());

        let settle = Duration::from_millis(50);
        let handle =
            begin_watching(Arc::clone(&registry), out.path().to_path_buf(), settle).unwrap();

        fs::write(src.path().join("X.tmp"), leaf("scratch")).unwrap();
        fs::write(src.path().join("Home.html.TMP"), leaf("scratch")).unwrap();
        // Several settle intervals: time for any rebuild to land
        thread::sleep(settle * 10);
        handle.shutdown();

        assert_eq!(snapshot(out.path()), before);
        assert_eq!(registry.names(), vec!["About.html", "Home.html"]);
    }

    #[test]
    fn test_watcher_recompiles_edited_leaf() {
        let src = site();
        let out = tempfile::tempdir().unwrap();
        let registry = Arc::new(Registry::new());
        registry
            .compile_directory("Master.html", src.path(), &["Extra.html"])
            .unwrap();
        registry.save_all(out.path()).unwrap();

        let settle = Duration::from_millis(50);
        let handle =
            begin_watching(Arc::clone(&registry), out.path().to_path_buf(), settle).unwrap();

        fs::write(src.path().join("Home.html.tmp"), "{% broken").unwrap();
        fs::write(src.path().join("Home.html"), leaf("live")).unwrap();

        let expected = "<html><nav>Home.html</nav>live</html>";
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if fs::read_to_string(out.path().join("Home.html")).is_ok_and(|s| s == expected) {
                break;
            }
            thread::sleep(Duration::from_millis(25));
        }
        handle.shutdown();

        assert_eq!(
            fs::read_to_string(out.path().join("Home.html")).unwrap(),
            expected
        );
        assert!(!registry.exists("Home.html.tmp"));
        assert!(!out.path().join("Home.html.tmp").exists());
    }
}
