use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches a config root and reports the files that changed in it.
///
/// The callback runs on the watcher's own thread. Dropping the value stops
/// the watch.
pub(crate) struct HotReload {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl HotReload {
    pub(crate) fn start<F>(root: &Path, mut on_change: F) -> notify::Result<Self>
    where
        F: FnMut(&[PathBuf]) + Send + 'static,
    {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            if is_content_change(&event.kind) && !event.paths.is_empty() {
                on_change(&event.paths);
            }
        })?;
        watcher.watch(root, RecursiveMode::NonRecursive)?;
        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

/// Whether `changed` names the same file as `bound`. Watch events may carry
/// canonical paths, so the comparison falls back to file names when both sit
/// in the watched directory.
pub(crate) fn same_file(changed: &Path, bound: &Path) -> bool {
    if changed == bound {
        return true;
    }
    match (changed.file_name(), bound.file_name()) {
        (Some(a), Some(b)) if a == b => match (changed.parent(), bound.parent()) {
            (Some(pa), Some(pb)) => match (pa.canonicalize(), pb.canonicalize()) {
                (Ok(ca), Ok(cb)) => ca == cb,
                _ => true,
            },
            _ => true,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn same_file_matches_by_name_in_same_dir() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("game.cfg");
        assert!(same_file(&a, &a));
        assert!(same_file(&dir.path().join(".").join("game.cfg"), &a));
        assert!(!same_file(&dir.path().join("user.cfg"), &a));
    }

    #[test]
    fn reports_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        let watch = HotReload::start(dir.path(), move |paths| {
            let _ = tx.send(paths.to_vec());
        })
        .unwrap();
        assert_eq!(watch.root(), dir.path());

        let target = dir.path().join("game.cfg");
        std::fs::write(&target, "version=2\n").unwrap();

        let mut seen = false;
        while let Ok(paths) = rx.recv_timeout(Duration::from_secs(5)) {
            if paths.iter().any(|p| same_file(p, &target)) {
                seen = true;
                break;
            }
        }
        assert!(seen);
    }
}
