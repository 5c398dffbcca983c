use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::{AccessKind, AccessMode};

/// What the watcher does with one changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The path is inside the artifacts directory: our own output.
    SelfWrite,
    /// Inside an open debounce window; dropped.
    Coalesced,
    /// First change of a quiet period; run the change callback.
    Trigger,
}

/// Leading-edge debounce with a fixed window.
///
/// The first event after a quiet period fires immediately and opens a window.
/// Events inside the window are dropped and do not extend it.
#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    opened_at: Option<Instant>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            opened_at: None,
        }
    }

    /// Returns true if an event at `now` should fire.
    pub fn admit(&mut self, now: Instant) -> bool {
        if self.is_pending(now) {
            return false;
        }
        self.opened_at = Some(now);
        true
    }

    /// Whether a window is open at `now`.
    pub fn is_pending(&self, now: Instant) -> bool {
        self.opened_at
            .is_some_and(|opened| now.saturating_duration_since(opened) < self.window)
    }
}

/// Routes changed paths: drops self-writes, then debounces the rest.
#[derive(Debug, Clone)]
pub struct ChangeRouter {
    artifacts_dir: PathBuf,
    debounce: Debounce,
}

impl ChangeRouter {
    /// `artifacts_dir` should already be normalized with [`normalize_path`].
    pub fn new(artifacts_dir: PathBuf, window: Duration) -> Self {
        Self {
            artifacts_dir,
            debounce: Debounce::new(window),
        }
    }

    pub fn route(&mut self, path: &Path, now: Instant) -> Route {
        if is_self_write(path, &self.artifacts_dir) {
            Route::SelfWrite
        } else if self.debounce.admit(now) {
            Route::Trigger
        } else {
            Route::Coalesced
        }
    }
}

/// True if `path` is the artifacts directory or lies beneath it.
///
/// Compares whole path components, so `/out/artifacts-old` is not under
/// `/out/artifacts`.
pub fn is_self_write(path: &Path, artifacts_dir: &Path) -> bool {
    path.starts_with(artifacts_dir)
}

/// Whether a raw notify event describes a content change (create, modify,
/// delete, rename, or a file closed after writing). Plain reads are ignored.
pub fn is_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    }
}

/// Canonicalize `path`, resolving symlinks.
///
/// A path that does not exist yet is resolved through its nearest existing
/// ancestor, with the missing components appended. Falls back to an absolute
/// path if nothing can be canonicalized.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut missing = Vec::new();
    let mut current = absolute.as_path();
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            missing.push(name.to_os_string());
        }
        if let Ok(mut resolved) = parent.canonicalize() {
            for name in missing.iter().rev() {
                resolved.push(name);
            }
            return resolved;
        }
        current = parent;
    }
    absolute
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    const WINDOW: Duration = Duration::from_millis(1000);

    #[test]
    fn test_source_changes_are_not_self_writes() {
        assert!(!is_self_write(
            Path::new("/some/file.js"),
            Path::new("/some/artifacts/dir/")
        ));
    }

    #[test]
    fn test_artifact_changes_are_self_writes() {
        assert!(is_self_write(
            Path::new("/some/artifacts/dir/build.xpi"),
            Path::new("/some/artifacts/dir/")
        ));
        assert!(is_self_write(
            Path::new("/some/artifacts/dir"),
            Path::new("/some/artifacts/dir")
        ));
    }

    #[test]
    fn test_sibling_with_shared_prefix_is_not_a_self_write() {
        assert!(!is_self_write(
            Path::new("/src/web-ext-artifacts-old/a.js"),
            Path::new("/src/web-ext-artifacts")
        ));
    }

    #[test]
    fn test_debounce_fires_on_leading_edge_only() {
        let start = Instant::now();
        let mut debounce = Debounce::new(WINDOW);

        assert!(debounce.admit(start));
        assert!(!debounce.admit(start + Duration::from_millis(10)));
        assert!(!debounce.admit(start + Duration::from_millis(999)));
        assert!(debounce.admit(start + Duration::from_millis(1000)));
    }

    #[test]
    fn test_debounce_window_is_not_extended() {
        let start = Instant::now();
        let mut debounce = Debounce::new(WINDOW);

        assert!(debounce.admit(start));
        // A steady stream of events inside the window does not push it back.
        for ms in (100..1000).step_by(100) {
            assert!(!debounce.admit(start + Duration::from_millis(ms)));
        }
        assert!(debounce.admit(start + Duration::from_millis(1050)));
        assert!(debounce.is_pending(start + Duration::from_millis(1500)));
        assert!(!debounce.is_pending(start + Duration::from_millis(2050)));
    }

    #[test]
    fn test_router_drops_self_writes_without_opening_window() {
        let now = Instant::now();
        let mut router = ChangeRouter::new(PathBuf::from("/src/web-ext-artifacts"), WINDOW);

        assert_eq!(
            router.route(Path::new("/src/web-ext-artifacts/ext-1.0.xpi"), now),
            Route::SelfWrite
        );
        assert_eq!(router.route(Path::new("/src/popup.js"), now), Route::Trigger);
        assert_eq!(
            router.route(Path::new("/src/popup.css"), now + Duration::from_millis(5)),
            Route::Coalesced
        );
    }

    #[test]
    fn test_is_change_ignores_reads() {
        assert!(is_change(&EventKind::Create(CreateKind::File)));
        assert!(is_change(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_change(&EventKind::Remove(RemoveKind::File)));
        assert!(is_change(&EventKind::Access(AccessKind::Close(
            AccessMode::Write
        ))));
        assert!(!is_change(&EventKind::Access(AccessKind::Open(
            AccessMode::Read
        ))));
    }

    #[test]
    fn test_normalize_missing_path_resolves_existing_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not/yet/here");
        let normalized = normalize_path(&missing);
        assert_eq!(
            normalized,
            dir.path().canonicalize().unwrap().join("not/yet/here")
        );
    }
}
