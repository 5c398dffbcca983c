pub mod event;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use event::{ChangeRouter, Route, is_change, normalize_path};

/// Quiet period after a triggering change during which further changes are dropped.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Called once per debounced change. Errors are logged and watching continues.
pub type OnChange = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// What to watch and what to ignore.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub source_dir: PathBuf,
    /// Changes under this directory never trigger the callback.
    pub artifacts_dir: PathBuf,
    pub debounce: Duration,
}

impl WatchOptions {
    pub fn new(source_dir: impl Into<PathBuf>, artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            artifacts_dir: artifacts_dir.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Handle to a running watch. Closing or dropping it stops the watch.
pub struct WatchSession {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatchSession {
    /// A session with no OS watch behind it, for callers that supply their own
    /// change source.
    pub fn detached() -> Self {
        Self {
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Token that ends the session when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Close the session when the process receives Ctrl-C.
    ///
    /// Best effort: if the signal handler cannot be installed the session
    /// simply keeps running until closed some other way.
    pub fn close_on_interrupt(&self) {
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                res = tokio::signal::ctrl_c() => match res {
                    Ok(()) => {
                        info!("Interrupted, no longer watching for changes");
                        cancel.cancel();
                    }
                    Err(err) => warn!("could not listen for interrupts: {err}"),
                },
            }
        });
    }

    /// Stop watching. When this returns the OS watch is released and the
    /// change callback will not run again. A rebuild already in progress is
    /// allowed to finish first.
    pub async fn close(mut self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Wait until the session ends (closed through its token or an interrupt).
    pub async fn wait(mut self) {
        self.join().await;
    }

    async fn join(&mut self) {
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
            && err.is_panic()
        {
            error!("watch task panicked: {err}");
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Watch `options.source_dir` recursively and call `on_change` for each
/// debounced change outside `options.artifacts_dir`.
///
/// Must be called from within a tokio runtime.
pub fn watch_source(options: WatchOptions, on_change: OnChange) -> Result<WatchSession> {
    let source_dir = normalize_path(&options.source_dir);
    let artifacts_dir = normalize_path(&options.artifacts_dir);

    // The notify callback runs on the backend's own thread; forward into tokio.
    let (tx, rx) = mpsc::unbounded_channel::<notify::Result<notify::Event>>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let _ = tx.send(res);
    })?;
    watcher.watch(&source_dir, RecursiveMode::Recursive)?;
    debug!("Watching for file changes in {}", source_dir.display());

    let cancel = CancellationToken::new();
    let router = ChangeRouter::new(artifacts_dir, options.debounce);
    let task = tokio::spawn(run_event_loop(
        watcher,
        rx,
        router,
        on_change,
        cancel.clone(),
    ));

    Ok(WatchSession {
        cancel,
        task: Some(task),
    })
}

async fn run_event_loop(
    watcher: RecommendedWatcher,
    mut rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    mut router: ChangeRouter,
    on_change: OnChange,
    cancel: CancellationToken,
) {
    // Dropped when the loop exits, which releases the OS watch.
    let _watcher = watcher;

    loop {
        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            res = rx.recv() => match res {
                Some(res) => res,
                None => break,
            },
        };

        let event = match res {
            Ok(event) => event,
            Err(err) => {
                warn!("watch error: {err}");
                continue;
            }
        };
        if !is_change(&event.kind) {
            continue;
        }

        for path in &event.paths {
            match router.route(path, Instant::now()) {
                Route::SelfWrite => debug!("Ignoring change to: {}", path.display()),
                Route::Coalesced => {}
                Route::Trigger => {
                    info!("Changed: {}", path.display());
                    // Awaited inline so rebuilds never overlap.
                    if let Err(err) = on_change().await {
                        error!("Rebuild failed: {err}");
                    }
                    break;
                }
            }
        }
    }

    debug!("Stopped watching for file changes");
}
