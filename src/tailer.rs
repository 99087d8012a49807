//! The per-file tailer handle and the state it shares with its stream.

use crate::config::TailOptions;
use crate::control::BootstrapControl;
use crate::error::{Error, Result};
use crate::stream::{LineStream, TailLoop};
use crate::watcher::WatchSession;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// State visible both to the tail loop and to whoever calls `stop()`.
pub(crate) struct Shared {
    pub(crate) path: PathBuf,
    pub(crate) options: TailOptions,
    pub(crate) control: BootstrapControl,
    active: AtomicBool,
    watch: Mutex<Option<WatchSession>>,
}

impl Shared {
    fn watch_slot(&self) -> MutexGuard<'_, Option<WatchSession>> {
        self.watch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes the active watch so `stop()` can close it. A stop that
    /// raced with the bootstrap closes it right away.
    pub(crate) fn install_watch(&self, session: WatchSession) {
        let previous = self.watch_slot().replace(session);
        drop(previous);

        if !self.control.is_running() {
            self.release_watch();
        }
    }

    pub(crate) fn release_watch(&self) {
        let session = self.watch_slot().take();
        drop(session);
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Follows one file path across rotations.
///
/// Clones share the same instance, so a clone can be moved elsewhere to call
/// [`stop`](Self::stop) while the original is being consumed.
///
/// ```rust,no_run
/// use log_tailer::Tailer;
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let tailer = Tailer::new("app.log")?;
///     let mut lines = tailer.lines()?;
///
///     let stopper = tailer.clone();
///     tokio::spawn(async move {
///         tokio::signal::ctrl_c().await.ok();
///         stopper.stop();
///     });
///
///     while let Some(line) = lines.next().await {
///         println!("{}", line?);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Tailer {
    shared: Arc<Shared>,
}

impl fmt::Debug for Tailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tailer")
            .field("path", &self.shared.path)
            .field("running", &self.shared.control.is_running())
            .field("active", &self.shared.active.load(Ordering::Acquire))
            .finish()
    }
}

impl Tailer {
    /// Creates a tailer for `path` with default options. The file does not
    /// need to exist yet.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_options(path, TailOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(path: P, options: TailOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if path.file_name().is_none() {
            return Err(Error::InvalidPath {
                message: format!("{} does not name a file", path.display()),
            });
        }

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                options,
                control: BootstrapControl::default(),
                active: AtomicBool::new(false),
                watch: Mutex::new(None),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Starts consuming lines. Only one stream may be alive per tailer;
    /// asking for another while it is fails with [`Error::AlreadyTailing`].
    pub fn lines(&self) -> Result<LineStream> {
        if self.shared.active.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyTailing {
                path: self.shared.path.clone(),
            });
        }
        Ok(LineStream::new(TailLoop::new(Arc::clone(&self.shared))))
    }

    /// Ends the line stream, now or as soon as it is started. Idempotent.
    ///
    /// An I/O call already in flight completes, but no line is yielded after
    /// it returns.
    pub fn stop(&self) {
        self.shared.control.cancel();
        self.shared.release_watch();
    }

    pub fn is_stopped(&self) -> bool {
        !self.shared.control.is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_path_without_file_name() {
        for path in ["", "/", ".."] {
            let err = Tailer::new(path).unwrap_err();
            assert!(matches!(err, Error::InvalidPath { .. }), "{}", path);
        }
    }

    #[test]
    fn test_relative_path_is_accepted() {
        let tailer = Tailer::new("app.log").unwrap();
        assert_eq!(tailer.path(), Path::new("app.log"));
        assert!(!tailer.is_stopped());
    }

    #[test]
    fn test_stop_is_idempotent_and_shared_by_clones() {
        let tailer = Tailer::new("app.log").unwrap();
        let clone = tailer.clone();

        clone.stop();
        clone.stop();
        assert!(tailer.is_stopped());
    }

    #[tokio::test]
    async fn test_second_stream_fails_fast() {
        let tailer = Tailer::new("app.log").unwrap();
        let first = tailer.lines().unwrap();

        match tailer.lines() {
            Err(Error::AlreadyTailing { path }) => assert_eq!(path, PathBuf::from("app.log")),
            other => panic!("expected AlreadyTailing, got {:?}", other.map(|_| ())),
        }

        drop(first);
        assert!(tailer.lines().is_ok());
    }
}
