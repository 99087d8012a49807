//! File watching functionality using the notify crate.

use crate::bridge::EventBridge;
use crate::error::Result;
use crate::identity::FileStat;
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::fmt;
use std::path::Path;

/// What a change notification says happened to the watched path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    /// Content or metadata changed.
    Change,
    /// The file was renamed or removed; the path may now name something else.
    Rename,
}

/// One notification from the change source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub file_name: String,
}

impl ChangeEvent {
    pub fn change(file_name: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Change,
            file_name: file_name.into(),
        }
    }

    pub fn rename(file_name: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Rename,
            file_name: file_name.into(),
        }
    }
}

/// Keeps an OS-level watch registered until dropped.
pub struct WatchGuard {
    _inner: Box<dyn Send>,
}

impl WatchGuard {
    pub fn new<T: Send + 'static>(inner: T) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

impl fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WatchGuard")
    }
}

/// A path-level change-notification primitive.
///
/// `arm` registers a watch on `path` that pushes every notification into
/// `events` until the returned guard is dropped. It must fail with a
/// not-found error (see [`crate::Error::is_not_found`]) when `path` does not
/// exist.
pub trait ChangeNotifier: Send + Sync + 'static {
    fn arm(&self, path: &Path, events: EventBridge<ChangeEvent>) -> Result<WatchGuard>;
}

/// [`ChangeNotifier`] backed by notify's recommended platform watcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyNotifier;

impl ChangeNotifier for NotifyNotifier {
    fn arm(&self, path: &Path, events: EventBridge<ChangeEvent>) -> Result<WatchGuard> {
        let fallback_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(change) = to_change_event(&event, &fallback_name) {
                        events.push(change);
                    }
                }
                Err(e) => {
                    // Treat as a rescan: the loop re-stats on every event.
                    tracing::warn!(error = %e, "change notification error");
                    events.push(ChangeEvent::change(fallback_name.clone()));
                }
            },
            Config::default(),
        )?;

        watcher.watch(path, RecursiveMode::NonRecursive)?;
        Ok(WatchGuard::new(watcher))
    }
}

/// Maps a notify event onto the two kinds the tail loop distinguishes.
/// Access events other than a writer closing carry no new data and are
/// dropped.
pub(crate) fn to_change_event(event: &Event, fallback_name: &str) -> Option<ChangeEvent> {
    let file_name = event
        .paths
        .first()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback_name.to_string());

    match event.kind {
        EventKind::Modify(ModifyKind::Name(_)) | EventKind::Remove(_) => {
            Some(ChangeEvent::rename(file_name))
        }
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(ChangeEvent::change(file_name)),
        EventKind::Access(_) => None,
        _ => Some(ChangeEvent::change(file_name)),
    }
}

/// One armed watch whose target was confirmed stable at arm time.
///
/// Dropping the session closes its event sequence and unregisters the watch.
pub(crate) struct WatchSession {
    events: EventBridge<ChangeEvent>,
    stat: FileStat,
    _guard: WatchGuard,
}

impl WatchSession {
    pub(crate) fn new(guard: WatchGuard, events: EventBridge<ChangeEvent>, stat: FileStat) -> Self {
        Self {
            events,
            stat,
            _guard: guard,
        }
    }

    /// The stat confirmed when the watch was accepted.
    pub(crate) fn stat(&self) -> &FileStat {
        &self.stat
    }

    pub(crate) fn events(&self) -> EventBridge<ChangeEvent> {
        self.events.clone()
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.events.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TempLogFile;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};
    use std::path::PathBuf;
    use std::time::Duration;

    fn event(kind: EventKind, path: &str) -> Event {
        Event {
            kind,
            paths: vec![PathBuf::from(path)],
            attrs: Default::default(),
        }
    }

    #[test]
    fn test_data_change_maps_to_change() {
        let e = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            "/tmp/test.log",
        );
        assert_eq!(
            to_change_event(&e, "x.log"),
            Some(ChangeEvent::change("test.log"))
        );
    }

    #[test]
    fn test_rename_and_remove_map_to_rename() {
        let renamed = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), "/tmp/a.log");
        let removed = event(EventKind::Remove(RemoveKind::File), "/tmp/a.log");

        assert_eq!(to_change_event(&renamed, "x"), Some(ChangeEvent::rename("a.log")));
        assert_eq!(to_change_event(&removed, "x"), Some(ChangeEvent::rename("a.log")));
    }

    #[test]
    fn test_create_maps_to_change() {
        let e = event(EventKind::Create(CreateKind::File), "/tmp/a.log");
        assert_eq!(to_change_event(&e, "x"), Some(ChangeEvent::change("a.log")));
    }

    #[test]
    fn test_open_access_is_dropped() {
        let e = event(
            EventKind::Access(AccessKind::Open(AccessMode::Read)),
            "/tmp/a.log",
        );
        assert_eq!(to_change_event(&e, "x"), None);
    }

    #[test]
    fn test_missing_path_uses_fallback_name() {
        let e = Event {
            kind: EventKind::Any,
            paths: vec![],
            attrs: Default::default(),
        };
        assert_eq!(
            to_change_event(&e, "test.log"),
            Some(ChangeEvent::change("test.log"))
        );
    }

    #[test]
    fn test_arm_missing_file_is_not_found() {
        let temp_file = TempLogFile::missing().unwrap();
        let err = NotifyNotifier
            .arm(temp_file.path(), EventBridge::new())
            .unwrap_err();

        assert!(err.is_not_found(), "unexpected error: {:?}", err);
    }

    #[tokio::test]
    async fn test_arm_delivers_write_events() {
        let temp_file = TempLogFile::new().unwrap();
        let events = EventBridge::new();
        let _guard = NotifyNotifier.arm(temp_file.path(), events.clone()).unwrap();

        temp_file.append_line("hello").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), events.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.file_name, "test.log");
    }

    #[tokio::test]
    async fn test_dropping_session_closes_events() {
        let temp_file = TempLogFile::new().unwrap();
        let events = EventBridge::new();
        let guard = NotifyNotifier.arm(temp_file.path(), events.clone()).unwrap();
        let stat = FileStat::probe(temp_file.path()).await.unwrap().unwrap();

        let session = WatchSession::new(guard, events, stat);
        let pull = session.events();
        assert_eq!(session.stat().identity, stat.identity);
        drop(session);

        let next = tokio::time::timeout(Duration::from_secs(1), pull.next())
            .await
            .unwrap();
        assert_eq!(next, None);
    }
}
