//! Arming a watch that is provably observing a stable file.
//!
//! Stat, arm and stat again are three separate calls, and a writer can
//! delete, recreate or swap the path between any two of them. A watch is only
//! handed out when the stats taken on either side of arming agree.

use crate::bridge::EventBridge;
use crate::control::BootstrapControl;
use crate::error::Result;
use crate::identity::FileStat;
use crate::watcher::{ChangeEvent, ChangeNotifier, WatchSession};
use std::path::Path;
use std::time::Duration;

pub(crate) enum Bootstrap {
    Ready(WatchSession),
    Cancelled,
}

enum Attempt {
    Stable(WatchSession),
    /// The path vanished before or during arming.
    Absent,
    /// The path changed identity while arming.
    Unstable,
}

/// Retries until a stable watch is armed or `control` is cancelled. A
/// missing path backs off for `retry_interval`; any error other than
/// not-found is returned as is.
pub(crate) async fn bootstrap_watch(
    path: &Path,
    notifier: &dyn ChangeNotifier,
    control: &BootstrapControl,
    retry_interval: Duration,
) -> Result<Bootstrap> {
    let mut waited = false;

    loop {
        if !control.is_running() {
            return Ok(Bootstrap::Cancelled);
        }

        match arm_once(path, notifier).await? {
            Attempt::Stable(session) => {
                if !control.is_running() {
                    drop(session);
                    return Ok(Bootstrap::Cancelled);
                }
                tracing::debug!(path = %path.display(), "watch armed");
                return Ok(Bootstrap::Ready(session));
            }
            Attempt::Absent => {
                if !waited {
                    tracing::debug!(path = %path.display(), "waiting for file to appear");
                    waited = true;
                }
                control.backoff(retry_interval).await;
            }
            Attempt::Unstable => {
                tracing::debug!(path = %path.display(), "file changed while arming watch, retrying");
                tokio::task::yield_now().await;
            }
        }
    }
}

async fn arm_once(path: &Path, notifier: &dyn ChangeNotifier) -> Result<Attempt> {
    let Some(before) = FileStat::probe(path).await? else {
        return Ok(Attempt::Absent);
    };

    let events = EventBridge::new();
    // Lets the consumer drain immediately without waiting for a real write.
    events.push(ChangeEvent::change(file_name(path)));

    let guard = match notifier.arm(path, events.clone()) {
        Ok(guard) => guard,
        Err(e) if e.is_not_found() => {
            events.close();
            return Ok(Attempt::Absent);
        }
        Err(e) => {
            events.close();
            return Err(e);
        }
    };

    let after = match FileStat::probe(path).await {
        Ok(Some(after)) => after,
        Ok(None) => return Ok(Attempt::Absent),
        Err(e) => return Err(e),
    };
    let session = WatchSession::new(guard, events, after);

    if !FileStat::is_stable_pair(&before, &after) {
        return Ok(Attempt::Unstable);
    }
    Ok(Attempt::Stable(session))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
