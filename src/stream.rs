//! The tailing state machine and the stream that drives it.

use crate::bootstrap::{Bootstrap, bootstrap_watch};
use crate::bridge::EventBridge;
use crate::error::Result;
use crate::identity::{FileIdentity, FileStat};
use crate::reader::OpenFile;
use crate::tailer::Shared;
use crate::watcher::ChangeEvent;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Open the file and arm a fresh watch.
    Opening,
    /// Read until no more data is available, then continue as given.
    Draining(AfterDrain),
    /// Wait for the next change event.
    Watching,
    Finished,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AfterDrain {
    /// First drain of a cycle: the handle must match the watched identity.
    VerifyIdentity(FileIdentity),
    Watch,
    /// The path was rotated; start a new cycle.
    Reopen,
}

/// Owns the open file and pulls change events, producing lines one at a
/// time. Each call to [`next_line`](Self::next_line) runs until a line is
/// available or the loop ends.
pub(crate) struct TailLoop {
    shared: Arc<Shared>,
    file: Option<OpenFile>,
    events: Option<EventBridge<ChangeEvent>>,
    pending: VecDeque<String>,
    phase: Phase,
}

impl TailLoop {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            file: None,
            events: None,
            pending: VecDeque::new(),
            phase: Phase::Opening,
        }
    }

    fn info(&self, message: fmt::Arguments<'_>) {
        self.shared.options.log_sink().info(message);
    }

    /// Returns the next line, `Ok(None)` once the loop has stopped.
    pub(crate) async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            if !self.shared.control.is_running() {
                self.finish();
                return Ok(None);
            }
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }

            match self.phase {
                Phase::Opening => self.start_cycle().await?,
                Phase::Draining(then) => self.drain_step(then).await?,
                Phase::Watching => self.watch_step().await?,
                Phase::Finished => return Ok(None),
            }
        }
    }

    async fn start_cycle(&mut self) -> Result<()> {
        let shared = Arc::clone(&self.shared);
        let path = shared.path.as_path();
        let chunk_size = shared.options.chunk_size();

        self.file = OpenFile::open(path, chunk_size).await?;
        if self.file.is_none() {
            self.info(format_args!("{} does not exist yet, waiting", path.display()));
        }

        let session = match bootstrap_watch(
            path,
            shared.options.notifier(),
            &shared.control,
            shared.options.retry_interval(),
        )
        .await?
        {
            Bootstrap::Ready(session) => session,
            Bootstrap::Cancelled => {
                self.finish();
                return Ok(());
            }
        };

        let confirmed = session.stat().identity;
        self.events = Some(session.events());
        shared.install_watch(session);

        // The file may have been created while the watch was being armed.
        if self.file.is_none() {
            self.file = OpenFile::open(path, chunk_size).await?;
        }

        self.phase = Phase::Draining(AfterDrain::VerifyIdentity(confirmed));
        Ok(())
    }

    async fn drain_step(&mut self, then: AfterDrain) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            if file.read_chunk(&mut self.pending).await? > 0 {
                return Ok(());
            }
        }

        match then {
            AfterDrain::VerifyIdentity(confirmed) => self.verify_identity(confirmed),
            AfterDrain::Watch => self.phase = Phase::Watching,
            AfterDrain::Reopen => {
                self.file = None;
                self.phase = Phase::Opening;
            }
        }
        Ok(())
    }

    fn verify_identity(&mut self, confirmed: FileIdentity) {
        let shared = Arc::clone(&self.shared);
        let path = shared.path.display();

        match self.file.as_ref().map(OpenFile::identity) {
            None => {
                self.info(format_args!("{} vanished after the watch was armed, restarting", path));
                self.restart();
            }
            Some(opened) if opened != confirmed => {
                self.info(format_args!("{} was replaced while opening, restarting", path));
                self.restart();
            }
            Some(_) => self.phase = Phase::Watching,
        }
    }

    async fn watch_step(&mut self) -> Result<()> {
        let Some(events) = self.events.clone() else {
            self.finish();
            return Ok(());
        };

        let Some(event) = events.next().await else {
            tracing::debug!(path = %self.shared.path.display(), "watch closed");
            self.finish();
            return Ok(());
        };
        tracing::debug!(kind = ?event.kind, file = %event.file_name, "change event");

        let shared = Arc::clone(&self.shared);
        let current = FileStat::probe(&shared.path).await?;
        let Some(file) = self.file.as_mut() else {
            self.restart();
            return Ok(());
        };

        match current {
            Some(stat) if stat.identity == file.identity() => {
                if file.was_truncated(&stat) {
                    file.rewind().await?;
                    self.info(format_args!(
                        "{} was truncated, reading from the start",
                        shared.path.display()
                    ));
                }
                self.phase = Phase::Draining(AfterDrain::Watch);
            }
            _ => {
                self.info(format_args!("{} was rotated, reopening", shared.path.display()));
                // The old handle may still hold bytes written before the swap.
                self.release_watch();
                self.phase = Phase::Draining(AfterDrain::Reopen);
            }
        }
        Ok(())
    }

    fn release_watch(&mut self) {
        self.events = None;
        self.shared.release_watch();
    }

    /// Drops the file and watch of this cycle and starts over.
    fn restart(&mut self) {
        self.release_watch();
        self.file = None;
        self.phase = Phase::Opening;
    }

    fn finish(&mut self) {
        self.release_watch();
        self.file = None;
        self.pending.clear();
        self.phase = Phase::Finished;
    }
}

impl Drop for TailLoop {
    fn drop(&mut self) {
        self.release_watch();
        self.shared.deactivate();
    }
}

/// A stream of lines from a [`Tailer`](crate::Tailer).
///
/// Ends when the tailer is stopped or its watch closes without a rotation.
/// A fatal error is yielded once, after which the stream ends.
pub struct LineStream {
    inner: Pin<Box<dyn Stream<Item = Result<String>> + Send>>,
}

impl LineStream {
    pub(crate) fn new(tail: TailLoop) -> Self {
        let inner = stream::unfold(Some(tail), |state| async move {
            let mut tail = state?;
            match tail.next_line().await {
                Ok(Some(line)) => Some((Ok(line), Some(tail))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
        .fuse();

        LineStream {
            inner: Box::pin(inner),
        }
    }

    /// Waits for the next line.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        self.next().await.transpose()
    }
}

impl fmt::Debug for LineStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineStream").finish_non_exhaustive()
    }
}

impl Stream for LineStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
