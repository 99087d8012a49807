//! Tuning knobs for a [`Tailer`](crate::Tailer).

use crate::logging::{LogSink, TracingSink};
use crate::watcher::{ChangeNotifier, NotifyNotifier};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How long the watch bootstrap sleeps while the file does not exist.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Bytes requested per read while draining.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Options for a [`Tailer`](crate::Tailer).
///
/// ```rust
/// use log_tailer::TailOptions;
/// use std::time::Duration;
///
/// let options = TailOptions::default()
///     .with_retry_interval(Duration::from_millis(250))
///     .with_chunk_size(4096);
/// assert_eq!(options.chunk_size(), 4096);
/// ```
#[derive(Clone)]
pub struct TailOptions {
    retry_interval: Duration,
    chunk_size: usize,
    log_sink: Arc<dyn LogSink>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_sink: Arc::new(TracingSink),
            notifier: Arc::new(NotifyNotifier),
        }
    }
}

impl fmt::Debug for TailOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailOptions")
            .field("retry_interval", &self.retry_interval)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl TailOptions {
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Zero is raised to one byte.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_log_sink(mut self, log_sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }

    /// Replaces the change-notification backend.
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub(crate) fn log_sink(&self) -> &dyn LogSink {
        self.log_sink.as_ref()
    }

    pub(crate) fn notifier(&self) -> &dyn ChangeNotifier {
        self.notifier.as_ref()
    }
}
