//! Destination for the tailer's informational messages.

use std::fmt;

/// Receives informational messages about waiting, rotation and restarts.
///
/// The default, [`TracingSink`], forwards to `tracing` at info level.
pub trait LogSink: Send + Sync {
    fn info(&self, message: fmt::Arguments<'_>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn info(&self, message: fmt::Arguments<'_>) {
        tracing::info!("{}", message);
    }
}
