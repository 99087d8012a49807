//! A library that follows a single log file as a stream of lines, surviving
//! rotation.
//!
//! Lines are separated by CRLF. When the writer deletes, renames away,
//! recreates or truncates the file, the stream finishes reading the old file
//! and carries on with the new one: every line written while the file is
//! being followed is yielded once, in order.
//!
//! # Example
//!
//! ```rust,no_run
//! use log_tailer::tail_file;
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut lines = tail_file("app.log")?;
//!
//!     while let Some(line) = lines.next().await {
//!         match line {
//!             Ok(line) => println!("{}", line),
//!             Err(e) => eprintln!("Error: {}", e),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

mod bootstrap;
mod bridge;
mod config;
mod control;
mod error;
mod identity;
mod logging;
mod reader;
mod stream;
mod tailer;
mod watcher;

#[cfg(test)]
mod test_helpers;

pub use bridge::EventBridge;
pub use config::{DEFAULT_CHUNK_SIZE, DEFAULT_RETRY_INTERVAL, TailOptions};
pub use error::{Error, Result};
pub use identity::{FileIdentity, FileStat, Timestamp};
pub use logging::{LogSink, TracingSink};
pub use reader::LINE_SEPARATOR;
pub use stream::LineStream;
pub use tailer::Tailer;
pub use watcher::{ChangeEvent, ChangeKind, ChangeNotifier, NotifyNotifier, WatchGuard};

use std::path::Path;

/// Follows `path` with default options.
///
/// The returned stream cannot be stopped other than by dropping it; use
/// [`Tailer`] to keep a handle for [`Tailer::stop`].
pub fn tail_file<P: AsRef<Path>>(path: P) -> Result<LineStream> {
    Tailer::new(path)?.lines()
}
