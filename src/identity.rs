//! File identity and stat snapshots.

use crate::error::Result;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::Path;

/// Identifies one on-disk file instance independently of its path.
///
/// Device and inode are compared as a pair: inode numbers are only unique
/// within a single volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    device: u64,
    inode: u64,
}

impl FileIdentity {
    pub fn new(device: u64, inode: u64) -> Self {
        Self { device, inode }
    }

    pub fn device(&self) -> u64 {
        self.device
    }

    pub fn inode(&self) -> u64 {
        self.inode
    }
}

/// Seconds and nanoseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: i64,
}

/// A stat snapshot of the tailed path or of an open handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileStat {
    pub identity: FileIdentity,
    /// Last content modification.
    pub modified: Timestamp,
    /// Last metadata change (ctime).
    pub changed: Timestamp,
    pub len: u64,
}

impl FileStat {
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            identity: FileIdentity::new(metadata.dev(), metadata.ino()),
            modified: Timestamp {
                secs: metadata.mtime(),
                nanos: metadata.mtime_nsec(),
            },
            changed: Timestamp {
                secs: metadata.ctime(),
                nanos: metadata.ctime_nsec(),
            },
            len: metadata.len(),
        }
    }

    /// Without device/inode numbers the creation time stands in for the
    /// identity, and ctime is not observable.
    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let modified = metadata.modified().map(to_timestamp).unwrap_or_default();
        let created = metadata.created().map(to_timestamp).unwrap_or_default();

        Self {
            identity: FileIdentity::new(0, (created.secs as u64) << 32 | created.nanos as u64),
            modified,
            changed: modified,
            len: metadata.len(),
        }
    }

    /// Stats `path`, returning `Ok(None)` when it does not exist.
    pub async fn probe(path: &Path) -> Result<Option<Self>> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(Some(Self::from_metadata(&metadata))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Decides whether a watch armed between `before` and `after` can be
    /// trusted to observe the same file.
    ///
    /// A changed identity is rejected outright. A ctime change without an
    /// mtime change is the signature of the path being swapped away and back,
    /// so that is rejected too. Two swaps within one timestamp tick are not
    /// detectable here.
    pub fn is_stable_pair(before: &FileStat, after: &FileStat) -> bool {
        if before.identity != after.identity {
            return false;
        }
        !(before.modified == after.modified && before.changed != after.changed)
    }
}

#[cfg(not(unix))]
fn to_timestamp(time: std::time::SystemTime) -> Timestamp {
    match time.duration_since(std::time::UNIX_EPOCH) {
        Ok(d) => Timestamp {
            secs: d.as_secs() as i64,
            nanos: d.subsec_nanos() as i64,
        },
        Err(_) => Timestamp::default(),
    }
}
