use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Lock file name inside a data directory
pub const LOCK_FILE: &str = ".momentum.lock";

const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Exclusive write access to one data directory, taken through
/// [`FileStore::lock`](crate::io::blob_store::FileStore::lock).
///
/// The lock file stays in place between runs. While held it carries the
/// holder's pid so a waiting process can say who it is waiting for.
#[derive(Debug)]
pub struct WriteLock {
    file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is locked{}; gave up after {}ms", holder_suffix(.holder), .waited.as_millis())]
    Busy {
        path: PathBuf,
        waited: Duration,
        holder: Option<u32>,
    },
}

fn holder_suffix(holder: &Option<u32>) -> String {
    holder
        .map(|pid| format!(" by process {}", pid))
        .unwrap_or_default()
}

impl WriteLock {
    pub(crate) fn acquire(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        let start = Instant::now();
        while !try_lock(&file) {
            let waited = start.elapsed();
            if waited >= timeout {
                let holder = read_holder(&mut file);
                tracing::warn!(path = %path.display(), ?holder, "data directory is locked");
                return Err(LockError::Busy {
                    path,
                    waited,
                    holder,
                });
            }
            std::thread::sleep(RETRY_INTERVAL.min(timeout - waited));
        }

        // Losing the pid only makes a later Busy error less specific
        if let Err(e) = write_holder(&mut file) {
            tracing::debug!(error = %e, "could not record lock holder");
        }
        Ok(WriteLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        // Removing the file would let a waiter lock an unlinked inode
        let _ = self.file.set_len(0);
    }
}

fn write_holder(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    write!(file, "{}", std::process::id())?;
    file.flush()
}

fn read_holder(file: &mut File) -> Option<u32> {
    let mut text = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut text).ok()?;
    text.trim().parse().ok()
}

#[cfg(unix)]
fn try_lock(file: &File) -> bool {
    use std::os::unix::io::AsRawFd;
    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> bool {
    true
}
