//! Cross-process manifest locking and atomic file replacement

use fs2::FileExt as _;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};
use trove_core::Result;

/// Exclusive lock guarding a manifest file, shared by every process that
/// touches the same repository.
///
/// The lock lives in a sibling `<manifest>.lock` file and is released on drop.
#[derive(Debug)]
pub struct ManifestLock {
    file: File,
    path: PathBuf,
    // File locks do not exclude threads of one process on every platform.
    _guard: MutexGuard<'static, ()>,
}

impl ManifestLock {
    /// Block until the lock for `manifest_path` is held
    pub fn acquire(manifest_path: &Path) -> Result<Self> {
        let path = lock_path_for(manifest_path);
        let guard = process_lock_for_path(&path)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;
        file.lock_exclusive()?;
        tracing::trace!(path = %path.display(), "acquired manifest lock");

        Ok(Self {
            file,
            path,
            _guard: guard,
        })
    }
}

impl Drop for ManifestLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::debug!(path = %self.path.display(), error = %e, "failed to release manifest lock");
        }
    }
}

fn lock_path_for(manifest_path: &Path) -> PathBuf {
    let mut name: OsString = manifest_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("manifest"));
    name.push(".lock");
    manifest_path.with_file_name(name)
}

fn process_lock_for_path(path: &Path) -> &'static Mutex<()> {
    static PROCESS_LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();
    let locks = PROCESS_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));

    let mut map = locks
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(existing) = map.get(path) {
        return existing;
    }

    let mutex: &'static Mutex<()> = Box::leak(Box::new(Mutex::new(())));
    map.insert(path.to_path_buf(), mutex);
    mutex
}

/// Replace `path` with `bytes` so readers never observe a partial file.
///
/// Writes a temporary file next to the destination, syncs it, then renames
/// it into place.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".trove-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
