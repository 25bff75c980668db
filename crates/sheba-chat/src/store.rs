//! Thread persistence: whole-collection snapshots

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{error::Result, thread::Thread};

/// File name of the default history snapshot.
pub const HISTORY_FILE_NAME: &str = "union-sheba-history.json";

/// Durable mapping of thread id to thread.
///
/// Every save replaces the previous snapshot as a whole.
pub trait ThreadStore: Send + Sync {
    /// Load every thread, in creation order. Absent data is an empty list.
    fn load_all(&self) -> Result<Vec<Thread>>;

    /// Replace the stored snapshot with `threads`
    fn save_all(&self, threads: &[Thread]) -> Result<()>;
}

/// Stores all threads as one JSON array in a file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the default history path
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheba")
            .join(HISTORY_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| HISTORY_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl ThreadStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<Thread>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let threads: Vec<Thread> = serde_json::from_str(&content)?;
        Ok(repair(threads))
    }

    fn save_all(&self, threads: &[Thread]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        // Write the new snapshot beside the old one, then swap it in.
        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            serde_json::to_writer_pretty(&mut file, threads)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        tracing::debug!(path = %self.path.display(), threads = threads.len(), "saved history");
        Ok(())
    }
}

/// Bring a loaded snapshot back within the thread invariants: no message
/// left streaming, no duplicate thread ids.
fn repair(threads: Vec<Thread>) -> Vec<Thread> {
    let mut seen = HashSet::new();
    threads
        .into_iter()
        .filter(|thread| {
            let fresh = seen.insert(thread.id.clone());
            if !fresh {
                tracing::warn!(id = %thread.id, "dropping duplicate thread in history");
            }
            fresh
        })
        .map(|mut thread| {
            for message in &mut thread.messages {
                message.is_streaming = false;
            }
            thread
        })
        .collect()
}

/// Keeps the snapshot in memory only
#[derive(Debug, Default)]
pub struct MemoryStore {
    threads: Mutex<Vec<Thread>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing snapshot
    pub fn with_threads(threads: Vec<Thread>) -> Self {
        Self {
            threads: Mutex::new(threads),
            saves: Mutex::new(0),
        }
    }

    /// The last saved snapshot
    pub fn snapshot(&self) -> Vec<Thread> {
        self.threads.lock().clone()
    }

    /// How many times `save_all` has been called
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

impl ThreadStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<Thread>> {
        Ok(self.threads.lock().clone())
    }

    fn save_all(&self, threads: &[Thread]) -> Result<()> {
        *self.threads.lock() = threads.to_vec();
        *self.saves.lock() += 1;
        Ok(())
    }
}
