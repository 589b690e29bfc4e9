//! Durable slot for taps the server has not acknowledged yet.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};
use tracing::{error, warn};

pub trait PendingStore: Send {
    /// Never fails; a missing or unreadable value is 0.
    fn get(&self) -> u64;
    fn set(&mut self, amount: u64) -> io::Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PendingFile {
    pending_taps: u64,
}

/// JSON file holding a single counter, one per device profile.
#[derive(Debug)]
pub struct FilePendingStore {
    path: PathBuf,
    amount: u64,
}

impl FilePendingStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let amount = read_amount(&path);
        Self { path, amount }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PendingStore for FilePendingStore {
    fn get(&self) -> u64 {
        self.amount
    }

    /// The in-memory value is updated even when the write fails, so this
    /// process never resends an amount the server already confirmed. The
    /// file keeps the older amount until the next successful write; a crash
    /// before then resends the difference on restart.
    fn set(&mut self, amount: u64) -> io::Result<()> {
        self.amount = amount;
        write_amount(&self.path, amount)
    }
}

fn read_amount(path: &Path) -> u64 {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return 0,
        Err(err) => {
            warn!("failed to read pending file: {err}");
            return 0;
        }
    };
    match serde_json::from_slice::<PendingFile>(&bytes) {
        Ok(file) => file.pending_taps,
        Err(err) => {
            warn!("pending file is corrupt, starting from 0: {err}");
            0
        }
    }
}

fn write_amount(path: &Path, amount: u64) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_vec(&PendingFile { pending_taps: amount })?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&payload)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

#[derive(Debug, Default)]
pub struct MemoryPendingStore {
    amount: u64,
}

impl MemoryPendingStore {
    pub fn new(amount: u64) -> Self {
        Self { amount }
    }
}

impl PendingStore for MemoryPendingStore {
    fn get(&self) -> u64 {
        self.amount
    }

    fn set(&mut self, amount: u64) -> io::Result<()> {
        self.amount = amount;
        Ok(())
    }
}

/// Serializes every read-modify-write on the pending store. The tap path
/// only increments and the reconciler only subtracts what it sent.
pub struct PendingLedger {
    store: Mutex<Box<dyn PendingStore>>,
}

impl PendingLedger {
    pub fn new(store: impl PendingStore + 'static) -> Self {
        Self {
            store: Mutex::new(Box::new(store)),
        }
    }

    pub fn get(&self) -> u64 {
        self.store.lock().unwrap_or_else(PoisonError::into_inner).get()
    }

    /// Records one tap and returns the new pending amount.
    pub fn increment(&self) -> io::Result<u64> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let amount = store.get().saturating_add(1);
        store.set(amount)?;
        Ok(amount)
    }

    /// Removes exactly `sent` taps, keeping anything recorded since the
    /// snapshot was taken. Returns what is left.
    pub fn settle(&self, sent: u64) -> io::Result<u64> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = store.get().saturating_sub(sent);
        if let Err(err) = store.set(remaining) {
            error!(sent, remaining, "failed to persist settled pending amount: {err}");
            return Err(err);
        }
        Ok(remaining)
    }
}
