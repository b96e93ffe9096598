//! Persistence Gateway — one serialized [`Record`] in one durable slot.
//!
//! Saving is fire-and-forget: failures are logged, never returned. Loading
//! treats an empty slot and a corrupt slot the same way (`None`), so startup
//! always ends with a usable record.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::Record;

/// Fixed logical key of the slot.
pub const SLOT_KEY: &str = "cvData";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("slot I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("slot content is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Raw storage behind the gateway: a single string value.
pub trait SlotBackend: Send + Sync {
    fn read(&self) -> io::Result<Option<String>>;
    fn write(&self, contents: &str) -> io::Result<()>;
}

/// `<dir>/cvData.json`, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(format!("{SLOT_KEY}.json")),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SlotBackend for FileSlot {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, contents: &str) -> io::Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

pub struct PersistenceGateway {
    backend: Arc<dyn SlotBackend>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl PersistenceGateway {
    pub fn new(backend: Arc<dyn SlotBackend>) -> Self {
        Self {
            backend,
            last_saved_at: None,
        }
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// Overwrites the slot with `record`. Errors are logged and swallowed.
    ///
    /// Writes stay in call order. On a multi-threaded runtime the blocking
    /// write runs under `block_in_place` so the worker's other tasks move.
    pub fn save(&mut self, record: &Record) {
        let outcome = match Handle::try_current().map(|h| h.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => task::block_in_place(|| self.try_save(record)),
            _ => self.try_save(record),
        };
        match outcome {
            Ok(()) => {
                self.last_saved_at = Some(Utc::now());
                debug!(key = SLOT_KEY, "Record saved");
            }
            Err(e) => warn!(key = SLOT_KEY, "Failed to save record: {e}"),
        }
    }

    /// Reads the slot. `None` when nothing was saved yet, or when the slot
    /// cannot be read or parsed.
    pub fn load(&self) -> Option<Record> {
        match self.try_load() {
            Ok(Some(record)) => {
                info!(key = SLOT_KEY, "Record hydrated from slot");
                Some(record)
            }
            Ok(None) => {
                info!(key = SLOT_KEY, "Slot is empty, starting with a blank record");
                None
            }
            Err(e) => {
                warn!(key = SLOT_KEY, "Ignoring unusable slot content: {e}");
                None
            }
        }
    }

    /// `load()` with the blank-record fallback applied.
    pub fn load_or_default(&self) -> Record {
        self.load().unwrap_or_default()
    }

    fn try_save(&self, record: &Record) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(record)?;
        self.backend.write(&json)?;
        Ok(())
    }

    fn try_load(&self) -> Result<Option<Record>, PersistenceError> {
        match self.backend.read()? {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
pub use memory::MemorySlot;

#[cfg(test)]
mod memory {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::SlotBackend;

    /// In-process slot. Counts writes so tests can assert persist frequency.
    #[derive(Debug, Default)]
    pub struct MemorySlot {
        contents: Mutex<Option<String>>,
        writes: AtomicUsize,
    }

    impl MemorySlot {
        pub fn with_contents(contents: impl Into<String>) -> Self {
            Self {
                contents: Mutex::new(Some(contents.into())),
                writes: AtomicUsize::new(0),
            }
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn contents(&self) -> Option<String> {
            self.contents.lock().ok().and_then(|c| c.clone())
        }
    }

    impl SlotBackend for MemorySlot {
        fn read(&self) -> io::Result<Option<String>> {
            Ok(self.contents())
        }

        fn write(&self, contents: &str) -> io::Result<()> {
            let mut slot = self
                .contents
                .lock()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "memory slot poisoned"))?;
            *slot = Some(contents.to_string());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectEntry, SkillEntry, WorkExperienceEntry};

    fn filled() -> Record {
        let mut record = Record::default();
        record.personal_details.name = "Grace Hopper".into();
        record.personal_details.profile_picture = "data:image/png;base64,AAAA".into();
        record.professional_summary = "Compiler pioneer.\nSecond line.".into();
        record.work_experience.push(WorkExperienceEntry {
            title: "Rear Admiral".into(),
            company: "US Navy".into(),
            description: "COBOL".into(),
        });
        record.skills.push(SkillEntry { skill: "Debugging".into() });
        record.projects.push(ProjectEntry {
            name: "A-0".into(),
            description: "First compiler".into(),
        });
        record
    }

    #[test]
    fn test_round_trip_memory_slot() {
        let slot = Arc::new(MemorySlot::default());
        let mut gateway = PersistenceGateway::new(slot.clone());
        let record = filled();
        gateway.save(&record);
        assert_eq!(gateway.load(), Some(record));
        assert_eq!(slot.writes(), 1);
        assert!(gateway.last_saved_at().is_some());
    }

    #[test]
    fn test_empty_slot_loads_none() {
        let gateway = PersistenceGateway::new(Arc::new(MemorySlot::default()));
        assert_eq!(gateway.load(), None);
        assert_eq!(gateway.load_or_default(), Record::default());
    }

    #[test]
    fn test_corrupt_slot_falls_back_to_default() {
        for raw in ["{not json", "[1,2,3]", r#"{"workExperience":"oops"}"#, "null"] {
            let gateway = PersistenceGateway::new(Arc::new(MemorySlot::with_contents(raw)));
            assert_eq!(gateway.load(), None, "input {raw:?} should be rejected");
            assert_eq!(gateway.load_or_default(), Record::default());
        }
    }

    #[test]
    fn test_save_overwrites_previous_value() {
        let slot = Arc::new(MemorySlot::default());
        let mut gateway = PersistenceGateway::new(slot.clone());
        gateway.save(&filled());
        gateway.save(&Record::default());
        assert_eq!(gateway.load(), Some(Record::default()));
        assert_eq!(slot.writes(), 2);
    }

    #[test]
    fn test_file_slot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path()).unwrap();
        assert!(slot.path().ends_with("cvData.json"));

        let mut gateway = PersistenceGateway::new(Arc::new(slot.clone()));
        assert_eq!(gateway.load(), None);
        gateway.save(&filled());

        let reopened = PersistenceGateway::new(Arc::new(FileSlot::new(dir.path()).unwrap()));
        assert_eq!(reopened.load(), Some(filled()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_save_inside_multi_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let mut gateway = PersistenceGateway::new(Arc::new(FileSlot::new(dir.path()).unwrap()));
        gateway.save(&filled());
        gateway.save(&Record::default());
        assert!(gateway.last_saved_at().is_some());
        assert_eq!(gateway.load(), Some(Record::default()));
    }

    #[tokio::test]
    async fn test_save_inside_current_thread_runtime() {
        let slot = Arc::new(MemorySlot::default());
        let mut gateway = PersistenceGateway::new(slot.clone());
        gateway.save(&filled());
        assert_eq!(slot.writes(), 1);
    }

    #[test]
    fn test_file_slot_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path()).unwrap();
        fs::write(slot.path(), "<<garbage>>").unwrap();
        let gateway = PersistenceGateway::new(Arc::new(slot));
        assert_eq!(gateway.load_or_default(), Record::default());
    }
}
