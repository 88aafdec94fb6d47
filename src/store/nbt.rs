use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::RecordStore;
use crate::error::StoreError;
use crate::record::TerritoryRecord;
use crate::types::TerritoryId;

enum Op {
    Write { id: TerritoryId, path: PathBuf, bytes: Vec<u8> },
    Sync(Sender<()>),
}

/// One NBT file per territory under a directory. Deferred saves are written
/// in order by a background thread; every other call first waits for that
/// queue to drain so reads never see an older copy than was handed over.
/// Deferred writes that fail are reported through `failed_writes`.
#[derive(Debug)]
pub struct NbtStore {
    dir: PathBuf,
    writer: Option<Sender<Op>>,
    failures: Receiver<TerritoryId>,
    thread: Option<JoinHandle<()>>,
}

impl NbtStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        let (writer, queue) = unbounded::<Op>();
        let (failed, failures) = unbounded();
        let thread = std::thread::Builder::new()
            .name("limits-writer".into())
            .spawn(move || {
                for op in queue {
                    match op {
                        Op::Write { id, path, bytes } => {
                            if let Err(err) = write_atomic(&path, &bytes) {
                                log::warn!("deferred write of {} failed: {err}", path.display());
                                let _ = failed.send(id);
                            }
                        }
                        Op::Sync(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            })
            .map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        Ok(Self { dir, writer: Some(writer), failures, thread: Some(thread) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, id: &TerritoryId) -> PathBuf {
        let mut stem = String::with_capacity(id.as_str().len());
        for c in id.as_str().chars() {
            if c.is_ascii_alphanumeric() || c == '-' {
                stem.push(c);
            } else {
                stem.push_str(&format!("_{:02x}", c as u32));
            }
        }
        self.dir.join(stem + ".nbt")
    }

    /// Waits until every queued write has hit the disk.
    fn sync(&self) -> Result<(), StoreError> {
        let writer = self.writer.as_ref().ok_or_else(closed)?;
        let (done, wait) = bounded(1);
        writer.send(Op::Sync(done)).map_err(|_| closed())?;
        wait.recv().map_err(|_| closed())
    }

    fn read(&self, path: &Path) -> Result<TerritoryRecord, StoreError> {
        let bytes = fs::read(path).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
        fastnbt::from_bytes(&bytes).map_err(|source| StoreError::Nbt { path: path.to_path_buf(), source })
    }

    fn encode(&self, record: &TerritoryRecord) -> Result<(PathBuf, Vec<u8>), StoreError> {
        let path = self.path_of(record.id());
        let bytes = fastnbt::to_bytes(record).map_err(|source| StoreError::Nbt { path: path.clone(), source })?;
        Ok((path, bytes))
    }
}

fn closed() -> StoreError {
    StoreError::Unavailable("record writer has shut down".into())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("nbt.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

impl RecordStore for NbtStore {
    fn load(&self, id: &TerritoryId) -> Result<Option<TerritoryRecord>, StoreError> {
        self.sync()?;
        let path = self.path_of(id);
        if !path.exists() {
            return Ok(None);
        }
        self.read(&path).map(Some)
    }

    fn save(&mut self, record: &TerritoryRecord) -> Result<(), StoreError> {
        let (path, bytes) = self.encode(record)?;
        self.sync()?;
        write_atomic(&path, &bytes).map_err(|source| StoreError::Io { path, source })
    }

    fn save_async(&mut self, record: &TerritoryRecord) -> Result<(), StoreError> {
        let (path, bytes) = self.encode(record)?;
        let writer = self.writer.as_ref().ok_or_else(closed)?;
        writer.send(Op::Write { id: record.id().clone(), path, bytes }).map_err(|_| closed())
    }

    fn delete(&mut self, id: &TerritoryId) -> Result<(), StoreError> {
        self.sync()?;
        let path = self.path_of(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn exists(&self, id: &TerritoryId) -> Result<bool, StoreError> {
        self.sync()?;
        Ok(self.path_of(id).exists())
    }

    fn load_all(&self) -> Result<Vec<TerritoryRecord>, StoreError> {
        self.sync()?;
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::Io { path: self.dir.clone(), source })?;
        let mut records = vec![];
        for entry in entries {
            let path = entry.map_err(|source| StoreError::Io { path: self.dir.clone(), source })?.path();
            if path.extension().map_or(true, |ext| ext != "nbt") {
                continue;
            }
            match self.read(&path) {
                Ok(record) => records.push(record),
                Err(err) => log::warn!("skipping unreadable limits record: {err}"),
            }
        }
        Ok(records)
    }

    fn settle(&self) -> Result<(), StoreError> {
        self.sync()
    }
    fn failed_writes(&mut self) -> Vec<TerritoryId> {
        self.failures.try_iter().collect()
    }
}

impl Drop for NbtStore {
    fn drop(&mut self) {
        drop(self.writer.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("limits record writer panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::resolve::Subject;

    fn record(id: &str) -> TerritoryRecord {
        let mut record = TerritoryRecord::new(TerritoryId::new(id), "BSkyBlock");
        record.add(Material::HOPPER, 12);
        record.grant(&Subject::Block(Material::SPAWNER), 3);
        record.set_offset(&Subject::Group("Monsters".into()), -2);
        record.mark_clean();
        record
    }

    #[test]
    fn records_survive_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let saved = record("island-1");
        {
            let mut store = NbtStore::open(dir.path()).unwrap();
            store.save_async(&saved).unwrap();
        }
        let store = NbtStore::open(dir.path()).unwrap();
        assert!(store.exists(saved.id()).unwrap());
        assert_eq!(store.load(saved.id()).unwrap().unwrap(), saved);
    }

    #[test]
    fn delete_follows_queued_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = NbtStore::open(dir.path()).unwrap();
        let saved = record("island-2");
        store.save_async(&saved).unwrap();
        store.delete(saved.id()).unwrap();
        assert!(!store.exists(saved.id()).unwrap());
        assert!(store.load(saved.id()).unwrap().is_none());
    }

    #[test]
    fn failed_deferred_writes_are_reported() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("records");
        let mut store = NbtStore::open(&dir).unwrap();
        let saved = record("island-3");
        fs::remove_dir_all(&dir).unwrap();
        store.save_async(&saved).unwrap();
        store.settle().unwrap();
        assert_eq!(store.failed_writes(), [saved.id().clone()]);
        assert!(store.failed_writes().is_empty());

        fs::create_dir_all(&dir).unwrap();
        store.save_async(&saved).unwrap();
        store.settle().unwrap();
        assert!(store.failed_writes().is_empty());
        assert_eq!(store.load(saved.id()).unwrap().unwrap(), saved);
    }

    #[test]
    fn odd_ids_get_safe_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = NbtStore::open(dir.path()).unwrap();
        let saved = record("BSkyBlock/3f2a:x");
        store.save(&saved).unwrap();
        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id(), saved.id());
        assert!(store.path_of(saved.id()).starts_with(store.dir()));
    }
}
