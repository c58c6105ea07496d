//! Locked newline-delimited-JSON persistence.
//!
//! One file per record kind at the workspace root. Every operation takes the
//! per-file advisory lock (shared for reads, exclusive for writes) and holds
//! it for exactly one critical section, so many short-lived CLI processes and
//! one daemon can share the files on a single machine.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::lock::FileLock;

/// The record kinds the store persists, one file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Worktrees,
    Workflow,
    Health,
    Activity,
    Projects,
}

impl RecordKind {
    pub fn file_name(self) -> &'static str {
        match self {
            RecordKind::Worktrees => "worktrees.jsonl",
            RecordKind::Workflow => "workflow.jsonl",
            RecordKind::Health => "health.jsonl",
            RecordKind::Activity => "activity.jsonl",
            RecordKind::Projects => "projects.jsonl",
        }
    }
}

/// Handle to the record files under one workspace root.
#[derive(Debug, Clone)]
pub struct Store {
    base_dir: PathBuf,
}

impl Store {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path(&self, kind: RecordKind) -> PathBuf {
        self.base_dir.join(kind.file_name())
    }

    /// Read every record of `kind`, in file order.
    ///
    /// A missing file is an empty sequence, not an error — first use of a
    /// workspace is expected. Lines that fail to parse are skipped: partial
    /// writes and schema drift must never make the whole file unreadable.
    pub fn read_all<T: DeserializeOwned>(&self, kind: RecordKind) -> io::Result<Vec<T>> {
        let path = self.path(kind);
        let lock = FileLock::new(&path)?;
        lock.lock_shared()?;

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(&line) {
                Ok(entry) => entries.push(entry),
                Err(_) => continue, // skip malformed lines
            }
        }
        Ok(entries)
    }

    /// Replace the file's contents with `items`, one JSON line each.
    ///
    /// The exclusive lock spans truncate-and-rewrite, so readers (which also
    /// lock) never observe a half-written file.
    pub fn overwrite<T: Serialize>(&self, kind: RecordKind, items: &[T]) -> io::Result<()> {
        let path = self.path(kind);
        let lock = FileLock::new(&path)?;
        lock.lock_exclusive()?;

        let mut file = File::create(&path)?;
        for item in items {
            let line = serde_json::to_string(item)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writeln!(file, "{line}")?;
        }
        file.flush()
    }

    /// Append one record without reading the rest of the file.
    pub fn append<T: Serialize>(&self, kind: RecordKind, item: &T) -> io::Result<()> {
        let path = self.path(kind);
        let lock = FileLock::new(&path)?;
        lock.lock_exclusive()?;

        let line = serde_json::to_string(item)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(file, "{line}")?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Rec {
        name: String,
        value: u32,
    }

    fn rec(name: &str, value: u32) -> Rec {
        Rec {
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn read_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let got: Vec<Rec> = store.read_all(RecordKind::Workflow).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn overwrite_then_read_roundtrips_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let items = vec![rec("a", 1), rec("b", 2), rec("c", 3)];
        store.overwrite(RecordKind::Worktrees, &items).unwrap();
        let got: Vec<Rec> = store.read_all(RecordKind::Worktrees).unwrap();
        assert_eq!(got, items);
    }

    #[test]
    fn overwrite_with_empty_truncates() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        store
            .overwrite(RecordKind::Health, &[rec("a", 1)])
            .unwrap();
        store.overwrite::<Rec>(RecordKind::Health, &[]).unwrap();
        let got: Vec<Rec> = store.read_all(RecordKind::Health).unwrap();
        assert!(got.is_empty());
    }

    #[test]
    fn append_preserves_call_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        for i in 0..5 {
            store
                .append(RecordKind::Activity, &rec("evt", i))
                .unwrap();
        }
        let got: Vec<Rec> = store.read_all(RecordKind::Activity).unwrap();
        assert_eq!(got.len(), 5);
        for (i, r) in got.iter().enumerate() {
            assert_eq!(r.value, i as u32);
        }
    }

    #[test]
    fn append_after_overwrite_extends() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        store
            .overwrite(RecordKind::Workflow, &[rec("a", 1)])
            .unwrap();
        store.append(RecordKind::Workflow, &rec("b", 2)).unwrap();
        let got: Vec<Rec> = store.read_all(RecordKind::Workflow).unwrap();
        assert_eq!(got, vec![rec("a", 1), rec("b", 2)]);
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let path = store.path(RecordKind::Workflow);
        std::fs::write(
            &path,
            "{\"name\":\"good\",\"value\":1}\nnot json at all\n{\"name\":\"also-good\",\"value\":2}\n",
        )
        .unwrap();

        let got: Vec<Rec> = store.read_all(RecordKind::Workflow).unwrap();
        assert_eq!(got, vec![rec("good", 1), rec("also-good", 2)]);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let path = store.path(RecordKind::Activity);
        std::fs::write(&path, "\n{\"name\":\"a\",\"value\":1}\n\n").unwrap();
        let got: Vec<Rec> = store.read_all(RecordKind::Activity).unwrap();
        assert_eq!(got, vec![rec("a", 1)]);
    }

    #[test]
    fn appends_interleaved_with_reads_stay_ordered() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let writer_store = store.clone();

        let writer = std::thread::spawn(move || {
            for i in 0..50 {
                writer_store
                    .append(RecordKind::Activity, &rec("evt", i))
                    .unwrap();
            }
        });
        // Concurrent reads must always observe a prefix of the appends.
        for _ in 0..10 {
            let seen: Vec<Rec> = store.read_all(RecordKind::Activity).unwrap();
            for (i, r) in seen.iter().enumerate() {
                assert_eq!(r.value, i as u32);
            }
        }
        writer.join().unwrap();

        let got: Vec<Rec> = store.read_all(RecordKind::Activity).unwrap();
        assert_eq!(got.len(), 50);
        for (i, r) in got.iter().enumerate() {
            assert_eq!(r.value, i as u32);
        }
    }

    #[test]
    fn lock_sentinel_sits_beside_data_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        store.append(RecordKind::Worktrees, &rec("a", 1)).unwrap();
        assert!(tmp.path().join("worktrees.jsonl").exists());
        assert!(tmp.path().join("worktrees.jsonl.lock").exists());
        // The sentinel never shows up as data.
        let got: Vec<Rec> = store.read_all(RecordKind::Worktrees).unwrap();
        assert_eq!(got.len(), 1);
    }
}
