use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// File name of the log inside its data directory.
pub const LOG_FILE: &str = "commits.log";

#[derive(Serialize)]
struct EntryRef<'a, R> {
    seq: u64,
    record: &'a R,
}

#[derive(Deserialize)]
struct Entry<R> {
    seq: u64,
    record: R,
}

/// Append-only JSON-lines log of committed records.
///
/// Each record is written as a single line and synced before `append`
/// returns, so a record is either fully durable or absent. A torn final
/// line left by a crash is discarded on open.
pub struct CommitLog<R> {
    path: PathBuf,
    file: File,
    /// Byte length of the durable prefix
    offset: u64,
    next_seq: u64,
    _record: PhantomData<fn() -> R>,
}

impl<R: Serialize + DeserializeOwned> CommitLog<R> {
    /// Open (or create) the log in `dir` and return every committed record.
    pub fn open(dir: &Path) -> Result<(Self, Vec<R>), StorageError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOG_FILE);

        let content = if path.exists() { fs::read(&path)? } else { Vec::new() };

        let mut records = Vec::new();
        let mut offset = 0usize;
        let mut line_no = 0usize;

        while offset < content.len() {
            line_no += 1;
            let rest = &content[offset..];
            let Some(end) = rest.iter().position(|&b| b == b'\n') else {
                tracing::warn!(
                    path = %path.display(),
                    bytes = rest.len(),
                    "Discarding torn record at end of commit log"
                );
                break;
            };

            let entry: Entry<R> =
                serde_json::from_slice(&rest[..end]).map_err(|e| StorageError::Corrupt {
                    line: line_no,
                    reason: e.to_string(),
                })?;

            let expected = records.len() as u64 + 1;
            if entry.seq != expected {
                return Err(StorageError::Corrupt {
                    line: line_no,
                    reason: format!("expected seq {}, found {}", expected, entry.seq),
                });
            }

            records.push(entry.record);
            offset += end + 1;
        }
        let offset = offset as u64;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        if file.metadata()?.len() != offset {
            file.set_len(offset)?;
        }

        tracing::info!(path = %path.display(), records = records.len(), "Commit log opened");

        let log = Self {
            path,
            file,
            offset,
            next_seq: records.len() as u64 + 1,
            _record: PhantomData,
        };
        Ok((log, records))
    }

    /// Durably append one record and return its sequence number.
    pub fn append(&mut self, record: &R) -> Result<u64, StorageError> {
        let seq = self.next_seq;
        let mut line = serde_json::to_vec(&EntryRef { seq, record })?;
        line.push(b'\n');

        let written = self.file.write_all(&line).and_then(|_| self.file.sync_data());
        if let Err(e) = written {
            // Drop any partial bytes so the next append starts on a clean line.
            let _ = self.file.set_len(self.offset);
            return Err(e.into());
        }

        self.offset += line.len() as u64;
        self.next_seq += 1;
        Ok(seq)
    }

    /// Number of committed records.
    pub fn len(&self) -> u64 {
        self.next_seq - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
