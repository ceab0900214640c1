//! Key-value join store
//!
//! Embedded, ordered, disk-backed store holding every auxiliary row under a
//! composite key (`<id>::<code>` or `<id>::<code>::<ordinal>`). Values are
//! field lists serialised as a 4-byte little-endian length followed by the raw
//! bytes of each field, so separators inside fields round-trip untouched.
//!
//! The store is written during ingestion and only read during enrichment.
//! Ingestion commits are non-durable; [`JoinStore::sync`] checkpoints them once
//! the phase is over.

use crate::error::{Result, TransformError};
use redb::{Database, Durability, ReadableTableMetadata, TableDefinition};
use std::path::{Path, PathBuf};

const ROWS: TableDefinition<&str, &[u8]> = TableDefinition::new("rows");

/// File name of the store inside its run directory
pub const STORE_FILE: &str = "join.redb";

/// Serialise a field list as length-prefixed chunks
pub fn serialize<S: AsRef<str>>(fields: &[S]) -> Vec<u8> {
    let size = fields.iter().map(|f| 4 + f.as_ref().len()).sum();
    let mut buf = Vec::with_capacity(size);
    for field in fields {
        let bytes = field.as_ref().as_bytes();
        buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(bytes);
    }
    buf
}

/// Inverse of [`serialize`]; empty input is an empty list
pub fn deserialize(key: &str, mut buf: &[u8]) -> Result<Vec<String>> {
    let corrupt = |message: String| TransformError::CorruptValue {
        key: key.to_string(),
        message,
    };

    let mut fields = Vec::new();
    while !buf.is_empty() {
        let (len, rest) = buf
            .split_first_chunk::<4>()
            .ok_or_else(|| corrupt(format!("truncated length prefix ({} bytes)", buf.len())))?;
        let len = u32::from_le_bytes(*len) as usize;
        if rest.len() < len {
            return Err(corrupt(format!("field of {} bytes, {} available", len, rest.len())));
        }
        let (field, rest) = rest.split_at(len);
        let field = String::from_utf8(field.to_vec()).map_err(|e| corrupt(e.to_string()))?;
        fields.push(field);
        buf = rest;
    }
    Ok(fields)
}

/// Join store backed by a single redb table
pub struct JoinStore {
    db: Database,
    path: PathBuf,
}

impl JoinStore {
    /// Create a fresh store in `dir`
    pub fn create(dir: &Path) -> Result<Self> {
        let path = dir.join(STORE_FILE);
        let db = Database::create(&path).map_err(redb::Error::from)?;
        let store = Self { db, path };
        store.init_table()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn init_table(&self) -> std::result::Result<(), redb::Error> {
        let txn = self.db.begin_write()?;
        txn.open_table(ROWS)?;
        txn.commit()?;
        Ok(())
    }

    /// Write one row, overwriting an existing value under the same key
    pub fn put<S: AsRef<str>>(&self, key: &str, fields: &[S]) -> Result<()> {
        self.put_batch(&[(key.to_string(), serialize(fields))])
    }

    /// Write many pre-serialised rows in one transaction
    pub fn put_batch(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.write_entries(entries)?;
        Ok(())
    }

    fn write_entries(&self, entries: &[(String, Vec<u8>)]) -> std::result::Result<(), redb::Error> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(Durability::None);
        {
            let mut table = txn.open_table(ROWS)?;
            for (key, value) in entries {
                table.insert(key.as_str(), value.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Point lookup; a missing key is `None`
    pub fn get(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.read_value(key)? {
            Some(bytes) => deserialize(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn read_value(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, redb::Error> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ROWS)?;
        Ok(table.get(key)?.map(|guard| guard.value().to_vec()))
    }

    /// Every value whose key starts with `prefix`, in ascending key order
    pub fn get_prefix(&self, prefix: &str) -> Result<Vec<Vec<String>>> {
        self.scan(prefix)?
            .into_iter()
            .map(|(key, bytes)| deserialize(&key, &bytes))
            .collect()
    }

    /// Raw keys and serialised values under `prefix`, in ascending key order
    pub fn entries(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self.scan(prefix)?)
    }

    fn scan(&self, prefix: &str) -> std::result::Result<Vec<(String, Vec<u8>)>, redb::Error> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ROWS)?;
        let mut found = Vec::new();
        for entry in table.range(prefix..)? {
            let (key, value) = entry?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            found.push((key.to_string(), value.value().to_vec()));
        }
        Ok(found)
    }

    /// Number of stored rows
    pub fn len(&self) -> Result<u64> {
        let count = || -> std::result::Result<u64, redb::Error> {
            let txn = self.db.begin_read()?;
            Ok(txn.open_table(ROWS)?.len()?)
        };
        Ok(count()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Durable checkpoint of every non-durable commit so far
    pub fn sync(&self) -> Result<()> {
        let checkpoint = || -> std::result::Result<(), redb::Error> {
            let mut txn = self.db.begin_write()?;
            txn.set_durability(Durability::Immediate);
            txn.commit()?;
            Ok(())
        };
        Ok(checkpoint()?)
    }
}

impl std::fmt::Debug for JoinStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinStore").field("path", &self.path).finish()
    }
}
