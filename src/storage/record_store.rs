use crate::common::{FaceLockError, Result};
use crate::core::recognizer::Embedding;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const STORAGE_VERSION: u32 = 1;

/// One reference encoding for a known identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceEncoding {
    pub label: String,
    pub encoding: Embedding,
}

/// Known identities and their reference encodings, in insertion order.
///
/// The order is significant: it is the tie-break order for majority votes.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CredentialRecordSet {
    pub version: u32,
    pub entries: Vec<ReferenceEncoding>,
}

impl CredentialRecordSet {
    pub fn new() -> Self {
        Self {
            version: STORAGE_VERSION,
            entries: Vec::new(),
        }
    }

    pub fn from_entries<L: Into<String>>(entries: impl IntoIterator<Item = (L, Embedding)>) -> Self {
        let mut set = Self::new();
        for (label, encoding) in entries {
            set.entries.push(ReferenceEncoding { label: label.into(), encoding });
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn add_encodings(&mut self, label: &str, encodings: Vec<Embedding>) {
        self.entries.extend(encodings.into_iter().map(|encoding| ReferenceEncoding {
            label: label.to_string(),
            encoding,
        }));
    }

    /// Drops every encoding for `label`, returning how many were removed.
    pub fn remove_label(&mut self, label: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.label != label);
        before - self.entries.len()
    }

    /// Labels with their encoding counts, in first-seen order.
    pub fn labels(&self) -> Vec<(String, usize)> {
        let mut labels: Vec<(String, usize)> = Vec::new();
        for entry in &self.entries {
            match labels.iter_mut().find(|(label, _)| *label == entry.label) {
                Some((_, count)) => *count += 1,
                None => labels.push((entry.label.clone(), 1)),
            }
        }
        labels
    }
}

pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the record set for the access loop. Missing, corrupt or empty
    /// stores are errors.
    pub fn load(&self) -> Result<CredentialRecordSet> {
        if !self.path.exists() {
            return Err(FaceLockError::Storage(format!(
                "Credential records not found at {}. Enroll at least one identity first.",
                self.path.display()
            )));
        }

        let data = fs::read(&self.path)?;
        let mut records: CredentialRecordSet = bincode::deserialize(&data)
            .map_err(|e| FaceLockError::Storage(format!("Failed to deserialize {}: {}", self.path.display(), e)))?;

        if records.version > STORAGE_VERSION {
            return Err(FaceLockError::Storage(format!(
                "Credential records version {} is newer than supported version {}",
                records.version, STORAGE_VERSION
            )));
        }
        records.version = STORAGE_VERSION;

        if records.is_empty() {
            return Err(FaceLockError::Storage(format!(
                "Credential records at {} contain no identities", self.path.display()
            )));
        }

        tracing::info!(
            "Loaded {} reference encodings for {} identities",
            records.len(),
            records.labels().len()
        );
        Ok(records)
    }

    /// Like `load`, but a missing store yields an empty set (for enrollment).
    pub fn load_or_default(&self) -> Result<CredentialRecordSet> {
        if !self.path.exists() {
            return Ok(CredentialRecordSet::new());
        }
        let data = fs::read(&self.path)?;
        bincode::deserialize(&data)
            .map_err(|e| FaceLockError::Storage(format!("Failed to deserialize {}: {}", self.path.display(), e)))
    }

    pub fn save(&self, records: &CredentialRecordSet) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let encoded = bincode::serialize(records)
            .map_err(|e| FaceLockError::Storage(format!("Failed to serialize: {}", e)))?;

        let tmp_path = self.path.with_extension("bincode.tmp");
        fs::write(&tmp_path, encoded)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn saved_records_keep_insertion_order() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::new(tmp.path().join("encodings.bincode"));

        let mut records = CredentialRecordSet::new();
        records.add_encodings("bob", vec![vec![0.0, 1.0]]);
        records.add_encodings("alice", vec![vec![1.0, 0.0], vec![0.9, 0.1]]);
        store.save(&records).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, records);
        assert_eq!(
            loaded.labels(),
            vec![("bob".to_string(), 1), ("alice".to_string(), 2)]
        );
    }

    #[test]
    fn missing_store_is_fatal_for_load_but_not_for_enrollment() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::new(tmp.path().join("absent.bincode"));

        assert!(matches!(store.load(), Err(FaceLockError::Storage(_))));
        assert!(store.load_or_default().unwrap().is_empty());
    }

    #[test]
    fn corrupt_store_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("encodings.bincode");
        fs::write(&path, b"\xff\xff\xff\xff not bincode").unwrap();

        assert!(matches!(RecordStore::new(path).load(), Err(FaceLockError::Storage(_))));
    }

    #[test]
    fn empty_store_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::new(tmp.path().join("encodings.bincode"));
        store.save(&CredentialRecordSet::new()).unwrap();

        assert!(store.load().is_err());
    }

    #[test]
    fn remove_label_drops_all_its_encodings() {
        let mut records = CredentialRecordSet::from_entries([
            ("alice", vec![1.0]),
            ("bob", vec![2.0]),
            ("alice", vec![3.0]),
        ]);
        assert_eq!(records.remove_label("alice"), 2);
        assert_eq!(records.remove_label("carol"), 0);
        assert_eq!(records.labels(), vec![("bob".to_string(), 1)]);
    }
}
