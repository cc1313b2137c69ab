use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use faturai_core::{CategoryDefinition, Transaction, TransactionKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::StorageError;

pub const TRANSACTIONS_KEY: &str = "finance_tracker_transactions";
pub const CATEGORIES_KEY: &str = "finance_tracker_categories";
pub const SETTINGS_KEY: &str = "finance_tracker_settings";

/// Free-form application settings.
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Key-value store where every key is one JSON file in a directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let content = match fs::read_to_string(self.path(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StorageError::Json {
                key: key.to_string(),
                source,
            })
    }

    // Written to a sibling temp file first so a crash never leaves half a value.
    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|source| StorageError::Json {
            key: key.to_string(),
            source,
        })?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, self.path(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    pub fn save_transactions(&self, transactions: &[Transaction]) -> Result<(), StorageError> {
        self.write(TRANSACTIONS_KEY, transactions)?;
        debug!(count = transactions.len(), "transactions saved");
        Ok(())
    }

    /// Stored transactions, or an empty list when nothing was saved yet.
    pub fn load_transactions(&self) -> Result<Vec<Transaction>, StorageError> {
        Ok(self.read(TRANSACTIONS_KEY)?.unwrap_or_default())
    }

    /// Appends to the stored list and returns the new total.
    pub fn append_transactions(&self, new: &[Transaction]) -> Result<usize, StorageError> {
        let mut all = self.load_transactions()?;
        all.extend_from_slice(new);
        self.save_transactions(&all)?;
        Ok(all.len())
    }

    /// Removes every transaction imported from `source`; returns how many.
    pub fn remove_source(&self, source: &str) -> Result<usize, StorageError> {
        let mut all = self.load_transactions()?;
        let before = all.len();
        all.retain(|t| t.source.as_deref() != Some(source));
        let removed = before - all.len();
        if removed > 0 {
            self.save_transactions(&all)?;
        }
        Ok(removed)
    }

    /// Reassigns the category of every transaction with the given identity.
    /// Returns how many were changed.
    pub fn set_category(&self, key: &TransactionKey, category: &str) -> Result<usize, StorageError> {
        let mut all = self.load_transactions()?;
        let mut changed = 0;
        for tx in all.iter_mut().filter(|t| &t.key() == key) {
            tx.category = category.to_string();
            changed += 1;
        }
        if changed > 0 {
            self.save_transactions(&all)?;
        }
        Ok(changed)
    }

    pub fn save_user_categories(&self, categories: &[CategoryDefinition]) -> Result<(), StorageError> {
        self.write(CATEGORIES_KEY, categories)
    }

    pub fn load_user_categories(&self) -> Result<Vec<CategoryDefinition>, StorageError> {
        Ok(self.read(CATEGORIES_KEY)?.unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        self.write(SETTINGS_KEY, settings)
    }

    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        Ok(self.read(SETTINGS_KEY)?.unwrap_or_default())
    }

    pub fn clear_all(&self) -> Result<(), StorageError> {
        for key in [TRANSACTIONS_KEY, CATEGORIES_KEY, SETTINGS_KEY] {
            self.remove(key)?;
        }
        Ok(())
    }

    pub fn has_saved_data(&self) -> bool {
        self.path(TRANSACTIONS_KEY).exists()
    }
}
