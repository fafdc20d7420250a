//! Content sealing boundary — a storage decorator, not a cipher suite.
//!
//! Hosts that need encryption at rest inject a [`ContentCipher`]; the
//! [`CipherStore`] decorator seals the free-text content of records at
//! or above a configured privacy level on the way in and unseals on the
//! way out. Everything else about the storage contract passes through
//! untouched. No cipher implementation ships here — the boundary is the
//! deliverable, the transform is the host's.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::memory::MemoryRecord;
use crate::storage::{MemoryQuery, MemoryStore, StoreStats};
use crate::types::{MemoryId, PrivacyLevel};

/// Reversible transform applied to record free text.
pub trait ContentCipher: Send + Sync {
    /// Seal a plaintext string.
    ///
    /// # Errors
    /// Implementation-defined.
    fn seal(&self, plaintext: &str) -> Result<String>;

    /// Unseal a previously sealed string.
    ///
    /// # Errors
    /// Implementation-defined.
    fn unseal(&self, sealed: &str) -> Result<String>;

    /// A human-readable name for diagnostics.
    fn name(&self) -> &str;
}

/// The identity transform — the default when no cipher is injected.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCipher;

impl ContentCipher for PassthroughCipher {
    fn seal(&self, plaintext: &str) -> Result<String> {
        Ok(plaintext.to_string())
    }

    fn unseal(&self, sealed: &str) -> Result<String> {
        Ok(sealed.to_string())
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}

/// Storage decorator sealing content for sensitive records.
pub struct CipherStore {
    inner: MemoryStore,
    cipher: Box<dyn ContentCipher>,
    min_level: PrivacyLevel,
}

impl std::fmt::Debug for CipherStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherStore")
            .field("cipher", &self.cipher.name())
            .field("min_level", &self.min_level)
            .finish_non_exhaustive()
    }
}

impl CipherStore {
    /// Wrap a store; records at or above `min_level` get sealed.
    #[must_use]
    pub fn new(
        inner: MemoryStore,
        cipher: Box<dyn ContentCipher>,
        min_level: PrivacyLevel,
    ) -> Self {
        Self {
            inner,
            cipher,
            min_level,
        }
    }

    fn protected(&self, record: &MemoryRecord) -> bool {
        record.privacy >= self.min_level
    }

    fn sealed(&self, mut record: MemoryRecord) -> Result<MemoryRecord> {
        if self.protected(&record) {
            record.content.map_text(|text| self.cipher.seal(text))?;
        }
        Ok(record)
    }

    fn unsealed(&self, mut record: MemoryRecord) -> Result<MemoryRecord> {
        if self.protected(&record) {
            record.content.map_text(|text| self.cipher.unseal(text))?;
        }
        Ok(record)
    }

    /// Validate and store, sealing protected content first.
    ///
    /// Validation runs on the plaintext record, so sealing can never
    /// mask an invalid one.
    ///
    /// # Errors
    /// Propagates validation and cipher failures.
    pub fn store(&mut self, record: MemoryRecord) -> Result<()> {
        record.validate()?;
        let sealed = self.sealed(record)?;
        self.inner.store(sealed)
    }

    /// Fetch and unseal, bumping access statistics.
    ///
    /// # Errors
    /// Propagates cipher failures.
    pub fn retrieve(
        &mut self,
        id: &MemoryId,
        now: DateTime<Utc>,
    ) -> Result<Option<MemoryRecord>> {
        match self.inner.retrieve(id, now) {
            Some(record) => Ok(Some(self.unsealed(record)?)),
            None => Ok(None),
        }
    }

    /// Peek and unseal without touching access statistics.
    ///
    /// # Errors
    /// Propagates cipher failures.
    pub fn get(&self, id: &MemoryId) -> Result<Option<MemoryRecord>> {
        match self.inner.get(id) {
            Some(record) => Ok(Some(self.unsealed(record.clone())?)),
            None => Ok(None),
        }
    }

    /// Query and unseal the results.
    ///
    /// # Errors
    /// Propagates cipher failures.
    pub fn query(&self, query: &MemoryQuery) -> Result<Vec<MemoryRecord>> {
        self.inner
            .query(query)
            .into_iter()
            .map(|record| self.unsealed(record))
            .collect()
    }

    /// Delete, returning the unsealed record.
    ///
    /// # Errors
    /// Propagates not-found and cipher failures.
    pub fn delete(&mut self, id: &MemoryId) -> Result<MemoryRecord> {
        let record = self.inner.delete(id)?;
        self.unsealed(record)
    }

    /// Whether a record exists.
    #[must_use]
    pub fn exists(&self, id: &MemoryId) -> bool {
        self.inner.exists(id)
    }

    /// Total record count.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.count()
    }

    /// Aggregate statistics, untouched by sealing.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        self.inner.stats()
    }

    /// Export the sealed form — protected content stays sealed at rest.
    ///
    /// # Errors
    /// Propagates serialization failures.
    pub fn export_json(&self) -> Result<String> {
        self.inner.export_json()
    }

    /// Import previously exported (sealed) records.
    ///
    /// # Errors
    /// Top-level parse failures only; bad entries are skipped.
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        self.inner.import_json(json)
    }

    /// Borrow the wrapped store.
    #[must_use]
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Unwrap the decorator.
    #[must_use]
    pub fn into_inner(self) -> MemoryStore {
        self.inner
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
