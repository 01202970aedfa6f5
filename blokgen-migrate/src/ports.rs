//! Ports the migration runner drives, plus in-memory implementations.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use blokgen_types::ContentEntry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

/// Identity of the remote space an API client talks to. Never carries the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub space_id: String,
    pub base_url: String,
}

/// Remote content API.
///
/// Calls are awaited one at a time; implementations need not support concurrent use
/// beyond being shareable.
#[async_trait]
pub trait ContentApi: Send + Sync {
    fn credentials(&self) -> ApiCredentials;

    /// Every entry whose content contains at least one blok of `component`.
    async fn get_entries(&self, component: &str) -> anyhow::Result<Vec<ContentEntry>>;

    /// Replace the remote entry with `entry` and return what the API stored.
    async fn put_entry(&self, entry: &ContentEntry) -> anyhow::Result<ContentEntry>;
}

/// The rollback directory.
pub trait RollbackStore: Send + Sync {
    /// File names in the directory; empty when it does not exist yet.
    fn list(&self) -> anyhow::Result<Vec<String>>;

    fn read(&self, file_name: &str) -> anyhow::Result<Vec<u8>>;

    /// Write `contents` only if `file_name` does not exist. `Ok(false)` when it already does.
    ///
    /// Check and write are one atomic step, so two batches racing on the same file cannot
    /// both win.
    fn create_new(&self, file_name: &str, contents: &[u8]) -> anyhow::Result<bool>;

    fn exists(&self, file_name: &str) -> anyhow::Result<bool>;

    fn remove(&self, file_name: &str) -> anyhow::Result<()>;
}

/// Caller-supplied edit applied to each fetched entry, in place.
pub trait EntryTransform: Send + Sync {
    fn transform(&self, entry: &mut ContentEntry) -> anyhow::Result<()>;
}

impl<F> EntryTransform for F
where
    F: Fn(&mut ContentEntry) -> anyhow::Result<()> + Send + Sync,
{
    fn transform(&self, entry: &mut ContentEntry) -> anyhow::Result<()> {
        self(entry)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> anyhow::Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| anyhow!("in-memory state lock poisoned"))
}

#[derive(Debug, Default)]
pub struct InMemoryRollbackStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryRollbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, file_name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.insert(file_name.into(), contents.into());
        }
        self
    }
}

impl RollbackStore for InMemoryRollbackStore {
    fn list(&self) -> anyhow::Result<Vec<String>> {
        Ok(lock(&self.files)?.keys().cloned().collect())
    }

    fn read(&self, file_name: &str) -> anyhow::Result<Vec<u8>> {
        lock(&self.files)?
            .get(file_name)
            .cloned()
            .with_context(|| format!("no such rollback file: {file_name}"))
    }

    fn create_new(&self, file_name: &str, contents: &[u8]) -> anyhow::Result<bool> {
        let mut files = lock(&self.files)?;
        if files.contains_key(file_name) {
            return Ok(false);
        }
        files.insert(file_name.to_string(), contents.to_vec());
        Ok(true)
    }

    fn exists(&self, file_name: &str) -> anyhow::Result<bool> {
        Ok(lock(&self.files)?.contains_key(file_name))
    }

    fn remove(&self, file_name: &str) -> anyhow::Result<()> {
        lock(&self.files)?
            .remove(file_name)
            .map(|_| ())
            .with_context(|| format!("no such rollback file: {file_name}"))
    }
}

/// Content API backed by a list of documents, keyed by entry id.
#[derive(Debug)]
pub struct InMemoryContentApi {
    credentials: ApiCredentials,
    entries: Mutex<Vec<ContentEntry>>,
    failing_puts: Mutex<BTreeSet<String>>,
    put_log: Mutex<Vec<String>>,
}

impl InMemoryContentApi {
    pub fn new(entries: Vec<ContentEntry>) -> Self {
        Self {
            credentials: ApiCredentials {
                space_id: "in-memory".to_string(),
                base_url: "memory://".to_string(),
            },
            entries: Mutex::new(entries),
            failing_puts: Mutex::new(BTreeSet::new()),
            put_log: Mutex::new(Vec::new()),
        }
    }

    /// Make every push of entry `id` fail.
    pub fn fail_puts_for(self, id: impl Into<String>) -> Self {
        if let Ok(mut failing) = self.failing_puts.lock() {
            failing.insert(id.into());
        }
        self
    }

    pub fn entries(&self) -> anyhow::Result<Vec<ContentEntry>> {
        Ok(lock(&self.entries)?.clone())
    }

    /// Ids of successful pushes, in call order.
    pub fn put_log(&self) -> anyhow::Result<Vec<String>> {
        Ok(lock(&self.put_log)?.clone())
    }
}

#[async_trait]
impl ContentApi for InMemoryContentApi {
    fn credentials(&self) -> ApiCredentials {
        self.credentials.clone()
    }

    async fn get_entries(&self, component: &str) -> anyhow::Result<Vec<ContentEntry>> {
        Ok(lock(&self.entries)?
            .iter()
            .filter(|e| e.contains_component(component))
            .cloned()
            .collect())
    }

    async fn put_entry(&self, entry: &ContentEntry) -> anyhow::Result<ContentEntry> {
        let id = entry.id().context("entry has no id")?;
        if lock(&self.failing_puts)?.contains(&id) {
            anyhow::bail!("simulated failure pushing entry {id}");
        }
        let mut entries = lock(&self.entries)?;
        let slot = entries
            .iter_mut()
            .find(|e| e.id().as_deref() == Some(id.as_str()))
            .with_context(|| format!("entry {id} not found"))?;
        *slot = entry.clone();
        lock(&self.put_log)?.push(id);
        Ok(entry.clone())
    }
}
