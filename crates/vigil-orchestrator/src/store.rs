//! Persistence collaborators for governance records.
//!
//! Two capabilities are consumed by the orchestrator: model-card lookup
//! and disclosure insertion. Each has an in-memory implementation and a
//! file-backed one under `~/.vigil/`:
//!
//! - `disclosures.jsonl`: one `UsageDisclosure` JSON object per line, append-only
//! - `model_cards.json`: a JSON array of `ModelCard`, maintained externally

use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use vigil_core::types::{ModelCard, ModelCardStatus, UsageDisclosure};
use vigil_core::PersistenceError;

// ─────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────

/// Read-only model-card catalog.
#[async_trait]
pub trait ModelCardStore: Send + Sync {
    /// Card for `(provider, model_name)`. `None` is not an error.
    async fn find(
        &self,
        provider: &str,
        model_name: &str,
    ) -> Result<Option<ModelCard>, PersistenceError>;
}

/// Append-only disclosure sink.
#[async_trait]
pub trait DisclosureStore: Send + Sync {
    /// Insert a disclosure. Returns `false` if a record with the same id
    /// already exists (nothing is written).
    async fn insert(&self, disclosure: &UsageDisclosure) -> Result<bool, PersistenceError>;
}

/// Pick the card for `(provider, model_name)`, preferring active cards.
fn select_card<'a>(
    cards: impl Iterator<Item = &'a ModelCard>,
    provider: &str,
    model_name: &str,
) -> Option<ModelCard> {
    let mut fallback = None;
    for card in cards.filter(|c| c.model_provider == provider && c.model_name == model_name) {
        if card.status == ModelCardStatus::Active {
            return Some(card.clone());
        }
        fallback.get_or_insert_with(|| card.clone());
    }
    fallback
}

// ─────────────────────────────────────────────
// In-memory
// ─────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryModelCardStore {
    cards: Vec<ModelCard>,
}

impl InMemoryModelCardStore {
    pub fn new(cards: Vec<ModelCard>) -> Self {
        Self { cards }
    }
}

#[async_trait]
impl ModelCardStore for InMemoryModelCardStore {
    async fn find(
        &self,
        provider: &str,
        model_name: &str,
    ) -> Result<Option<ModelCard>, PersistenceError> {
        Ok(select_card(self.cards.iter(), provider, model_name))
    }
}

/// Keeps disclosures in insertion order.
#[derive(Default)]
pub struct InMemoryDisclosureStore {
    records: Mutex<Vec<UsageDisclosure>>,
}

impl InMemoryDisclosureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<UsageDisclosure> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DisclosureStore for InMemoryDisclosureStore {
    async fn insert(&self, disclosure: &UsageDisclosure) -> Result<bool, PersistenceError> {
        let mut records = self.records.lock();
        if records.iter().any(|r| r.id == disclosure.id) {
            return Ok(false);
        }
        records.push(disclosure.clone());
        Ok(true)
    }
}

// ─────────────────────────────────────────────
// File-backed
// ─────────────────────────────────────────────

/// Model cards read once from a JSON array file.
///
/// A missing file yields an empty catalog.
pub struct JsonModelCardStore {
    path: PathBuf,
    cards: Vec<ModelCard>,
}

impl JsonModelCardStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        let cards = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            debug!(path = %path.display(), "No model card file, starting empty");
            Vec::new()
        };
        Ok(Self { path, cards })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cards(&self) -> &[ModelCard] {
        &self.cards
    }
}

#[async_trait]
impl ModelCardStore for JsonModelCardStore {
    async fn find(
        &self,
        provider: &str,
        model_name: &str,
    ) -> Result<Option<ModelCard>, PersistenceError> {
        Ok(select_card(self.cards.iter(), provider, model_name))
    }
}

/// Append-only JSONL disclosure log.
///
/// Existing ids are loaded at open so duplicates are rejected across
/// restarts. Appends are serialized by an async lock.
pub struct JsonlDisclosureStore {
    path: PathBuf,
    ids: tokio::sync::Mutex<HashSet<String>>,
}

impl JsonlDisclosureStore {
    /// Open (or create) the log at `path`. The parent directory is created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let ids = read_disclosures(&path)?
            .into_iter()
            .map(|d| d.id)
            .collect::<HashSet<_>>();
        debug!(path = %path.display(), records = ids.len(), "Disclosure log opened");
        Ok(Self {
            path,
            ids: tokio::sync::Mutex::new(ids),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DisclosureStore for JsonlDisclosureStore {
    async fn insert(&self, disclosure: &UsageDisclosure) -> Result<bool, PersistenceError> {
        let mut ids = self.ids.lock().await;
        if ids.contains(&disclosure.id) {
            return Ok(false);
        }

        let mut line = serde_json::to_string(disclosure)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        ids.insert(disclosure.id.clone());
        Ok(true)
    }
}

/// Read every disclosure in a JSONL log, oldest first.
///
/// Missing file → empty. Malformed lines are skipped with a warning.
pub fn read_disclosures(path: &Path) -> Result<Vec<UsageDisclosure>, PersistenceError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<UsageDisclosure>(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(line = index + 1, error = %e, "Skipping malformed disclosure line"),
        }
    }
    Ok(records)
}
