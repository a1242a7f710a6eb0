use async_trait::async_trait;
use quiz_core::model::{Category, CategoryKey, ItemId, QuizKind, QuizResult, ResultId, Tier};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read access to the vocabulary, grouped by category.
#[async_trait]
pub trait VocabularyRepository: Send + Sync {
    /// Fetch a single category with its words.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the key is unknown, or other storage errors.
    async fn get_category(&self, key: &CategoryKey) -> Result<Category, StorageError>;

    /// Fetch every category, keyed by category key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the categories cannot be loaded.
    async fn all_categories(&self) -> Result<BTreeMap<CategoryKey, Category>, StorageError>;
}

/// Per-learner difficulty tags and bookmarks.
#[async_trait]
pub trait LearnerProfileRepository: Send + Sync {
    /// Learner-assigned tier for an item, if the learner tagged it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be read.
    async fn difficulty(&self, item: ItemId) -> Result<Option<Tier>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be read.
    async fn is_bookmarked(&self, item: ItemId) -> Result<bool, StorageError>;

    /// All bookmarked item ids, in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be read.
    async fn all_bookmarked(&self) -> Result<Vec<ItemId>, StorageError>;
}

/// Historical quiz results.
#[async_trait]
pub trait ResultsRepository: Send + Sync {
    /// Append a finished quiz result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a result with the same id already exists.
    async fn save_result(&self, result: &QuizResult) -> Result<ResultId, StorageError>;

    /// Number of distinct categories with at least one passed category quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if results cannot be read.
    async fn completed_category_count(&self) -> Result<usize, StorageError>;

    /// Best stored result for a quiz key (higher percentage, then less time).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if results cannot be read.
    async fn best_result(&self, quiz_key: &str) -> Result<Option<QuizResult>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    categories: Arc<Mutex<BTreeMap<CategoryKey, Category>>>,
    difficulties: Arc<Mutex<HashMap<ItemId, Tier>>>,
    bookmarks: Arc<Mutex<BTreeSet<ItemId>>>,
    results: Arc<Mutex<Vec<QuizResult>>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn upsert_category(&self, category: Category) -> Result<(), StorageError> {
        let mut guard = self.categories.lock().map_err(poisoned)?;
        guard.insert(category.key.clone(), category);
        Ok(())
    }

    /// Tag an item with a learner tier, or clear the tag with `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn set_difficulty(&self, item: ItemId, tier: Option<Tier>) -> Result<(), StorageError> {
        let mut guard = self.difficulties.lock().map_err(poisoned)?;
        match tier {
            Some(tier) => guard.insert(item, tier),
            None => guard.remove(&item),
        };
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn set_bookmarked(&self, item: ItemId, bookmarked: bool) -> Result<(), StorageError> {
        let mut guard = self.bookmarks.lock().map_err(poisoned)?;
        if bookmarked {
            guard.insert(item);
        } else {
            guard.remove(&item);
        }
        Ok(())
    }

    /// Number of stored results.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn result_count(&self) -> Result<usize, StorageError> {
        Ok(self.results.lock().map_err(poisoned)?.len())
    }
}

#[async_trait]
impl VocabularyRepository for InMemoryRepository {
    async fn get_category(&self, key: &CategoryKey) -> Result<Category, StorageError> {
        let guard = self.categories.lock().map_err(poisoned)?;
        guard.get(key).cloned().ok_or(StorageError::NotFound)
    }

    async fn all_categories(&self) -> Result<BTreeMap<CategoryKey, Category>, StorageError> {
        let guard = self.categories.lock().map_err(poisoned)?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl LearnerProfileRepository for InMemoryRepository {
    async fn difficulty(&self, item: ItemId) -> Result<Option<Tier>, StorageError> {
        let guard = self.difficulties.lock().map_err(poisoned)?;
        Ok(guard.get(&item).copied())
    }

    async fn is_bookmarked(&self, item: ItemId) -> Result<bool, StorageError> {
        let guard = self.bookmarks.lock().map_err(poisoned)?;
        Ok(guard.contains(&item))
    }

    async fn all_bookmarked(&self) -> Result<Vec<ItemId>, StorageError> {
        let guard = self.bookmarks.lock().map_err(poisoned)?;
        Ok(guard.iter().copied().collect())
    }
}

#[async_trait]
impl ResultsRepository for InMemoryRepository {
    async fn save_result(&self, result: &QuizResult) -> Result<ResultId, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        if guard.iter().any(|r| r.id() == result.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(result.clone());
        Ok(result.id())
    }

    async fn completed_category_count(&self) -> Result<usize, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let completed: HashSet<&str> = guard
            .iter()
            .filter(|r| r.quiz_kind() == QuizKind::Category && r.passed())
            .map(QuizResult::quiz_key)
            .collect();
        Ok(completed.len())
    }

    async fn best_result(&self, quiz_key: &str) -> Result<Option<QuizResult>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut best: Option<&QuizResult> = None;
        for result in guard.iter().filter(|r| r.quiz_key() == quiz_key) {
            if best.is_none_or(|b| result.beats(b)) {
                best = Some(result);
            }
        }
        Ok(best.cloned())
    }
}

/// Aggregates the three collaborators behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub vocabulary: Arc<dyn VocabularyRepository>,
    pub profile: Arc<dyn LearnerProfileRepository>,
    pub results: Arc<dyn ResultsRepository>,
}

impl Storage {
    /// All three collaborators backed by one shared in-memory repository.
    #[must_use]
    pub fn in_memory(repo: &InMemoryRepository) -> Self {
        let vocabulary: Arc<dyn VocabularyRepository> = Arc::new(repo.clone());
        let profile: Arc<dyn LearnerProfileRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ResultsRepository> = Arc::new(repo.clone());
        Self {
            vocabulary,
            profile,
            results,
        }
    }
}
