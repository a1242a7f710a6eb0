use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

use crate::model::ids::{CategoryKey, ItemId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VocabularyError {
    #[error("primary term cannot be empty")]
    EmptyPrimaryTerm,

    #[error("target term cannot be empty")]
    EmptyTargetTerm,

    #[error("grammatical type cannot be empty")]
    EmptyGrammaticalType,

    #[error("example sentence must have both a primary and a target side")]
    IncompleteExample,

    #[error("category key cannot be empty")]
    EmptyCategoryKey,
}

//
// ─── TIERS ─────────────────────────────────────────────────────────────────────
//

/// Difficulty classification, author- or learner-assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Easy,
    Medium,
    Hard,
}

impl Tier {
    /// All tiers in ascending difficulty order.
    pub const ALL: [Tier; 3] = [Tier::Easy, Tier::Medium, Tier::Hard];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Easy => "easy",
            Tier::Medium => "medium",
            Tier::Hard => "hard",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How common a word is in everyday use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyTier {
    Low,
    #[default]
    Medium,
    High,
}

/// Grammatical type of an item (`noun`, `verb`, ...), stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrammaticalType(String);

impl GrammaticalType {
    /// # Errors
    ///
    /// Returns `VocabularyError::EmptyGrammaticalType` for blank input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, VocabularyError> {
        let value = raw.as_ref().trim().to_lowercase();
        if value.is_empty() {
            return Err(VocabularyError::EmptyGrammaticalType);
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An example sentence in both languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleSentence {
    pub primary: String,
    pub target: String,
}

//
// ─── VOCABULARY ITEM ───────────────────────────────────────────────────────────
//

/// Unvalidated vocabulary item, as read from a provider or a data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyDraft {
    pub id: u64,
    pub primary_term: String,
    pub target_term: String,
    pub grammatical_type: String,
    pub difficulty_tier: Tier,
    #[serde(default)]
    pub frequency_tier: FrequencyTier,
    #[serde(default)]
    pub example: Option<ExampleSentence>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
}

impl VocabularyDraft {
    /// Validate the draft into an immutable `VocabularyItem`.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError` if a term or the grammatical type is blank, or the
    /// example sentence is missing one side.
    pub fn validate(self) -> Result<VocabularyItem, VocabularyError> {
        let primary_term = self.primary_term.trim().to_owned();
        if primary_term.is_empty() {
            return Err(VocabularyError::EmptyPrimaryTerm);
        }
        let target_term = self.target_term.trim().to_owned();
        if target_term.is_empty() {
            return Err(VocabularyError::EmptyTargetTerm);
        }
        let grammatical_type = GrammaticalType::new(&self.grammatical_type)?;

        let example = match self.example {
            Some(example) => {
                let primary = example.primary.trim();
                let target = example.target.trim();
                if primary.is_empty() || target.is_empty() {
                    return Err(VocabularyError::IncompleteExample);
                }
                Some(ExampleSentence {
                    primary: primary.to_owned(),
                    target: target.to_owned(),
                })
            }
            None => None,
        };

        let clean = |words: Vec<String>| {
            words
                .into_iter()
                .map(|w| w.trim().to_owned())
                .filter(|w| !w.is_empty())
                .collect::<Vec<_>>()
        };

        Ok(VocabularyItem {
            id: ItemId::new(self.id),
            primary_term,
            target_term,
            grammatical_type,
            difficulty_tier: self.difficulty_tier,
            frequency_tier: self.frequency_tier,
            example,
            synonyms: clean(self.synonyms),
            antonyms: clean(self.antonyms),
        })
    }
}

/// Immutable vocabulary entry owned by the vocabulary provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VocabularyDraft")]
pub struct VocabularyItem {
    id: ItemId,
    primary_term: String,
    target_term: String,
    grammatical_type: GrammaticalType,
    difficulty_tier: Tier,
    frequency_tier: FrequencyTier,
    example: Option<ExampleSentence>,
    synonyms: Vec<String>,
    antonyms: Vec<String>,
}

impl TryFrom<VocabularyDraft> for VocabularyItem {
    type Error = VocabularyError;

    fn try_from(draft: VocabularyDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl VocabularyItem {
    /// Convenience constructor for an item without example or synonyms.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError` for blank terms or grammatical type.
    pub fn new(
        id: ItemId,
        primary_term: impl Into<String>,
        target_term: impl Into<String>,
        grammatical_type: impl Into<String>,
        difficulty_tier: Tier,
    ) -> Result<Self, VocabularyError> {
        VocabularyDraft {
            id: id.value(),
            primary_term: primary_term.into(),
            target_term: target_term.into(),
            grammatical_type: grammatical_type.into(),
            difficulty_tier,
            frequency_tier: FrequencyTier::default(),
            example: None,
            synonyms: Vec::new(),
            antonyms: Vec::new(),
        }
        .validate()
    }

    /// Attach an example sentence pair.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError::IncompleteExample` if either side is blank.
    pub fn with_example(
        mut self,
        primary: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<Self, VocabularyError> {
        let primary = primary.into().trim().to_owned();
        let target = target.into().trim().to_owned();
        if primary.is_empty() || target.is_empty() {
            return Err(VocabularyError::IncompleteExample);
        }
        self.example = Some(ExampleSentence { primary, target });
        Ok(self)
    }

    #[must_use]
    pub fn with_synonyms<I, S>(mut self, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms = synonyms
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.trim().is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn with_frequency(mut self, frequency_tier: FrequencyTier) -> Self {
        self.frequency_tier = frequency_tier;
        self
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn primary_term(&self) -> &str {
        &self.primary_term
    }

    #[must_use]
    pub fn target_term(&self) -> &str {
        &self.target_term
    }

    #[must_use]
    pub fn grammatical_type(&self) -> &GrammaticalType {
        &self.grammatical_type
    }

    #[must_use]
    pub fn difficulty_tier(&self) -> Tier {
        self.difficulty_tier
    }

    #[must_use]
    pub fn frequency_tier(&self) -> FrequencyTier {
        self.frequency_tier
    }

    #[must_use]
    pub fn example(&self) -> Option<&ExampleSentence> {
        self.example.as_ref()
    }

    #[must_use]
    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    #[must_use]
    pub fn antonyms(&self) -> &[String] {
        &self.antonyms
    }
}

//
// ─── CATEGORY & POOL ───────────────────────────────────────────────────────────
//

/// A named group of vocabulary items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: CategoryKey,
    pub name: String,
    pub words: Vec<VocabularyItem>,
}

impl Category {
    /// # Errors
    ///
    /// Returns `VocabularyError::EmptyCategoryKey` for a blank key.
    pub fn new(
        key: CategoryKey,
        name: impl Into<String>,
        words: Vec<VocabularyItem>,
    ) -> Result<Self, VocabularyError> {
        if key.is_empty() {
            return Err(VocabularyError::EmptyCategoryKey);
        }
        Ok(Self {
            key,
            name: name.into(),
            words,
        })
    }
}

/// A vocabulary item together with the category it was drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub category: CategoryKey,
    pub item: VocabularyItem,
}

/// Flattened view over all categories, in provider order.
///
/// `entries` holds every item once, under the first category it was seen in.
/// Per-category membership is kept in full, so an item shared by two categories
/// is listed by `in_category` for both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyPool {
    categories: BTreeMap<CategoryKey, String>,
    members: BTreeMap<CategoryKey, Vec<PoolEntry>>,
    entries: Vec<PoolEntry>,
}

impl VocabularyPool {
    #[must_use]
    pub fn from_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut names = BTreeMap::new();
        let mut members: BTreeMap<CategoryKey, Vec<PoolEntry>> = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for category in categories {
            names.insert(category.key.clone(), category.name.clone());
            let listed = members.entry(category.key.clone()).or_default();
            let mut in_this = HashSet::new();
            for item in category.words {
                if !in_this.insert(item.id()) {
                    continue;
                }
                let entry = PoolEntry {
                    category: category.key.clone(),
                    item,
                };
                if seen.insert(entry.item.id()) {
                    entries.push(entry.clone());
                }
                listed.push(entry);
            }
        }

        Self {
            categories: names,
            members,
            entries,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn has_category(&self, key: &CategoryKey) -> bool {
        self.categories.contains_key(key)
    }

    pub fn category_keys(&self) -> impl Iterator<Item = &CategoryKey> {
        self.categories.keys()
    }

    #[must_use]
    pub fn category_name(&self, key: &CategoryKey) -> Option<&str> {
        self.categories.get(key).map(String::as_str)
    }

    /// Every entry listed under a single category, in provider order.
    pub fn in_category<'a>(&'a self, key: &'a CategoryKey) -> impl Iterator<Item = &'a PoolEntry> {
        self.members.get(key).into_iter().flatten()
    }

    #[must_use]
    pub fn find(&self, id: ItemId) -> Option<&PoolEntry> {
        self.entries.iter().find(|e| e.item.id() == id)
    }
}
