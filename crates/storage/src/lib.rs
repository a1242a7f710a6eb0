//! Repository contracts for the vocabulary provider, learner profile and results store.
#![forbid(unsafe_code)]

pub mod repository;

pub use repository::{
    InMemoryRepository, LearnerProfileRepository, ResultsRepository, Storage, StorageError,
    VocabularyRepository,
};
