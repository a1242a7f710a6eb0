use rand::Rng;
use tracing::{debug, info};

use quiz_core::model::{Question, QuizResult, VocabularyPool};
use quiz_core::{AnswerChecker, Clock};
use storage::{Storage, StorageError};

use super::service::{Advance, AnswerOutcome, QuizSession};
use crate::catalog::{
    LearnerSnapshot, QuizAvailability, QuizCatalog, QuizData, QuizType, ResultsSnapshot,
};
use crate::error::{ConfigError, EngineError};
use crate::settings::EngineSettings;

/// A finished, persisted quiz run.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSummary {
    pub result: QuizResult,
    /// Best earlier result for the same quiz key, looked up before saving.
    pub previous_best: Option<QuizResult>,
    pub is_personal_best: bool,
}

/// Result of `QuizEngine::advance`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineAdvance {
    NextQuestion(Question),
    Results(QuizSummary),
}

/// Entry point for a presentation layer: one learner, at most one live session.
///
/// Collaborator data is loaded from `Storage` for every quiz request; strategies
/// then run synchronously over that snapshot.
pub struct QuizEngine {
    clock: Clock,
    storage: Storage,
    settings: EngineSettings,
    session: Option<QuizSession>,
}

impl QuizEngine {
    /// # Errors
    ///
    /// Returns `ConfigError` if `settings` do not validate.
    pub fn new(storage: Storage, settings: EngineSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            clock: Clock::default(),
            storage,
            settings,
            session: None,
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The live session, if a quiz is running or awaiting finalization.
    #[must_use]
    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    /// Fetch the vocabulary pool, learner state and results facts.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any repository fails.
    pub async fn load_data(&self) -> Result<QuizData, StorageError> {
        let categories = self.storage.vocabulary.all_categories().await?;
        let pool = VocabularyPool::from_categories(categories.into_values());

        let mut tiers = Vec::new();
        for entry in pool.entries() {
            if let Some(tier) = self.storage.profile.difficulty(entry.item.id()).await? {
                tiers.push((entry.item.id(), tier));
            }
        }
        let bookmarks = self.storage.profile.all_bookmarked().await?;
        let completed_categories = self.storage.results.completed_category_count().await?;

        debug!(
            items = pool.len(),
            categories = pool.category_count(),
            tagged = tiers.len(),
            bookmarks = bookmarks.len(),
            completed_categories,
            "quiz data loaded"
        );
        Ok(QuizData {
            pool,
            learner: LearnerSnapshot::new(tiers, bookmarks),
            results: ResultsSnapshot {
                completed_categories,
            },
        })
    }

    /// Which quiz kinds can be started right now, with reasons for the rest.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Storage` if loading fails.
    pub async fn list_available_quiz_types(&self) -> Result<Vec<QuizAvailability>, EngineError> {
        let data = self.load_data().await?;
        Ok(self.catalog().list_available(&data.context()))
    }

    /// Generate a quiz and start a session on it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::SessionInProgress` while another session is live,
    /// `EngineError::Unavailable` if the strategy's preconditions fail, and
    /// `EngineError::Storage` if loading fails.
    pub async fn start_quiz(&mut self, quiz_type: &QuizType) -> Result<&QuizSession, EngineError> {
        self.ensure_idle()?;
        let data = self.load_data().await?;
        let mut rng = rand::rng();
        self.begin(quiz_type, &data, &mut rng)
    }

    /// `start_quiz` with a caller-supplied random source.
    ///
    /// # Errors
    ///
    /// See [`QuizEngine::start_quiz`].
    pub async fn start_quiz_with_rng<R: Rng + ?Sized>(
        &mut self,
        quiz_type: &QuizType,
        rng: &mut R,
    ) -> Result<&QuizSession, EngineError> {
        self.ensure_idle()?;
        let data = self.load_data().await?;
        self.begin(quiz_type, &data, rng)
    }

    /// # Errors
    ///
    /// Returns `EngineError::NoActiveSession` without a session, or the session's
    /// precondition error.
    pub fn submit_answer(&mut self, raw_input: &str) -> Result<AnswerOutcome, EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NoActiveSession)?;
        Ok(session.submit_answer(raw_input)?)
    }

    /// Sample the countdown of the live session; see [`QuizSession::tick`].
    pub fn tick(&mut self) -> Option<AnswerOutcome> {
        self.session.as_mut().and_then(QuizSession::tick)
    }

    /// Move to the next question, or finish, persist and report the results.
    ///
    /// If saving fails the finished session is kept; call
    /// [`QuizEngine::finalize_results`] to retry.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoActiveSession`, a session precondition error, or
    /// `EngineError::Storage` if persisting the result fails.
    pub async fn advance(&mut self) -> Result<EngineAdvance, EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NoActiveSession)?;
        match session.advance()? {
            Advance::NextQuestion(question) => Ok(EngineAdvance::NextQuestion(question)),
            Advance::Finished(_) => Ok(EngineAdvance::Results(self.finalize_results().await?)),
        }
    }

    /// Persist the result of a finished session and release it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NoActiveSession` without a session,
    /// `EngineError::Session` if it is not finished, and `EngineError::Storage`
    /// if persistence fails (the session is kept for another attempt).
    pub async fn finalize_results(&mut self) -> Result<QuizSummary, EngineError> {
        let session = self.session.as_ref().ok_or(EngineError::NoActiveSession)?;
        let result = session.compute_results()?.clone();

        let previous_best = self.storage.results.best_result(result.quiz_key()).await?;
        self.storage.results.save_result(&result).await?;
        self.session = None;

        let is_personal_best = previous_best.as_ref().is_none_or(|best| result.beats(best));
        info!(
            quiz = result.quiz_key(),
            score = result.score(),
            total = result.total(),
            passed = result.passed(),
            is_personal_best,
            "quiz finished"
        );
        Ok(QuizSummary {
            result,
            previous_best,
            is_personal_best,
        })
    }

    /// Abandon the live session. A no-op when nothing is running.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Session` for a finished session that still awaits
    /// [`QuizEngine::finalize_results`].
    pub fn cancel(&mut self) -> Result<(), EngineError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.cancel()?;
        info!(quiz = session.quiz().key(), "quiz cancelled");
        self.session = None;
        Ok(())
    }

    fn catalog(&self) -> QuizCatalog<'_> {
        QuizCatalog::new(&self.settings.catalog, &self.settings.generator)
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        match &self.session {
            Some(_) => Err(EngineError::SessionInProgress),
            None => Ok(()),
        }
    }

    fn begin<R: Rng + ?Sized>(
        &mut self,
        quiz_type: &QuizType,
        data: &QuizData,
        rng: &mut R,
    ) -> Result<&QuizSession, EngineError> {
        let quiz = self.catalog().generate(quiz_type, &data.context(), rng)?;
        info!(
            quiz = quiz.key(),
            questions = quiz.len(),
            pass_threshold = quiz.pass_threshold(),
            timed = quiz.time_limit().is_some(),
            "quiz started"
        );

        let checker = AnswerChecker::new(self.settings.matching.clone());
        let mut session = QuizSession::new(quiz, checker, self.clock.clone());
        session.start()?;
        Ok(self.session.insert(session))
    }
}

impl std::fmt::Debug for QuizEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizEngine")
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .field("session", &self.session.as_ref().map(QuizSession::state))
            .finish_non_exhaustive()
    }
}
