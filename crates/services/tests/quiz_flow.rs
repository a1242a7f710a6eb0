use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{
    AnswerKind, Category, CategoryKey, ItemId, QuizKind, QuizResult, ResultId, Tier,
    VocabularyItem,
};
use quiz_core::time::fixed_now;
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::{
    Clock, EngineAdvance, EngineError, EngineSettings, QuizEngine, QuizSummary, QuizType,
    QuizUnavailable, SessionState,
};
use storage::{InMemoryRepository, ResultsRepository, Storage, StorageError};

const ANIMALS: [(&str, &str); 20] = [
    ("dog", "perro"),
    ("cat", "gato"),
    ("cow", "vaca"),
    ("pig", "cerdo"),
    ("duck", "pato"),
    ("horse", "caballo"),
    ("sheep", "oveja"),
    ("goat", "cabra"),
    ("mouse", "ratón"),
    ("rabbit", "conejo"),
    ("bird", "pájaro"),
    ("fish", "pez"),
    ("bear", "oso"),
    ("wolf", "lobo"),
    ("fox", "zorro"),
    ("frog", "rana"),
    ("butterfly", "mariposa"),
    ("squirrel", "ardilla"),
    ("owl", "búho"),
    ("eagle", "águila"),
];

/// 20 animals: 8 easy, 8 medium, 4 hard.
fn animals() -> Category {
    let words = ANIMALS
        .iter()
        .enumerate()
        .map(|(i, (en, es))| {
            let tier = match i {
                0..8 => Tier::Easy,
                8..16 => Tier::Medium,
                _ => Tier::Hard,
            };
            VocabularyItem::new(ItemId::new(i as u64 + 1), *en, *es, "noun", tier).unwrap()
        })
        .collect();
    Category::new(CategoryKey::new("animals"), "Animals", words).unwrap()
}

fn repo() -> InMemoryRepository {
    let repo = InMemoryRepository::new();
    repo.upsert_category(animals()).unwrap();
    repo
}

fn engine(storage: Storage, clock: Clock) -> QuizEngine {
    QuizEngine::new(storage, EngineSettings::default())
        .unwrap()
        .with_clock(clock)
}

/// Answer every question with `answer_for(correct_answer)` and return the summary.
async fn run_quiz(engine: &mut QuizEngine, answer_for: impl Fn(&str) -> String) -> QuizSummary {
    loop {
        let correct = engine
            .session()
            .and_then(|s| s.current_question())
            .map(|q| q.correct_answer().to_owned())
            .unwrap();
        engine.submit_answer(&answer_for(&correct)).unwrap();
        match engine.advance().await.unwrap() {
            EngineAdvance::NextQuestion(_) => continue,
            EngineAdvance::Results(summary) => return summary,
        }
    }
}

#[tokio::test]
async fn category_quiz_runs_and_persists() {
    let repo = repo();
    let mut engine = engine(Storage::in_memory(&repo), Clock::fixed(fixed_now()));
    let mut rng = StdRng::seed_from_u64(7);

    let session = engine
        .start_quiz_with_rng(&QuizType::category("animals"), &mut rng)
        .await
        .unwrap();
    assert_eq!(session.quiz().len(), 15);
    assert_eq!(session.quiz().pass_threshold(), 12);
    assert_eq!(session.state(), SessionState::AwaitingAnswer);

    let summary = run_quiz(&mut engine, str::to_owned).await;
    assert_eq!(summary.result.score(), 15);
    assert_eq!(summary.result.percentage(), 100);
    assert!(summary.result.passed());
    assert!(summary.is_personal_best);
    assert_eq!(summary.previous_best, None);

    assert!(engine.session().is_none());
    assert_eq!(repo.result_count().unwrap(), 1);
    assert_eq!(repo.completed_category_count().await.unwrap(), 1);
}

#[tokio::test]
async fn worse_rerun_is_not_a_personal_best() {
    let repo = repo();
    let mut engine = engine(Storage::in_memory(&repo), Clock::fixed(fixed_now()));
    let mut rng = StdRng::seed_from_u64(1);
    let quiz_type = QuizType::category("animals");

    engine.start_quiz_with_rng(&quiz_type, &mut rng).await.unwrap();
    let first = run_quiz(&mut engine, str::to_owned).await;

    engine.start_quiz_with_rng(&quiz_type, &mut rng).await.unwrap();
    let second = run_quiz(&mut engine, |_| "zzz".to_owned()).await;

    assert_eq!(second.result.score(), 0);
    assert!(!second.result.passed());
    assert!(!second.is_personal_best);
    assert_eq!(second.previous_best.map(|r| r.id()), Some(first.result.id()));
    assert_eq!(repo.result_count().unwrap(), 2);
}

#[tokio::test]
async fn speed_quiz_converts_late_answers_to_timeouts() {
    let repo = repo();
    let (clock, time) = Clock::manual(fixed_now());
    let mut engine = engine(Storage::in_memory(&repo), clock);
    let mut rng = StdRng::seed_from_u64(3);

    let session = engine
        .start_quiz_with_rng(&QuizType::Speed, &mut rng)
        .await
        .unwrap();
    assert_eq!(session.quiz().time_limit(), Some(Duration::from_secs(10)));
    assert_eq!(session.remaining_time(), Some(Duration::from_secs(10)));

    let correct = session
        .current_question()
        .map(|q| q.correct_answer().to_owned())
        .unwrap();
    time.advance_secs(11);
    let outcome = engine.submit_answer(&correct).unwrap();
    assert!(outcome.late_submission);
    assert_eq!(outcome.record.kind, AnswerKind::Timeout);
    assert!(!outcome.record.is_correct);

    // The host's periodic tick also forces timeouts.
    engine.advance().await.unwrap();
    time.advance_secs(10);
    let forced = engine.tick().unwrap();
    assert_eq!(forced.record.kind, AnswerKind::Timeout);
    assert_eq!(forced.record.question_index, 1);
    assert!(engine.tick().is_none());
}

#[tokio::test]
async fn unavailable_quizzes_report_reasons() {
    let repo = repo();
    let mut engine = engine(Storage::in_memory(&repo), Clock::fixed(fixed_now()));

    let err = engine.start_quiz(&QuizType::Bookmarked).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Unavailable(QuizUnavailable::NotEnoughBookmarks { have: 0, need: 3 })
    ));

    let err = engine.start_quiz(&QuizType::Final).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Unavailable(QuizUnavailable::FinalLocked {
            completed: 0,
            total: 1,
            required: 1
        })
    ));
    assert!(engine.session().is_none());

    let listing = engine.list_available_quiz_types().await.unwrap();
    let available: Vec<QuizKind> = listing
        .iter()
        .filter(|a| a.available)
        .map(|a| a.kind)
        .collect();
    assert_eq!(
        available,
        [
            QuizKind::Category,
            QuizKind::Random,
            QuizKind::Speed,
            QuizKind::EasyOnly,
            QuizKind::Progressive
        ]
    );
}

#[tokio::test]
async fn learner_profile_unlocks_bookmarks_and_adaptive() {
    let repo = repo();
    for id in [2, 4, 6] {
        repo.set_bookmarked(ItemId::new(id), true).unwrap();
    }
    for id in 1..=10 {
        repo.set_difficulty(ItemId::new(id), Some(Tier::Hard)).unwrap();
    }
    let mut engine = engine(Storage::in_memory(&repo), Clock::fixed(fixed_now()));
    let mut rng = StdRng::seed_from_u64(9);

    let session = engine
        .start_quiz_with_rng(&QuizType::Bookmarked, &mut rng)
        .await
        .unwrap();
    assert_eq!(session.quiz().len(), 3);
    engine.cancel().unwrap();

    let session = engine
        .start_quiz_with_rng(&QuizType::Adaptive, &mut rng)
        .await
        .unwrap();
    assert_eq!(session.quiz().kind(), QuizKind::Adaptive);
    assert_eq!(session.quiz().len(), 15);
}

#[tokio::test]
async fn one_session_at_a_time() {
    let repo = repo();
    let mut engine = engine(Storage::in_memory(&repo), Clock::fixed(fixed_now()));

    engine.start_quiz(&QuizType::Random).await.unwrap();
    let err = engine.start_quiz(&QuizType::Random).await.unwrap_err();
    assert!(matches!(err, EngineError::SessionInProgress));

    engine.cancel().unwrap();
    engine.cancel().unwrap();
    assert!(matches!(
        engine.submit_answer("perro"),
        Err(EngineError::NoActiveSession)
    ));

    engine.start_quiz(&QuizType::Random).await.unwrap();
    assert!(matches!(
        engine.submit_answer(""),
        Err(EngineError::Session(_))
    ));
    assert_eq!(repo.result_count().unwrap(), 0);
}

/// Results store that fails to save until told otherwise.
struct FlakyResults {
    inner: InMemoryRepository,
    failing: AtomicBool,
}

#[async_trait]
impl ResultsRepository for FlakyResults {
    async fn save_result(&self, result: &QuizResult) -> Result<ResultId, StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("disk unavailable".into()));
        }
        self.inner.save_result(result).await
    }

    async fn completed_category_count(&self) -> Result<usize, StorageError> {
        self.inner.completed_category_count().await
    }

    async fn best_result(&self, quiz_key: &str) -> Result<Option<QuizResult>, StorageError> {
        self.inner.best_result(quiz_key).await
    }
}

#[tokio::test]
async fn failed_save_can_be_retried() {
    let repo = repo();
    let flaky = Arc::new(FlakyResults {
        inner: repo.clone(),
        failing: AtomicBool::new(true),
    });
    let storage = Storage {
        results: flaky.clone(),
        ..Storage::in_memory(&repo)
    };
    let mut engine = engine(storage, Clock::fixed(fixed_now()));
    let mut rng = StdRng::seed_from_u64(2);
    engine
        .start_quiz_with_rng(&QuizType::category("animals"), &mut rng)
        .await
        .unwrap();

    let err = loop {
        let correct = engine
            .session()
            .and_then(|s| s.current_question())
            .map(|q| q.correct_answer().to_owned())
            .unwrap();
        engine.submit_answer(&correct).unwrap();
        match engine.advance().await {
            Ok(EngineAdvance::NextQuestion(_)) => continue,
            Ok(EngineAdvance::Results(_)) => panic!("save should have failed"),
            Err(err) => break err,
        }
    };
    assert!(matches!(err, EngineError::Storage(StorageError::Connection(_))));
    assert_eq!(
        engine.session().map(|s| s.state()),
        Some(SessionState::Finished)
    );
    assert!(matches!(
        engine.start_quiz(&QuizType::Random).await,
        Err(EngineError::SessionInProgress)
    ));

    flaky.failing.store(false, Ordering::SeqCst);
    let summary = engine.finalize_results().await.unwrap();
    assert_eq!(summary.result.score(), 15);
    assert!(engine.session().is_none());
    assert_eq!(repo.result_count().unwrap(), 1);
}
