use chrono::{DateTime, Utc};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;
use tracing::debug;

use quiz_core::model::{AnswerKind, AnswerRecord, Question, Quiz, QuizResult};
use quiz_core::{AnswerChecker, Clock};

use super::SessionState;
use super::progress::SessionProgress;
use crate::error::SessionError;
use crate::timer::QuizTimer;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// What happened to a submitted (or timed-out) answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub record: AnswerRecord,
    /// Score after this answer.
    pub score: usize,
    pub is_last: bool,
    /// The countdown had already run out; the input was not judged.
    pub late_submission: bool,
}

/// Result of leaving the feedback state.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    NextQuestion(Question),
    Finished(QuizResult),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One run through a quiz.
///
/// The session owns its countdown. Every question start hands the timer a fresh
/// callback that reports the question index on a channel; the session drains that
/// channel on `tick` and `submit_answer`, so an expiry is only ever applied to the
/// question it was started for.
#[derive(Debug)]
pub struct QuizSession {
    quiz: Quiz,
    checker: AnswerChecker,
    clock: Clock,
    timer: QuizTimer,
    expiry_tx: Sender<usize>,
    expiry_rx: Receiver<usize>,
    state: SessionState,
    current: usize,
    records: Vec<AnswerRecord>,
    score: usize,
    started_at: Option<DateTime<Utc>>,
    shown_at: Option<DateTime<Utc>>,
    result: Option<QuizResult>,
}

impl QuizSession {
    #[must_use]
    pub fn new(quiz: Quiz, checker: AnswerChecker, clock: Clock) -> Self {
        let (expiry_tx, expiry_rx) = mpsc::channel();
        Self {
            quiz,
            checker,
            timer: QuizTimer::new(clock.clone()),
            clock,
            expiry_tx,
            expiry_rx,
            state: SessionState::Idle,
            current: 0,
            records: Vec::new(),
            score: 0,
            started_at: None,
            shown_at: None,
            result: None,
        }
    }

    /// Show the first question, starting the countdown for timed quizzes.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is idle.
    pub fn start(&mut self) -> Result<&Question, SessionError> {
        self.require(SessionState::Idle, "start")?;
        self.started_at = Some(self.clock.now());
        self.current = 0;
        self.show_current();
        debug!(quiz = self.quiz.key(), questions = self.quiz.len(), "session started");
        self.current_question().ok_or(SessionError::InvalidState {
            operation: "start",
            state: self.state,
        })
    }

    /// Judge `raw_input` against the current question.
    ///
    /// If the countdown has already elapsed, the timeout is recorded first and that
    /// outcome is returned with `late_submission` set; the late input is discarded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `AwaitingAnswer` and
    /// `SessionError::EmptyAnswer` for blank input (the session does not move).
    pub fn submit_answer(&mut self, raw_input: &str) -> Result<AnswerOutcome, SessionError> {
        if let Some(mut timed_out) = self.sync_timer() {
            timed_out.late_submission = true;
            return Ok(timed_out);
        }
        self.require(SessionState::AwaitingAnswer, "submit an answer")?;
        if raw_input.trim().is_empty() {
            return Err(SessionError::EmptyAnswer);
        }

        let remaining_time = self.quiz.time_limit().map(|_| self.timer.remaining());
        self.timer.stop();

        let question = self.current_question_cloned()?;
        let checked = self.checker.check(raw_input, &question);
        let record = AnswerRecord {
            question_index: self.current,
            question,
            user_input: raw_input.to_owned(),
            correct_answer: checked.correct_answer,
            is_correct: checked.is_correct,
            kind: checked.kind,
            similarity: checked.similarity,
            response_time: self.response_time(),
            remaining_time,
        };
        debug!(
            index = self.current,
            correct = record.is_correct,
            kind = ?record.kind,
            "answer judged"
        );
        Ok(self.record(record))
    }

    /// Sample the countdown. Returns the forced timeout outcome when it expired.
    pub fn tick(&mut self) -> Option<AnswerOutcome> {
        self.sync_timer()
    }

    /// Move past the feedback of the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `Feedback`, or
    /// `SessionError::Result` if the final result cannot be built.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        self.require(SessionState::Feedback, "advance")?;

        if self.current + 1 < self.quiz.len() {
            self.current += 1;
            self.show_current();
            debug!(index = self.current, "next question");
            return Ok(Advance::NextQuestion(self.current_question_cloned()?));
        }

        let completed_at = self.clock.now();
        let started_at = self.started_at.unwrap_or(completed_at);
        let result =
            QuizResult::from_records(&self.quiz, self.records.clone(), started_at, completed_at)?;
        self.state = SessionState::Finished;
        self.result = Some(result.clone());
        debug!(score = result.score(), total = result.total(), "session finished");
        Ok(Advance::Finished(result))
    }

    /// Abandon the run. Stops the countdown and discards recorded answers.
    ///
    /// Cancelling an already cancelled session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` for an idle or finished session.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Cancelled => Ok(()),
            SessionState::Idle | SessionState::Finished => Err(SessionError::InvalidState {
                operation: "cancel",
                state: self.state,
            }),
            SessionState::AwaitingAnswer | SessionState::Feedback => {
                self.timer.stop();
                while self.expiry_rx.try_recv().is_ok() {}
                self.records.clear();
                self.score = 0;
                self.shown_at = None;
                self.state = SessionState::Cancelled;
                debug!(quiz = self.quiz.key(), "session cancelled");
                Ok(())
            }
        }
    }

    /// Final result of a finished session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is finished.
    pub fn compute_results(&self) -> Result<&QuizResult, SessionError> {
        match (&self.result, self.state) {
            (Some(result), SessionState::Finished) => Ok(result),
            _ => Err(SessionError::InvalidState {
                operation: "compute results",
                state: self.state,
            }),
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question on screen, while awaiting an answer or showing feedback.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.state.is_active() {
            self.quiz.question(self.current)
        } else {
            None
        }
    }

    #[must_use]
    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    #[must_use]
    pub fn score(&self) -> usize {
        self.score
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Countdown left on the current question; `None` for untimed quizzes or when
    /// no question is awaiting an answer.
    #[must_use]
    pub fn remaining_time(&self) -> Option<Duration> {
        match (self.quiz.time_limit(), self.state) {
            (Some(_), SessionState::AwaitingAnswer) => Some(self.timer.remaining()),
            _ => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.quiz.len();
        let answered = self.records.len();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            score: self.score,
            is_complete: self.state == SessionState::Finished,
        }
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn current_question_cloned(&self) -> Result<Question, SessionError> {
        self.quiz
            .question(self.current)
            .cloned()
            .ok_or(SessionError::InvalidState {
                operation: "read the current question",
                state: self.state,
            })
    }

    fn show_current(&mut self) {
        self.state = SessionState::AwaitingAnswer;
        self.shown_at = Some(self.clock.now());
        if let Some(limit) = self.quiz.time_limit() {
            let tx = self.expiry_tx.clone();
            let index = self.current;
            self.timer.start(limit, move || {
                // The receiver lives as long as the session that owns this timer.
                let _ = tx.send(index);
            });
        }
    }

    fn response_time(&self) -> Duration {
        self.shown_at
            .map(|at| self.clock.elapsed_since(at))
            .unwrap_or_default()
    }

    /// Poll the timer and apply an expiry that belongs to the current question.
    fn sync_timer(&mut self) -> Option<AnswerOutcome> {
        self.timer.poll();
        let mut expired = false;
        while let Ok(index) = self.expiry_rx.try_recv() {
            expired |= index == self.current;
        }
        if !expired || self.state != SessionState::AwaitingAnswer {
            return None;
        }

        let question = self.quiz.question(self.current)?.clone();
        let limit = self.timer.limit();
        debug!(index = self.current, "answer timed out");
        let record = AnswerRecord {
            question_index: self.current,
            correct_answer: question.correct_answer().to_owned(),
            question,
            user_input: String::new(),
            is_correct: false,
            kind: AnswerKind::Timeout,
            similarity: 0.0,
            response_time: limit,
            remaining_time: Some(Duration::ZERO),
        };
        Some(self.record(record))
    }

    fn record(&mut self, record: AnswerRecord) -> AnswerOutcome {
        if record.is_correct {
            self.score += 1;
        }
        self.records.push(record.clone());
        self.state = SessionState::Feedback;
        AnswerOutcome {
            record,
            score: self.score,
            is_last: self.current + 1 >= self.quiz.len(),
            late_submission: false,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Direction, ItemId, QuizKind, Tier, VocabularyItem};
    use quiz_core::time::fixed_now;

    fn question(id: u64, primary: &str, target: &str) -> Question {
        let item = VocabularyItem::new(ItemId::new(id), primary, target, "noun", Tier::Easy).unwrap();
        Question::free_text(&item, Direction::PrimaryToTarget, None)
    }

    fn quiz(threshold: usize) -> Quiz {
        let questions = vec![
            question(1, "dog", "perro"),
            question(2, "cat", "gato"),
            question(3, "house", "casa"),
        ];
        Quiz::new(QuizKind::Random, "random", questions, threshold).unwrap()
    }

    fn session(quiz: Quiz, clock: Clock) -> QuizSession {
        QuizSession::new(quiz, AnswerChecker::default(), clock)
    }

    #[test]
    fn runs_to_results() {
        let (clock, time) = Clock::manual(fixed_now());
        let mut session = session(quiz(2), clock);

        assert_eq!(session.start().unwrap().correct_answer(), "perro");
        time.advance_secs(3);
        let first = session.submit_answer("Perro!").unwrap();
        assert!(first.record.is_correct);
        assert_eq!(first.record.response_time, Duration::from_secs(3));
        assert_eq!(first.record.remaining_time, None);
        assert_eq!(first.score, 1);
        assert!(!first.is_last);
        assert_eq!(session.state(), SessionState::Feedback);

        let Advance::NextQuestion(next) = session.advance().unwrap() else {
            panic!("expected another question");
        };
        assert_eq!(next.correct_answer(), "gato");
        session.submit_answer("perro").unwrap();
        session.advance().unwrap();
        let last = session.submit_answer("casa").unwrap();
        assert!(last.is_last);

        let Advance::Finished(result) = session.advance().unwrap() else {
            panic!("expected results");
        };
        assert_eq!(result.score(), 2);
        assert_eq!(result.total(), 3);
        assert_eq!(result.percentage(), 67);
        assert!(result.passed());
        assert_eq!(result.total_time_spent(), Duration::from_secs(3));
        assert_eq!(session.compute_results().unwrap(), &result);
        assert_eq!(
            session.progress(),
            SessionProgress {
                total: 3,
                answered: 3,
                remaining: 0,
                score: 2,
                is_complete: true
            }
        );
    }

    #[test]
    fn rejects_out_of_order_calls() {
        let mut session = session(quiz(2), Clock::fixed(fixed_now()));

        assert_eq!(
            session.submit_answer("perro"),
            Err(SessionError::InvalidState {
                operation: "submit an answer",
                state: SessionState::Idle
            })
        );
        assert!(session.advance().is_err());
        assert!(session.compute_results().is_err());
        assert!(session.cancel().is_err());

        session.start().unwrap();
        assert!(session.start().is_err());
        assert!(session.advance().is_err());

        session.submit_answer("perro").unwrap();
        assert_eq!(
            session.submit_answer("perro"),
            Err(SessionError::InvalidState {
                operation: "submit an answer",
                state: SessionState::Feedback
            })
        );
        assert_eq!(session.records().len(), 1);
    }

    #[test]
    fn empty_answer_does_not_transition() {
        let mut session = session(quiz(2), Clock::fixed(fixed_now()));
        session.start().unwrap();

        assert_eq!(session.submit_answer("   "), Err(SessionError::EmptyAnswer));
        assert_eq!(session.state(), SessionState::AwaitingAnswer);
        assert!(session.records().is_empty());
    }

    #[test]
    fn cancel_is_idempotent_and_discards_answers() {
        let mut session = session(quiz(2), Clock::fixed(fixed_now()));
        session.start().unwrap();
        session.submit_answer("perro").unwrap();

        session.cancel().unwrap();
        session.cancel().unwrap();
        assert_eq!(session.state(), SessionState::Cancelled);
        assert!(session.records().is_empty());
        assert_eq!(session.current_question(), None);
        assert!(session.submit_answer("gato").is_err());
    }

    fn timed_quiz() -> Quiz {
        quiz(2).with_time_limit_seconds(10).unwrap()
    }

    #[test]
    fn tick_forces_timeout_once() {
        let (clock, time) = Clock::manual(fixed_now());
        let mut session = session(timed_quiz(), clock);
        session.start().unwrap();

        time.advance_secs(4);
        assert_eq!(session.tick(), None);
        assert_eq!(session.remaining_time(), Some(Duration::from_secs(6)));

        time.advance_secs(6);
        let outcome = session.tick().unwrap();
        assert_eq!(outcome.record.kind, AnswerKind::Timeout);
        assert!(!outcome.record.is_correct);
        assert!(!outcome.late_submission);
        assert_eq!(outcome.record.response_time, Duration::from_secs(10));
        assert_eq!(session.state(), SessionState::Feedback);
        assert_eq!(session.remaining_time(), None);

        time.advance_secs(30);
        assert_eq!(session.tick(), None);
        assert_eq!(session.records().len(), 1);
    }

    #[test]
    fn late_submission_becomes_timeout() {
        let (clock, time) = Clock::manual(fixed_now());
        let mut session = session(timed_quiz(), clock);
        session.start().unwrap();

        time.advance_secs(11);
        let outcome = session.submit_answer("perro").unwrap();
        assert!(outcome.late_submission);
        assert_eq!(outcome.record.kind, AnswerKind::Timeout);
        assert!(outcome.record.user_input.is_empty());
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn answering_in_time_stops_the_countdown() {
        let (clock, time) = Clock::manual(fixed_now());
        let mut session = session(timed_quiz(), clock);
        session.start().unwrap();

        time.advance_secs(7);
        let outcome = session.submit_answer("perro").unwrap();
        assert!(outcome.record.is_correct);
        assert_eq!(outcome.record.remaining_time, Some(Duration::from_secs(3)));

        // Sitting on the feedback screen past the limit does not time out.
        time.advance_secs(20);
        assert_eq!(session.tick(), None);

        // The next question gets a fresh countdown.
        session.advance().unwrap();
        assert_eq!(session.remaining_time(), Some(Duration::from_secs(10)));
        time.advance_secs(9);
        assert_eq!(session.tick(), None);
        assert!(session.submit_answer("gato").unwrap().record.is_correct);
    }

    #[test]
    fn results_recount_from_records() {
        let (clock, time) = Clock::manual(fixed_now());
        let mut session = session(timed_quiz(), clock);
        session.start().unwrap();
        time.advance_secs(2);
        session.submit_answer("perro").unwrap();
        session.advance().unwrap();
        time.advance_secs(10);
        session.tick().unwrap();
        session.advance().unwrap();
        time.advance_secs(1);
        session.submit_answer("casa").unwrap();
        session.advance().unwrap();

        let result = session.compute_results().unwrap();
        let correct = result.records().iter().filter(|r| r.is_correct).count();
        assert_eq!(result.score(), correct);
        assert_eq!(result.score(), 2);
        assert_eq!(result.percentage(), 67);
        assert_eq!(result.total_time_spent(), Duration::from_secs(13));
        assert!(result.records()[1].is_timeout());
    }
}
