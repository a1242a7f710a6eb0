//! Answer checking for quiz questions (Levenshtein-based tolerance).

use crate::model::{AnswerKind, Question, QuestionKind};
use crate::settings::MatchingSettings;

/// Characters outside ASCII that are treated as punctuation.
const EXTRA_PUNCTUATION: &[char] = &[
    '¡', '¿', '«', '»', '“', '”', '‘', '’', '…', '–', '—', '·', '„', '‹', '›',
];

/// Result of judging a submitted answer.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub is_correct: bool,
    /// Canonical answer, as it should be shown to the learner.
    pub correct_answer: String,
    pub kind: AnswerKind,
    /// Best similarity against any accepted answer, 0.0 to 1.0.
    pub similarity: f64,
}

/// Compares submitted answers with the accepted answers of a question.
#[derive(Debug, Clone, Default)]
pub struct AnswerChecker {
    settings: MatchingSettings,
}

impl AnswerChecker {
    #[must_use]
    pub fn new(settings: MatchingSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &MatchingSettings {
        &self.settings
    }

    /// Judge `user_answer` against `question`.
    ///
    /// Empty input is rejected without computing similarity.
    #[must_use]
    pub fn check(&self, user_answer: &str, question: &Question) -> CheckOutcome {
        let sentence = question.kind() == QuestionKind::SentenceTranslation;
        let base = |s: &str| {
            if sentence {
                normalize_sentence(s)
            } else {
                normalize_term(s)
            }
        };
        // Answers made only of symbols compare on their lowercased form.
        let symbolic = !question.correct_answer().trim().is_empty()
            && base(question.correct_answer()).is_empty();
        let normalize = |s: &str| {
            if symbolic {
                collapse_whitespace(&s.to_lowercase())
            } else {
                base(s)
            }
        };
        let threshold = if sentence {
            self.settings.sentence_threshold()
        } else {
            self.settings.term_threshold()
        };
        let correct_answer = question.correct_answer().to_owned();

        let typed = normalize(user_answer);
        if typed.is_empty() {
            return CheckOutcome {
                is_correct: false,
                correct_answer,
                kind: AnswerKind::Empty,
                similarity: 0.0,
            };
        }

        let canonical = normalize(question.correct_answer());
        if typed == canonical {
            return CheckOutcome {
                is_correct: true,
                correct_answer,
                kind: AnswerKind::Exact,
                similarity: 1.0,
            };
        }

        // A chosen option is either the correct one or a distractor.
        if question.kind() == QuestionKind::MultipleChoice {
            return CheckOutcome {
                is_correct: false,
                correct_answer,
                kind: AnswerKind::WrongWord,
                similarity: normalized_similarity(&typed, &canonical),
            };
        }

        let alternatives: Vec<String> = split_alternatives(question.correct_answer())
            .chain(question.alternatives().iter().map(String::as_str))
            .map(normalize)
            .filter(|alt| !alt.is_empty() && *alt != canonical)
            .collect();
        if alternatives.contains(&typed) {
            return CheckOutcome {
                is_correct: true,
                correct_answer,
                kind: AnswerKind::Alternative,
                similarity: 1.0,
            };
        }

        let mut best = 0.0_f64;
        let mut accepted = false;
        for candidate in std::iter::once(&canonical).chain(alternatives.iter()) {
            let similarity = normalized_similarity(&typed, candidate);
            best = best.max(similarity);
            if candidate.chars().count() > self.settings.fuzzy_min_len() && similarity > threshold
            {
                accepted = true;
            }
        }

        let kind = if accepted {
            AnswerKind::Approximate
        } else {
            self.classify_miss(best)
        };

        CheckOutcome {
            is_correct: accepted,
            correct_answer,
            kind,
            similarity: best,
        }
    }

    /// Diagnostic category for a rejected answer.
    #[must_use]
    pub fn classify_miss(&self, similarity: f64) -> AnswerKind {
        if similarity > self.settings.typo_similarity() {
            AnswerKind::Typo
        } else if similarity < self.settings.wrong_word_similarity() {
            AnswerKind::WrongWord
        } else {
            AnswerKind::Partial
        }
    }
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || EXTRA_PUNCTUATION.contains(&c)
}

/// Split a canonical answer on `/` into its alternatives.
fn split_alternatives(answer: &str) -> impl Iterator<Item = &str> {
    answer
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

/// Normalize a single term: lowercase, drop punctuation, collapse whitespace.
///
/// Hyphens and underscores separate words; letters with diacritics, digits, `+` and
/// apostrophes inside a word ("it's") are kept.
#[must_use]
pub fn normalize_term(s: &str) -> String {
    let lowered: Vec<char> = s.to_lowercase().chars().collect();
    let cleaned: String = lowered
        .iter()
        .enumerate()
        .filter_map(|(i, &c)| match c {
            '-' | '_' | '–' | '—' => Some(' '),
            '+' => Some('+'),
            '\'' | '’' if is_inside_word(&lowered, i) => Some('\''),
            c if is_punctuation(c) => None,
            c => Some(c),
        })
        .collect();
    collapse_whitespace(&cleaned)
}

fn is_inside_word(chars: &[char], i: usize) -> bool {
    i > 0
        && chars[i - 1].is_alphanumeric()
        && chars.get(i + 1).is_some_and(|c| c.is_alphanumeric())
}

/// Normalize a sentence: lowercase, collapse whitespace, strip only leading and trailing
/// punctuation so inner structure (commas, apostrophes) is preserved.
#[must_use]
pub fn normalize_sentence(s: &str) -> String {
    let lowered = collapse_whitespace(&s.to_lowercase());
    lowered
        .trim_matches(|c: char| is_punctuation(c) || c.is_whitespace())
        .to_owned()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Calculate Levenshtein distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;

        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);

            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// `(maxLen - distance) / maxLen`, counted in characters. Two empty strings are identical.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalized_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = levenshtein_distance(a, b);
    (max_len - distance) as f64 / max_len as f64
}
