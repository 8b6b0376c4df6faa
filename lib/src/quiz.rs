//! Answering questions inside a notebook.
//!
//! Each question runs a small linear machine:
//!
//! ```text
//! Unanswered -> Attempting -> Correct
//!                          -> Exhausted (third wrong option)
//! ```
//!
//! Completing a question that has no saved answer produces a
//! [`CompletedAnswer`], which carries the ordered attempts and the XP earned.
//! Reopening an answered question resumes straight into its final state.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::data::{AppData, Question, UserQuestionAnswer, UserStats, DEFAULT_TOPIC};
use crate::notebooks::{NotebookKey, UNKNOWN_PSEUDONYM};

pub const MAX_WRONG_ATTEMPTS: usize = 3;

/// XP for a correct answer, indexed by the wrong attempts made before it.
pub const XP_BY_WRONG_ATTEMPTS: [u32; 4] = [10, 5, 2, 0];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerPhase {
    Unanswered,
    Attempting,
    Correct,
    Exhausted,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnswerState {
    selected: Option<String>,
    wrong: Vec<String>,
    completed: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedAnswer {
    pub attempts: Vec<String>,
    pub correct: bool,
    pub is_correct_first_try: bool,
    pub xp: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The question is already completed or the option was already ruled out.
    Ignored,
    Wrong { remaining: usize },
    Completed(CompletedAnswer),
}

impl AnswerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the final state of a question from its saved answer.
    pub fn resume(question: &Question, saved: &UserQuestionAnswer) -> Self {
        let correct = saved
            .attempts
            .iter()
            .any(|attempt| *attempt == question.correct_answer);

        let selected = if correct {
            Some(question.correct_answer.clone())
        } else {
            saved.attempts.last().cloned()
        };

        Self {
            selected,
            wrong: saved
                .attempts
                .iter()
                .filter(|attempt| **attempt != question.correct_answer)
                .cloned()
                .collect(),
            completed: true,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn wrong_attempts(&self) -> &[String] {
        &self.wrong
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn phase(&self, question: &Question) -> AnswerPhase {
        match (self.completed, self.selected.as_deref()) {
            (true, Some(selected)) if selected == question.correct_answer => AnswerPhase::Correct,
            (true, _) => AnswerPhase::Exhausted,
            (false, None) => AnswerPhase::Unanswered,
            (false, Some(_)) => AnswerPhase::Attempting,
        }
    }

    pub fn select(&mut self, question: &Question, option: &str) -> SelectOutcome {
        if self.completed || self.wrong.iter().any(|wrong| wrong == option) {
            return SelectOutcome::Ignored;
        }

        let wrong_before = self.wrong.len();
        let correct = option == question.correct_answer;
        self.selected = Some(option.to_owned());

        if !correct {
            self.wrong.push(option.to_owned());

            if self.wrong.len() < MAX_WRONG_ATTEMPTS {
                return SelectOutcome::Wrong {
                    remaining: MAX_WRONG_ATTEMPTS - self.wrong.len(),
                };
            }
        }

        self.completed = true;

        let mut attempts = self.wrong[..wrong_before].to_vec();
        attempts.push(option.to_owned());

        SelectOutcome::Completed(CompletedAnswer {
            is_correct_first_try: correct && attempts.len() == 1,
            xp: if correct {
                XP_BY_WRONG_ATTEMPTS.get(wrong_before).copied().unwrap_or(0)
            } else {
                0
            },
            attempts,
            correct,
        })
    }

    /// One hint per wrong attempt; every hint once answered correctly.
    pub fn revealed_hints<'q>(&self, question: &'q Question) -> &'q [String] {
        if self.phase(question) == AnswerPhase::Correct {
            return &question.hints;
        }

        &question.hints[..self.wrong.len().min(question.hints.len())]
    }
}

/// Folds a completed answer into the user's statistics.
pub fn record_in_stats(stats: &mut UserStats, topic: Option<&str>, answer: &CompletedAnswer) {
    stats.questions_answered += 1;

    if answer.is_correct_first_try {
        stats.correct_answers += 1;
        stats.streak += 1;
    } else {
        stats.streak = 0;
    }

    let performance = stats
        .topic_performance
        .entry(topic.unwrap_or(DEFAULT_TOPIC).to_owned())
        .or_default();
    performance.total += 1;

    if answer.is_correct_first_try {
        performance.correct += 1;
    }
}

pub fn previous_index(current: usize) -> Option<usize> {
    current.checked_sub(1)
}

pub fn next_index(current: usize, len: usize) -> Option<usize> {
    Some(current + 1).filter(|next| *next < len)
}

/// Index of the next unanswered question after `current`, wrapping around to
/// the start. `None` once every question has an answer.
pub fn next_unanswered(questions: &[&Question], current: usize, answered: &HashSet<Uuid>) -> Option<usize> {
    let is_open = |index: &usize| !answered.contains(&questions[*index].id);

    (current + 1..questions.len())
        .find(is_open)
        .or_else(|| (0..current.min(questions.len())).find(is_open))
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct OptionShare {
    pub option: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct QuestionStats {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub distribution: Vec<OptionShare>,
}

/// First-attempt statistics of a question across every user and notebook.
pub fn question_stats(question: &Question, answers: &[UserQuestionAnswer]) -> QuestionStats {
    let answers = answers
        .iter()
        .filter(|answer| answer.question_id == question.id)
        .collect::<Vec<_>>();

    let first_tries = answers
        .iter()
        .filter_map(|answer| answer.attempts.first())
        .collect::<Vec<_>>();
    let total = first_tries.len();
    let correct = answers
        .iter()
        .filter(|answer| answer.is_correct_first_try)
        .count();

    let mut distribution = question
        .options
        .iter()
        .map(|option| {
            let count = first_tries.iter().filter(|attempt| **attempt == option).count();

            OptionShare {
                option: option.clone(),
                count,
                percentage: percentage(count, total),
            }
        })
        .collect::<Vec<_>>();

    if total > 0 {
        distribution.sort_by(|a, b| b.count.cmp(&a.count));
    }

    QuestionStats {
        total,
        correct,
        incorrect: total.saturating_sub(correct),
        distribution,
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub pseudonym: String,
    pub score: usize,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct NotebookStats {
    pub total_questions: usize,
    pub answered: usize,
    pub correct_first_try: usize,
    pub accuracy: f64,
    pub progress: f64,
    pub leaderboard: Vec<LeaderboardEntry>,
}

pub fn notebook_stats(data: &AppData, user_id: &str, notebook: &NotebookKey) -> NotebookStats {
    let total_questions = notebook.questions(data, user_id).len();
    let answers = data.answers_for(user_id, notebook).collect::<Vec<_>>();
    let answered = answers.len();
    let correct_first_try = answers
        .iter()
        .filter(|answer| answer.is_correct_first_try)
        .count();

    NotebookStats {
        total_questions,
        answered,
        correct_first_try,
        accuracy: percentage(correct_first_try, answered),
        progress: percentage(answered, total_questions),
        leaderboard: leaderboard(data, notebook),
    }
}

/// Users ranked by correct first tries within `notebook`.
pub fn leaderboard(data: &AppData, notebook: &NotebookKey) -> Vec<LeaderboardEntry> {
    let mut scores: BTreeMap<&str, usize> = BTreeMap::new();

    for answer in data
        .user_question_answers
        .iter()
        .filter(|answer| &answer.notebook_id == notebook)
    {
        let score = scores.entry(answer.user_id.as_str()).or_default();

        if answer.is_correct_first_try {
            *score += 1;
        }
    }

    let mut entries = scores
        .into_iter()
        .map(|(user_id, score)| LeaderboardEntry {
            user_id: user_id.to_owned(),
            pseudonym: data
                .user(user_id)
                .map(|user| user.pseudonym.clone())
                .unwrap_or_else(|| UNKNOWN_PSEUDONYM.to_owned()),
            score,
        })
        .collect::<Vec<_>>();
    entries.sort_by(|a, b| b.score.cmp(&a.score));

    entries
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
