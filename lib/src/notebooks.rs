//! Question notebooks: saved user-curated subsets plus the two virtual ones
//! every user has (all questions, favorited questions).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{AppData, Question};
use crate::{Error, Result};

pub const ALL_QUESTIONS_KEY: &str = "all_questions";
pub const FAVORITES_KEY: &str = "favorites_notebook";
pub const ALL_QUESTIONS_NAME: &str = "Todas as Questões";
pub const FAVORITES_NAME: &str = "⭐ Questões Favoritas";
pub const DEFAULT_QUESTION_COUNT: usize = 40;
pub const UNKNOWN_PSEUDONYM: &str = "Desconhecido";

/// Identifies the notebook an answer was given in.
///
/// Stored as text so the virtual notebooks can share the column with saved ones.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(into = "String", try_from = "String")]
pub enum NotebookKey {
    Saved(Uuid),
    AllQuestions,
    Favorites,
}

impl fmt::Display for NotebookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotebookKey::Saved(id) => write!(f, "{id}"),
            NotebookKey::AllQuestions => f.write_str(ALL_QUESTIONS_KEY),
            NotebookKey::Favorites => f.write_str(FAVORITES_KEY),
        }
    }
}

impl FromStr for NotebookKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            ALL_QUESTIONS_KEY => Ok(NotebookKey::AllQuestions),
            FAVORITES_KEY => Ok(NotebookKey::Favorites),
            id => Ok(NotebookKey::Saved(id.parse()?)),
        }
    }
}

impl From<NotebookKey> for String {
    fn from(key: NotebookKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for NotebookKey {
    type Error = uuid::Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl NotebookKey {
    pub fn name<'a>(&self, data: &'a AppData) -> &'a str {
        match self {
            NotebookKey::Saved(id) => data
                .question_notebooks
                .iter()
                .find(|notebook| notebook.id == *id)
                .map(|notebook| notebook.name.as_str())
                .unwrap_or_default(),
            NotebookKey::AllQuestions => ALL_QUESTIONS_NAME,
            NotebookKey::Favorites => FAVORITES_NAME,
        }
    }

    /// Questions of the notebook in display order. Ids whose question no
    /// longer exists are skipped.
    pub fn questions<'a>(&self, data: &'a AppData, user_id: &str) -> Vec<&'a Question> {
        let ids: HashSet<Uuid> = match self {
            NotebookKey::AllQuestions => {
                return data.questions().map(|(_, question)| question).collect()
            }
            NotebookKey::Favorites => data.favorite_question_ids(user_id).into_iter().collect(),
            NotebookKey::Saved(id) => data
                .question_notebooks
                .iter()
                .find(|notebook| notebook.id == *id)
                .map(|notebook| notebook.question_ids.iter().copied().collect())
                .unwrap_or_default(),
        };

        data.questions()
            .map(|(_, question)| question)
            .filter(|question| ids.contains(&question.id))
            .collect()
    }
}

/// One tile of the notebook grid.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct NotebookCard {
    pub key: NotebookKey,
    pub name: String,
    pub author: Option<String>,
    pub question_count: usize,
    pub resolved_count: usize,
}

/// Tiles shown to `user_id`: all questions, favorites (only when the user has
/// any), then every saved notebook.
pub fn notebook_cards(data: &AppData, user_id: &str) -> Vec<NotebookCard> {
    let resolved = |key: &NotebookKey| data.answers_for(user_id, key).count();
    let mut cards = Vec::with_capacity(data.question_notebooks.len() + 2);

    let all = NotebookKey::AllQuestions;
    cards.push(NotebookCard {
        name: ALL_QUESTIONS_NAME.to_owned(),
        author: None,
        question_count: data.questions().count(),
        resolved_count: resolved(&all),
        key: all,
    });

    let favorites = data.favorite_question_ids(user_id);
    if !favorites.is_empty() {
        let key = NotebookKey::Favorites;
        cards.push(NotebookCard {
            name: FAVORITES_NAME.to_owned(),
            author: None,
            question_count: favorites.len(),
            resolved_count: resolved(&key),
            key,
        });
    }

    for notebook in &data.question_notebooks {
        let key = NotebookKey::Saved(notebook.id);
        cards.push(NotebookCard {
            name: notebook.name.clone(),
            author: Some(
                data.user(&notebook.user_id)
                    .map(|user| user.pseudonym.clone())
                    .unwrap_or_else(|| UNKNOWN_PSEUDONYM.to_owned()),
            ),
            question_count: notebook.question_ids.len(),
            resolved_count: resolved(&key),
            key,
        });
    }

    cards
}

/// Parameters of a new notebook.
#[derive(Clone, Debug)]
pub struct NotebookDraft {
    pub name: Option<String>,
    pub question_count: usize,
    pub prompt: Option<String>,
    pub source_ids: HashSet<Uuid>,
    pub exclude_answered: bool,
}

impl Default for NotebookDraft {
    fn default() -> Self {
        Self {
            name: None,
            question_count: DEFAULT_QUESTION_COUNT,
            prompt: None,
            source_ids: HashSet::new(),
            exclude_answered: false,
        }
    }
}

impl NotebookDraft {
    pub fn trimmed_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn trimmed_prompt(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
    }

    /// Candidate questions: those of the selected sources (every source with
    /// questions when none is selected), minus ones the user already
    /// answered anywhere when `exclude_answered` is set.
    pub fn question_pool<'a>(&self, data: &'a AppData, user_id: &str) -> Result<Vec<&'a Question>> {
        let answered: HashSet<Uuid> = if self.exclude_answered {
            data.user_question_answers
                .iter()
                .filter(|answer| answer.user_id == user_id)
                .map(|answer| answer.question_id)
                .collect()
        } else {
            HashSet::new()
        };

        let pool = data
            .sources
            .iter()
            .filter(|source| !source.questions.is_empty())
            .filter(|source| self.source_ids.is_empty() || self.source_ids.contains(&source.id))
            .flat_map(|source| source.questions.iter())
            .filter(|question| !answered.contains(&question.id))
            .collect::<Vec<_>>();

        if pool.is_empty() {
            return Err(Error::EmptyQuestionPool);
        }

        Ok(pool)
    }
}

/// Shuffles `ids` and keeps at most `count` of them.
pub fn pick_questions<R: Rng + ?Sized>(mut ids: Vec<Uuid>, count: usize, rng: &mut R) -> Vec<Uuid> {
    ids.shuffle(rng);
    ids.truncate(count);

    ids
}
