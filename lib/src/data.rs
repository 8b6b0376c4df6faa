use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::case_study::{CaseStudyChoice, DecisionPoint};
use crate::notebooks::NotebookKey;
use crate::schedule::ScheduleEvent;
use crate::votes::{Votable, Votes};

pub const DEFAULT_TOPIC: &str = "Geral";

/// Kinds of content a user can read, favorite and vote on.
///
/// The serialized name is the `content_type` stored on interaction rows.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Summary,
    Flashcard,
    Question,
    MindMap,
    AudioSummary,
    CaseStudy,
    #[serde(rename = "cronograma")]
    Schedule,
}

impl ContentType {
    pub fn table(self) -> &'static str {
        match self {
            ContentType::Summary => "summaries",
            ContentType::Flashcard => "flashcards",
            ContentType::Question => "questions",
            ContentType::MindMap => "mind_maps",
            ContentType::AudioSummary => "audio_summaries",
            ContentType::CaseStudy => "case_studies",
            ContentType::Schedule => "schedule_events",
        }
    }

    /// XP granted the first time an item of this type is marked as read.
    pub fn read_xp(self) -> i64 {
        match self {
            ContentType::Summary => 5,
            ContentType::Flashcard => 1,
            ContentType::MindMap => 3,
            _ => 0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub questions_answered: u32,
    pub correct_answers: u32,
    pub streak: u32,
    pub topic_performance: BTreeMap<String, TopicPerformance>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct TopicPerformance {
    pub correct: u32,
    pub total: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: String,
    pub pseudonym: String,
    pub level: u32,
    pub xp: i64,
    pub achievements: Vec<String>,
    pub stats: UserStats,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Comment {
    pub id: String,
    #[serde(rename = "authorId")]
    pub author_id: String,
    #[serde(rename = "authorPseudonym")]
    pub author_pseudonym: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub votes: Votes,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Source {
    pub id: Uuid,
    pub user_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub title: String,
    pub summary: Option<String>,
    pub original_filename: Vec<String>,
    pub storage_path: Vec<String>,
    pub drive_links: Vec<String>,
    pub materia: String,
    pub topic: String,
    pub subtopic: Option<String>,
    #[serde(flatten)]
    pub votes: Votes,
    pub comments: Vec<Comment>,

    pub summaries: Vec<Summary>,
    pub flashcards: Vec<Flashcard>,
    pub questions: Vec<Question>,
    pub mind_maps: Vec<MindMap>,
    pub audio_summaries: Vec<AudioSummary>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Summary {
    pub id: Uuid,
    pub source_id: Uuid,
    pub title: String,
    pub content: String,
    pub key_points: Vec<Value>,
    pub related_topics: Vec<String>,
    #[serde(flatten)]
    pub votes: Votes,
    pub comments: Vec<Comment>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Flashcard {
    pub id: Uuid,
    pub source_id: Uuid,
    pub front: String,
    pub back: String,
    #[serde(flatten)]
    pub votes: Votes,
    pub comments: Vec<Comment>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Question {
    pub id: Uuid,
    pub source_id: Uuid,
    pub difficulty: String,
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub hints: Vec<String>,
    #[serde(flatten)]
    pub votes: Votes,
    pub comments: Vec<Comment>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MindMap {
    pub id: Uuid,
    pub source_id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub votes: Votes,
    pub comments: Vec<Comment>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AudioSummary {
    pub id: Uuid,
    pub source_id: Uuid,
    pub title: String,
    pub audio_url: Option<String>,
    #[serde(flatten)]
    pub votes: Votes,
    pub comments: Vec<Comment>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub author: String,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub votes: Votes,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QuestionNotebook {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub question_ids: Vec<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub votes: Votes,
    pub comments: Vec<Comment>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CaseStudy {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub full_case_text: Option<String>,
    pub source_file_path: Option<String>,
    pub correlated_materias: Vec<String>,
    pub key_points: Vec<String>,
    pub decision_points: Vec<DecisionPoint>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub votes: Votes,
    pub comments: Vec<Comment>,
}

/// Read/favorite/vote overlay of one user on one content item.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserContentInteraction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: String,
    pub content_id: String,
    pub content_type: ContentType,
    pub is_read: bool,
    pub is_favorite: bool,
    #[serde(flatten)]
    pub votes: Votes,
}

impl UserContentInteraction {
    pub fn new(user_id: &str, content_id: &str, content_type: ContentType) -> Self {
        Self {
            id: None,
            user_id: user_id.to_owned(),
            content_id: content_id.to_owned(),
            content_type,
            is_read: false,
            is_favorite: false,
            votes: Votes::default(),
        }
    }

    pub fn matches(&self, user_id: &str, content_id: &str, content_type: ContentType) -> bool {
        self.user_id == user_id && self.content_id == content_id && self.content_type == content_type
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserNotebookInteraction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: String,
    pub notebook_id: Uuid,
    pub is_read: bool,
    pub is_favorite: bool,
    #[serde(flatten)]
    pub votes: Votes,
}

impl UserNotebookInteraction {
    pub fn new(user_id: &str, notebook_id: Uuid) -> Self {
        Self {
            id: None,
            user_id: user_id.to_owned(),
            notebook_id,
            is_read: false,
            is_favorite: false,
            votes: Votes::default(),
        }
    }
}

/// Per-user vote tally on a source or a chat message.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserVote {
    pub id: Option<Uuid>,
    pub user_id: String,
    pub target_id: Uuid,
    pub votes: Votes,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserQuestionAnswer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: String,
    pub notebook_id: NotebookKey,
    pub question_id: Uuid,
    pub attempts: Vec<String>,
    pub is_correct_first_try: bool,
    pub xp_awarded: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserCaseStudyInteraction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub user_id: String,
    pub case_study_id: Uuid,
    pub current_decision_point_index: usize,
    pub choices: Vec<CaseStudyChoice>,
    pub xp_earned: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The denormalized in-memory snapshot of everything the client shows.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct AppData {
    pub users: Vec<User>,
    pub sources: Vec<Source>,
    pub chat_messages: Vec<ChatMessage>,
    pub question_notebooks: Vec<QuestionNotebook>,
    pub case_studies: Vec<CaseStudy>,
    pub schedule_events: Vec<ScheduleEvent>,
    pub user_message_votes: Vec<UserVote>,
    pub user_source_votes: Vec<UserVote>,
    pub user_content_interactions: Vec<UserContentInteraction>,
    pub user_notebook_interactions: Vec<UserNotebookInteraction>,
    pub user_question_answers: Vec<UserQuestionAnswer>,
    pub user_case_study_interactions: Vec<UserCaseStudyInteraction>,
}

impl AppData {
    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }

    pub fn source(&self, source_id: Uuid) -> Option<&Source> {
        self.sources.iter().find(|source| source.id == source_id)
    }

    pub fn source_mut(&mut self, source_id: Uuid) -> Option<&mut Source> {
        self.sources.iter_mut().find(|source| source.id == source_id)
    }

    pub fn questions(&self) -> impl Iterator<Item = (&Source, &Question)> {
        self.sources
            .iter()
            .flat_map(|source| source.questions.iter().map(move |question| (source, question)))
    }

    pub fn question(&self, question_id: Uuid) -> Option<(&Source, &Question)> {
        self.questions()
            .find(|(_, question)| question.id == question_id)
    }

    pub fn content_interaction(
        &self,
        user_id: &str,
        content_id: &str,
        content_type: ContentType,
    ) -> Option<&UserContentInteraction> {
        self.user_content_interactions
            .iter()
            .find(|interaction| interaction.matches(user_id, content_id, content_type))
    }

    /// Number of items of `content_type` the user has marked as read.
    pub fn read_count(&self, user_id: &str, content_type: ContentType) -> usize {
        self.user_content_interactions
            .iter()
            .filter(|interaction| {
                interaction.user_id == user_id
                    && interaction.content_type == content_type
                    && interaction.is_read
            })
            .count()
    }

    pub fn favorite_question_ids(&self, user_id: &str) -> Vec<Uuid> {
        self.user_content_interactions
            .iter()
            .filter(|interaction| {
                interaction.user_id == user_id
                    && interaction.content_type == ContentType::Question
                    && interaction.is_favorite
            })
            .filter_map(|interaction| interaction.content_id.parse().ok())
            .collect()
    }

    pub fn answers_for<'a>(
        &'a self,
        user_id: &'a str,
        notebook: &'a NotebookKey,
    ) -> impl Iterator<Item = &'a UserQuestionAnswer> {
        self.user_question_answers
            .iter()
            .filter(move |answer| answer.user_id == user_id && &answer.notebook_id == notebook)
    }

    /// Owner of the content item, used to credit vote XP.
    pub fn author_of(&self, content_type: ContentType, content_id: &str) -> Option<&str> {
        match content_type {
            ContentType::CaseStudy => self
                .case_studies
                .iter()
                .find(|case_study| case_study.id.to_string() == content_id)
                .map(|case_study| case_study.user_id.as_str()),
            ContentType::Schedule => None,
            _ => self
                .sources
                .iter()
                .find(|source| source.contains(content_type, content_id))
                .map(|source| source.user_id.as_str()),
        }
    }

    /// Applies `f` to the votes of the content item, wherever it lives.
    pub fn with_content_votes<F>(&mut self, content_type: ContentType, content_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Votes),
    {
        let votes = match content_type {
            ContentType::CaseStudy => self
                .case_studies
                .iter_mut()
                .find(|case_study| case_study.id.to_string() == content_id)
                .map(Votable::votes_mut),
            ContentType::Schedule => self
                .schedule_events
                .iter_mut()
                .find(|event| event.id == content_id)
                .map(Votable::votes_mut),
            _ => self
                .sources
                .iter_mut()
                .find_map(|source| source.content_votes_mut(content_type, content_id)),
        };

        match votes {
            Some(votes) => {
                f(votes);
                true
            }
            None => false,
        }
    }

    /// The comment thread of the record `id` under `target`.
    pub fn comments_mut(&mut self, target: CommentTarget, id: &str) -> Option<&mut Vec<Comment>> {
        match target {
            CommentTarget::Source => self
                .sources
                .iter_mut()
                .find(|source| source.id.to_string() == id)
                .map(|source| &mut source.comments),
            CommentTarget::Notebook => self
                .question_notebooks
                .iter_mut()
                .find(|notebook| notebook.id.to_string() == id)
                .map(|notebook| &mut notebook.comments),
            CommentTarget::Content(ContentType::CaseStudy) => self
                .case_studies
                .iter_mut()
                .find(|case_study| case_study.id.to_string() == id)
                .map(|case_study| &mut case_study.comments),
            CommentTarget::Content(ContentType::Schedule) => self
                .schedule_events
                .iter_mut()
                .find(|event| event.id == id)
                .map(|event| &mut event.comments),
            CommentTarget::Content(content_type) => self
                .sources
                .iter_mut()
                .find_map(|source| source.content_comments_mut(content_type, id)),
        }
    }
}

impl Source {
    pub fn contains(&self, content_type: ContentType, content_id: &str) -> bool {
        let matches = |id: &Uuid| id.to_string() == content_id;

        match content_type {
            ContentType::Summary => self.summaries.iter().any(|item| matches(&item.id)),
            ContentType::Flashcard => self.flashcards.iter().any(|item| matches(&item.id)),
            ContentType::Question => self.questions.iter().any(|item| matches(&item.id)),
            ContentType::MindMap => self.mind_maps.iter().any(|item| matches(&item.id)),
            ContentType::AudioSummary => self.audio_summaries.iter().any(|item| matches(&item.id)),
            ContentType::CaseStudy | ContentType::Schedule => false,
        }
    }

    fn content_votes_mut(&mut self, content_type: ContentType, content_id: &str) -> Option<&mut Votes> {
        fn find<'a, T: ContentItem>(items: &'a mut [T], content_id: &str) -> Option<&'a mut Votes> {
            items
                .iter_mut()
                .find(|item| item.id().to_string() == content_id)
                .map(Votable::votes_mut)
        }

        match content_type {
            ContentType::Summary => find(&mut self.summaries, content_id),
            ContentType::Flashcard => find(&mut self.flashcards, content_id),
            ContentType::Question => find(&mut self.questions, content_id),
            ContentType::MindMap => find(&mut self.mind_maps, content_id),
            ContentType::AudioSummary => find(&mut self.audio_summaries, content_id),
            ContentType::CaseStudy | ContentType::Schedule => None,
        }
    }

    fn content_comments_mut(
        &mut self,
        content_type: ContentType,
        content_id: &str,
    ) -> Option<&mut Vec<Comment>> {
        fn find<'a, T: ContentItem>(
            items: &'a mut [T],
            content_id: &str,
        ) -> Option<&'a mut Vec<Comment>> {
            items
                .iter_mut()
                .find(|item| item.id().to_string() == content_id)
                .map(ContentItem::comments_mut)
        }

        match content_type {
            ContentType::Summary => find(&mut self.summaries, content_id),
            ContentType::Flashcard => find(&mut self.flashcards, content_id),
            ContentType::Question => find(&mut self.questions, content_id),
            ContentType::MindMap => find(&mut self.mind_maps, content_id),
            ContentType::AudioSummary => find(&mut self.audio_summaries, content_id),
            ContentType::CaseStudy | ContentType::Schedule => None,
        }
    }
}

/// Anything that carries a comment thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentTarget {
    Content(ContentType),
    Source,
    Notebook,
}

impl CommentTarget {
    pub fn table(self) -> &'static str {
        match self {
            CommentTarget::Content(content_type) => content_type.table(),
            CommentTarget::Source => "sources",
            CommentTarget::Notebook => "question_notebooks",
        }
    }
}

/// A content record nested under a source.
pub trait ContentItem: Votable {
    const CONTENT_TYPE: ContentType;

    fn id(&self) -> Uuid;

    fn source_id(&self) -> Uuid;

    fn comments(&self) -> &[Comment];

    fn comments_mut(&mut self) -> &mut Vec<Comment>;

    /// Text handed to AI filtering and shown in listings.
    fn display_text(&self) -> &str;

    /// The items of this kind hanging off `source`.
    fn in_source(source: &Source) -> &[Self]
    where
        Self: Sized;
}

macro_rules! content_item {
    ($ty:ty, $content_type:expr, $text:ident, $field:ident) => {
        impl Votable for $ty {
            fn votes(&self) -> Votes {
                self.votes
            }

            fn votes_mut(&mut self) -> &mut Votes {
                &mut self.votes
            }
        }

        impl ContentItem for $ty {
            const CONTENT_TYPE: ContentType = $content_type;

            fn id(&self) -> Uuid {
                self.id
            }

            fn source_id(&self) -> Uuid {
                self.source_id
            }

            fn comments(&self) -> &[Comment] {
                &self.comments
            }

            fn comments_mut(&mut self) -> &mut Vec<Comment> {
                &mut self.comments
            }

            fn display_text(&self) -> &str {
                &self.$text
            }

            fn in_source(source: &Source) -> &[Self] {
                &source.$field
            }
        }
    };
}

content_item!(Summary, ContentType::Summary, title, summaries);
content_item!(Flashcard, ContentType::Flashcard, front, flashcards);
content_item!(Question, ContentType::Question, question_text, questions);
content_item!(MindMap, ContentType::MindMap, title, mind_maps);
content_item!(AudioSummary, ContentType::AudioSummary, title, audio_summaries);

macro_rules! votable {
    ($($ty:ty),*) => {
        $(
            impl Votable for $ty {
                fn votes(&self) -> Votes {
                    self.votes
                }

                fn votes_mut(&mut self) -> &mut Votes {
                    &mut self.votes
                }
            }
        )*
    };
}

votable!(Source, ChatMessage, QuestionNotebook, CaseStudy, ScheduleEvent);
