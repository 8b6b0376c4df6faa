//! Rows as the backend returns them (nullable columns, flat tables) and the
//! payloads sent on insert. Conversions fill defaults and clamp counts.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::achievements::level_for_xp;
use crate::case_study::{CaseStudyChoice, DecisionPoint};
use crate::data::{
    AudioSummary, CaseStudy, ChatMessage, Comment, ContentType, Flashcard, MindMap, Question,
    QuestionNotebook, Source, Summary, User, UserCaseStudyInteraction, UserContentInteraction,
    UserNotebookInteraction, UserQuestionAnswer, UserStats, UserVote, DEFAULT_TOPIC,
};
use crate::schedule::{EventKind, ScheduleEvent};
use crate::votes::Votes;

/// Comment threads keep the comments that decode. Threads written by older
/// clients may hold entries without an author or timestamp.
fn lenient_comments<'de, D>(deserializer: D) -> Result<Option<Vec<Comment>>, D::Error>
where
    D: Deserializer<'de>,
{
    let thread = Option::<Vec<Value>>::deserialize(deserializer)?;

    Ok(thread.map(|comments| {
        comments
            .into_iter()
            .filter_map(|comment| serde_json::from_value(comment).ok())
            .collect()
    }))
}

#[derive(Deserialize, Debug)]
pub struct RawUser {
    pub id: String,

    pub pseudonym: String,
    pub level: Option<u32>,
    pub xp: Option<i64>,
    pub achievements: Option<Vec<String>>,
    pub stats: Option<UserStats>,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        let xp = raw.xp.unwrap_or(0);

        Self {
            id: raw.id,
            pseudonym: raw.pseudonym,
            level: raw.level.unwrap_or_else(|| level_for_xp(xp)),
            xp,
            achievements: raw.achievements.unwrap_or_default(),
            stats: raw.stats.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawSource {
    pub id: Uuid,

    pub user_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub original_filename: Option<Vec<String>>,
    pub storage_path: Option<Vec<String>>,
    pub drive_links: Option<Vec<String>>,
    pub materia: Option<String>,
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<Vec<Comment>>,
}

impl From<RawSource> for Source {
    fn from(raw: RawSource) -> Self {
        Self {
            id: raw.id,
            user_id: raw.user_id.unwrap_or_default(),
            created_at: raw.created_at,
            title: raw.title.unwrap_or_default(),
            summary: raw.summary,
            original_filename: raw.original_filename.unwrap_or_default(),
            storage_path: raw.storage_path.unwrap_or_default(),
            drive_links: raw.drive_links.unwrap_or_default(),
            materia: non_blank_or_default(raw.materia),
            topic: non_blank_or_default(raw.topic),
            subtopic: raw.subtopic,
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
            comments: raw.comments.unwrap_or_default(),
            summaries: Vec::new(),
            flashcards: Vec::new(),
            questions: Vec::new(),
            mind_maps: Vec::new(),
            audio_summaries: Vec::new(),
        }
    }
}

fn non_blank_or_default(value: Option<String>) -> String {
    value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TOPIC.to_owned())
}

#[derive(Deserialize, Debug)]
pub struct RawSummary {
    pub id: Uuid,
    pub source_id: Uuid,

    pub title: Option<String>,
    pub content: Option<String>,
    pub key_points: Option<Vec<Value>>,
    pub related_topics: Option<Vec<String>>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<Vec<Comment>>,
}

impl From<RawSummary> for Summary {
    fn from(raw: RawSummary) -> Self {
        Self {
            id: raw.id,
            source_id: raw.source_id,
            title: raw.title.unwrap_or_default(),
            content: raw.content.unwrap_or_default(),
            key_points: raw.key_points.unwrap_or_default(),
            related_topics: raw.related_topics.unwrap_or_default(),
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
            comments: raw.comments.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawFlashcard {
    pub id: Uuid,
    pub source_id: Uuid,

    pub front: Option<String>,
    pub back: Option<String>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<Vec<Comment>>,
}

impl From<RawFlashcard> for Flashcard {
    fn from(raw: RawFlashcard) -> Self {
        Self {
            id: raw.id,
            source_id: raw.source_id,
            front: raw.front.unwrap_or_default(),
            back: raw.back.unwrap_or_default(),
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
            comments: raw.comments.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawQuestion {
    pub id: Uuid,
    pub source_id: Uuid,

    pub difficulty: Option<String>,
    pub question_text: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub hints: Option<Vec<String>>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<Vec<Comment>>,
}

impl From<RawQuestion> for Question {
    fn from(raw: RawQuestion) -> Self {
        Self {
            id: raw.id,
            source_id: raw.source_id,
            difficulty: raw.difficulty.unwrap_or_default(),
            question_text: raw.question_text.unwrap_or_default(),
            options: raw.options.unwrap_or_default(),
            correct_answer: raw.correct_answer.unwrap_or_default(),
            explanation: raw.explanation,
            hints: raw.hints.unwrap_or_default(),
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
            comments: raw.comments.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawMindMap {
    pub id: Uuid,
    pub source_id: Uuid,

    pub title: Option<String>,
    pub image_url: Option<String>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<Vec<Comment>>,
}

impl From<RawMindMap> for MindMap {
    fn from(raw: RawMindMap) -> Self {
        Self {
            id: raw.id,
            source_id: raw.source_id,
            title: raw.title.unwrap_or_default(),
            image_url: raw.image_url,
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
            comments: raw.comments.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawAudioSummary {
    pub id: Uuid,
    pub source_id: Uuid,

    pub title: Option<String>,
    pub audio_url: Option<String>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<Vec<Comment>>,
}

impl From<RawAudioSummary> for AudioSummary {
    fn from(raw: RawAudioSummary) -> Self {
        Self {
            id: raw.id,
            source_id: raw.source_id,
            title: raw.title.unwrap_or_default(),
            audio_url: raw.audio_url,
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
            comments: raw.comments.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawChatMessage {
    pub id: Uuid,

    pub author: Option<String>,
    pub text: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
}

impl From<RawChatMessage> for ChatMessage {
    fn from(raw: RawChatMessage) -> Self {
        Self {
            id: raw.id,
            author: raw.author.unwrap_or_default(),
            text: raw.text.unwrap_or_default(),
            timestamp: raw.timestamp,
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawQuestionNotebook {
    pub id: Uuid,

    pub user_id: Option<String>,
    pub name: Option<String>,
    pub question_ids: Option<Vec<Uuid>>,
    pub created_at: Option<DateTime<Utc>>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<Vec<Comment>>,
}

impl From<RawQuestionNotebook> for QuestionNotebook {
    fn from(raw: RawQuestionNotebook) -> Self {
        Self {
            id: raw.id,
            user_id: raw.user_id.unwrap_or_default(),
            name: raw.name.unwrap_or_default(),
            question_ids: raw.question_ids.unwrap_or_default(),
            created_at: raw.created_at,
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
            comments: raw.comments.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawCaseStudy {
    pub id: Uuid,

    pub user_id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub full_case_text: Option<String>,
    pub source_file_path: Option<String>,
    pub correlated_materias: Option<Vec<String>>,
    pub key_points: Option<Vec<String>>,
    pub decision_points: Option<Vec<DecisionPoint>>,
    pub created_at: Option<DateTime<Utc>>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<Vec<Comment>>,
}

impl From<RawCaseStudy> for CaseStudy {
    fn from(raw: RawCaseStudy) -> Self {
        Self {
            id: raw.id,
            user_id: raw.user_id.unwrap_or_default(),
            title: raw.title.unwrap_or_default(),
            summary: raw.summary,
            full_case_text: raw.full_case_text,
            source_file_path: raw.source_file_path,
            correlated_materias: raw.correlated_materias.unwrap_or_default(),
            key_points: raw.key_points.unwrap_or_default(),
            decision_points: raw.decision_points.unwrap_or_default(),
            created_at: raw.created_at,
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
            comments: raw.comments.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawScheduleEvent {
    pub id: String,

    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub title: Option<String>,
    pub professor: Option<String>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub details: Option<String>,
    pub color: Option<String>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: Option<Vec<Comment>>,
}

impl From<RawScheduleEvent> for ScheduleEvent {
    fn from(raw: RawScheduleEvent) -> Self {
        Self {
            id: raw.id,
            date: raw.date,
            start_time: raw.start_time,
            end_time: raw.end_time,
            title: raw.title.unwrap_or_default(),
            professor: raw.professor,
            kind: raw.kind,
            details: raw.details,
            color: raw.color.unwrap_or_default(),
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
            comments: raw.comments.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawContentInteraction {
    pub id: Option<Uuid>,

    pub user_id: String,
    pub content_id: String,
    pub content_type: ContentType,
    pub is_read: Option<bool>,
    pub is_favorite: Option<bool>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
}

impl From<RawContentInteraction> for UserContentInteraction {
    fn from(raw: RawContentInteraction) -> Self {
        Self {
            id: raw.id,
            user_id: raw.user_id,
            content_id: raw.content_id,
            content_type: raw.content_type,
            is_read: raw.is_read.unwrap_or(false),
            is_favorite: raw.is_favorite.unwrap_or(false),
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawNotebookInteraction {
    pub id: Option<Uuid>,

    pub user_id: String,
    pub notebook_id: Uuid,
    pub is_read: Option<bool>,
    pub is_favorite: Option<bool>,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
}

impl From<RawNotebookInteraction> for UserNotebookInteraction {
    fn from(raw: RawNotebookInteraction) -> Self {
        Self {
            id: raw.id,
            user_id: raw.user_id,
            notebook_id: raw.notebook_id,
            is_read: raw.is_read.unwrap_or(false),
            is_favorite: raw.is_favorite.unwrap_or(false),
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
        }
    }
}

/// A row of `user_source_votes` or `user_message_votes`; the target column
/// differs per table.
#[derive(Deserialize, Debug)]
pub struct RawUserVote {
    pub id: Option<Uuid>,

    pub user_id: String,
    #[serde(alias = "source_id", alias = "message_id")]
    pub target_id: Uuid,
    pub hot_votes: Option<i64>,
    pub cold_votes: Option<i64>,
}

impl From<RawUserVote> for UserVote {
    fn from(raw: RawUserVote) -> Self {
        Self {
            id: raw.id,
            user_id: raw.user_id,
            target_id: raw.target_id,
            votes: Votes::from_raw(raw.hot_votes, raw.cold_votes),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RawQuestionAnswer {
    pub id: Option<Uuid>,

    pub user_id: String,
    pub notebook_id: String,
    pub question_id: Uuid,
    pub attempts: Option<Vec<String>>,
    pub is_correct_first_try: Option<bool>,
    pub xp_awarded: Option<u32>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl TryFrom<RawQuestionAnswer> for UserQuestionAnswer {
    type Error = uuid::Error;

    fn try_from(raw: RawQuestionAnswer) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            user_id: raw.user_id,
            notebook_id: raw.notebook_id.parse()?,
            question_id: raw.question_id,
            attempts: raw.attempts.unwrap_or_default(),
            is_correct_first_try: raw.is_correct_first_try.unwrap_or(false),
            xp_awarded: raw.xp_awarded.unwrap_or(0),
            timestamp: raw.timestamp,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct RawCaseStudyInteraction {
    pub id: Option<Uuid>,

    pub user_id: String,
    pub case_study_id: Uuid,
    pub current_decision_point_index: Option<usize>,
    pub choices: Option<Vec<CaseStudyChoice>>,
    pub xp_earned: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<RawCaseStudyInteraction> for UserCaseStudyInteraction {
    fn from(raw: RawCaseStudyInteraction) -> Self {
        Self {
            id: raw.id,
            user_id: raw.user_id,
            case_study_id: raw.case_study_id,
            current_decision_point_index: raw.current_decision_point_index.unwrap_or(0),
            choices: raw.choices.unwrap_or_default(),
            xp_earned: raw.xp_earned.unwrap_or(0),
            completed_at: raw.completed_at,
        }
    }
}

/// Content tables loaded separately and joined onto their sources.
#[derive(Debug, Default)]
pub struct SourceContent {
    pub summaries: Vec<Summary>,
    pub flashcards: Vec<Flashcard>,
    pub questions: Vec<Question>,
    pub mind_maps: Vec<MindMap>,
    pub audio_summaries: Vec<AudioSummary>,
}

impl SourceContent {
    pub fn len(&self) -> usize {
        self.summaries.len()
            + self.flashcards.len()
            + self.questions.len()
            + self.mind_maps.len()
            + self.audio_summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends every record to the source it belongs to. Records whose source
    /// is missing are dropped.
    pub fn join_onto(self, sources: &mut [Source]) {
        fn group<T, F>(items: Vec<T>, source_id: F) -> HashMap<Uuid, Vec<T>>
        where
            F: Fn(&T) -> Uuid,
        {
            let mut groups: HashMap<Uuid, Vec<T>> = HashMap::new();

            for item in items {
                groups.entry(source_id(&item)).or_default().push(item);
            }

            groups
        }

        let mut summaries = group(self.summaries, |item| item.source_id);
        let mut flashcards = group(self.flashcards, |item| item.source_id);
        let mut questions = group(self.questions, |item| item.source_id);
        let mut mind_maps = group(self.mind_maps, |item| item.source_id);
        let mut audio_summaries = group(self.audio_summaries, |item| item.source_id);

        for source in sources {
            source
                .summaries
                .extend(summaries.remove(&source.id).unwrap_or_default());
            source
                .flashcards
                .extend(flashcards.remove(&source.id).unwrap_or_default());
            source
                .questions
                .extend(questions.remove(&source.id).unwrap_or_default());
            source
                .mind_maps
                .extend(mind_maps.remove(&source.id).unwrap_or_default());
            source
                .audio_summaries
                .extend(audio_summaries.remove(&source.id).unwrap_or_default());
        }
    }
}

/// Editable columns of a source.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SourceFields {
    pub title: String,
    pub summary: Option<String>,
    pub original_filename: Vec<String>,
    pub storage_path: Vec<String>,
    pub drive_links: Vec<String>,
    pub materia: String,
    pub topic: String,
    pub subtopic: Option<String>,
}

impl SourceFields {
    pub fn apply_to(&self, source: &mut Source) {
        source.title = self.title.clone();
        source.summary = self.summary.clone();
        source.original_filename = self.original_filename.clone();
        source.storage_path = self.storage_path.clone();
        source.drive_links = self.drive_links.clone();
        source.materia = non_blank_or_default(Some(self.materia.clone()));
        source.topic = non_blank_or_default(Some(self.topic.clone()));
        source.subtopic = self.subtopic.clone();
    }
}

/// Insert payload: `fields` tagged with their owner.
#[derive(Serialize, Debug)]
pub struct Owned<'a, T> {
    pub user_id: &'a str,
    #[serde(flatten)]
    pub fields: &'a T,
}

/// Insert payload: a content record tagged with its source.
#[derive(Serialize, Debug)]
pub struct OfSource<'a, T> {
    pub source_id: Uuid,
    #[serde(flatten)]
    pub fields: &'a T,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NewChatMessage {
    pub author: String,
    pub text: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NewNotebook {
    pub name: String,
    pub question_ids: Vec<Uuid>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NewCaseStudy {
    pub title: String,
    pub summary: Option<String>,
    pub full_case_text: Option<String>,
    pub source_file_path: Option<String>,
    pub correlated_materias: Vec<String>,
    pub key_points: Vec<String>,
    pub decision_points: Vec<DecisionPoint>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NewAudioSummary {
    pub title: String,
    pub audio_url: String,
}

/// Upsert payload of a per-user vote tally; `target_column` names the
/// foreign key column of the table.
pub fn user_vote_row(vote: &UserVote, target_column: &str) -> Value {
    serde_json::json!({
        "user_id": vote.user_id,
        target_column: vote.target_id,
        "hot_votes": vote.votes.hot_votes,
        "cold_votes": vote.votes.cold_votes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebooks::NotebookKey;

    #[test]
    fn test_source_defaults() {
        let raw: RawSource = serde_json::from_str(
            r#"{"id":"6f1c3a4e-5b55-4a53-9f39-1f9b1e0f9a10","title":"Pix","materia":" ","hot_votes":-2}"#,
        )
        .unwrap();
        let source = Source::from(raw);

        assert_eq!(source.materia, DEFAULT_TOPIC);
        assert_eq!(source.topic, DEFAULT_TOPIC);
        assert_eq!(source.votes, Votes::new(0, 0));
        assert!(source.comments.is_empty());
    }

    #[test]
    fn test_comments_without_author_are_dropped() {
        let raw: RawQuestion = serde_json::from_str(
            r#"{"id":"6f1c3a4e-5b55-4a53-9f39-1f9b1e0f9a10",
                "source_id":"6f1c3a4e-5b55-4a53-9f39-1f9b1e0f9a11",
                "question_text":"O que é Pix?",
                "comments":[
                    {"id":"c1","text":"sem autor"},
                    {"id":"c2","authorId":"u1","authorPseudonym":"ana","text":"ok",
                     "timestamp":"2024-03-01T12:00:00Z","hot_votes":2}
                ]}"#,
        )
        .unwrap();
        let question = Question::from(raw);

        assert_eq!(question.comments.len(), 1);
        assert_eq!(question.comments[0].id, "c2");
        assert_eq!(question.comments[0].votes, Votes::new(2, 0));
    }

    #[test]
    fn test_user_level_falls_back_to_xp() {
        let raw: RawUser = serde_json::from_str(r#"{"id":"u1","pseudonym":"ana","xp":230}"#).unwrap();
        let user = User::from(raw);

        assert_eq!(user.level, 3);
        assert_eq!(user.stats, UserStats::default());
    }

    #[test]
    fn test_user_vote_target_alias() {
        let raw: RawUserVote = serde_json::from_str(
            r#"{"user_id":"u1","message_id":"6f1c3a4e-5b55-4a53-9f39-1f9b1e0f9a10","hot_votes":1}"#,
        )
        .unwrap();

        assert_eq!(UserVote::from(raw).votes, Votes::new(1, 0));
    }

    #[test]
    fn test_answer_notebook_key() {
        let raw: RawQuestionAnswer = serde_json::from_str(
            r#"{"user_id":"u1","notebook_id":"favorites_notebook","question_id":"6f1c3a4e-5b55-4a53-9f39-1f9b1e0f9a10","attempts":["A"]}"#,
        )
        .unwrap();
        let answer = UserQuestionAnswer::try_from(raw).unwrap();

        assert_eq!(answer.notebook_id, NotebookKey::Favorites);
        assert!(!answer.is_correct_first_try);
    }

    #[test]
    fn test_join_onto_sources() {
        let mut sources = vec![Source::from(RawSource {
            id: Uuid::new_v4(),
            user_id: None,
            created_at: None,
            title: None,
            summary: None,
            original_filename: None,
            storage_path: None,
            drive_links: None,
            materia: None,
            topic: None,
            subtopic: None,
            hot_votes: None,
            cold_votes: None,
            comments: None,
        })];
        let flashcard = |source_id| Flashcard {
            id: Uuid::new_v4(),
            source_id,
            front: "f".to_owned(),
            back: "b".to_owned(),
            votes: Votes::default(),
            comments: vec![],
        };

        let content = SourceContent {
            flashcards: vec![flashcard(sources[0].id), flashcard(Uuid::new_v4()), flashcard(sources[0].id)],
            ..Default::default()
        };
        content.join_onto(&mut sources);

        assert_eq!(sources[0].flashcards.len(), 2);
    }

    #[test]
    fn test_owned_payload_flattens() {
        let fields = NewNotebook {
            name: "Copom".to_owned(),
            question_ids: vec![],
        };
        let value = serde_json::to_value(Owned {
            user_id: "u1",
            fields: &fields,
        })
        .unwrap();

        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["name"], "Copom");
    }
}
