//! The data-access seam between the platform and the hosted store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::data::{
    AppData, AudioSummary, CaseStudy, ChatMessage, Comment, CommentTarget, ContentType,
    QuestionNotebook, Source, User, UserCaseStudyInteraction, UserContentInteraction,
    UserNotebookInteraction, UserQuestionAnswer, UserVote,
};
use crate::generator::GeneratedContent;
use crate::notebooks::NotebookKey;
use crate::raw_data::{
    NewAudioSummary, NewCaseStudy, NewChatMessage, NewNotebook, SourceContent, SourceFields,
};
use crate::schedule::ScheduleEvent;
use crate::votes::VoteKind;
use crate::Result;

pub const SOURCES_BUCKET: &str = "sources";

/// Per-user vote tallies kept in their own table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteTable {
    Sources,
    Messages,
}

impl VoteTable {
    pub fn table(self) -> &'static str {
        match self {
            VoteTable::Sources => "user_source_votes",
            VoteTable::Messages => "user_message_votes",
        }
    }

    pub fn target_column(self) -> &'static str {
        match self {
            VoteTable::Sources => "source_id",
            VoteTable::Messages => "message_id",
        }
    }
}

/// Records whose community counters move through a dedicated RPC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteCounter {
    Source,
    Message,
    Notebook,
    CaseStudy,
}

impl VoteCounter {
    pub fn function(self) -> &'static str {
        match self {
            VoteCounter::Source => "increment_source_vote",
            VoteCounter::Message => "increment_message_vote",
            VoteCounter::Notebook => "increment_notebook_vote",
            VoteCounter::CaseStudy => "increment_case_study_vote",
        }
    }

    pub fn id_param(self) -> &'static str {
        match self {
            VoteCounter::Source => "source_id_param",
            VoteCounter::Message => "message_id_param",
            VoteCounter::Notebook => "notebook_id_param",
            VoteCounter::CaseStudy => "case_study_id_param",
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Loads every table and joins content onto sources.
    async fn load_app_data(&self) -> Result<AppData>;

    async fn insert_source(&self, user_id: &str, fields: &SourceFields) -> Result<Source>;

    async fn update_source(&self, source_id: Uuid, fields: &SourceFields) -> Result<()>;

    /// Removes the stored files of a source, then the source itself.
    async fn delete_source(&self, source_id: Uuid, storage_paths: &[String]) -> Result<()>;

    async fn insert_generated_content(
        &self,
        source_id: Uuid,
        content: &GeneratedContent,
    ) -> Result<SourceContent>;

    async fn insert_audio_summary(
        &self,
        source_id: Uuid,
        audio: &NewAudioSummary,
    ) -> Result<AudioSummary>;

    /// Fails with [`crate::Error::DuplicatePseudonym`] when the pseudonym is taken.
    async fn create_user(&self, pseudonym: &str) -> Result<User>;

    async fn update_user(&self, user: &User) -> Result<()>;

    async fn insert_chat_message(&self, message: &NewChatMessage) -> Result<ChatMessage>;

    /// Overwrites the comment thread of one record.
    async fn update_comments(&self, target: CommentTarget, id: &str, comments: &[Comment]) -> Result<()>;

    async fn upsert_content_interaction(
        &self,
        interaction: &UserContentInteraction,
    ) -> Result<UserContentInteraction>;

    async fn increment_content_vote(
        &self,
        content_type: ContentType,
        content_id: &str,
        kind: VoteKind,
        increment: i32,
    ) -> Result<()>;

    async fn upsert_user_vote(&self, table: VoteTable, vote: &UserVote) -> Result<UserVote>;

    async fn increment_vote_count(
        &self,
        counter: VoteCounter,
        id: Uuid,
        kind: VoteKind,
        increment: i32,
    ) -> Result<()>;

    async fn insert_notebook(&self, user_id: &str, notebook: &NewNotebook) -> Result<QuestionNotebook>;

    async fn delete_notebook(&self, notebook_id: Uuid) -> Result<()>;

    async fn upsert_notebook_interaction(
        &self,
        interaction: &UserNotebookInteraction,
    ) -> Result<UserNotebookInteraction>;

    async fn upsert_question_answer(&self, answer: &UserQuestionAnswer) -> Result<UserQuestionAnswer>;

    async fn clear_notebook_answers(&self, user_id: &str, notebook: &NotebookKey) -> Result<()>;

    async fn insert_case_study(&self, user_id: &str, case_study: &NewCaseStudy) -> Result<CaseStudy>;

    async fn upsert_case_study_interaction(
        &self,
        interaction: &UserCaseStudyInteraction,
    ) -> Result<UserCaseStudyInteraction>;

    async fn clear_case_study_progress(&self, user_id: &str, case_study_id: Uuid) -> Result<()>;

    /// Inserts the events that are not stored yet.
    async fn seed_schedule(&self, events: &[ScheduleEvent]) -> Result<()>;
}
