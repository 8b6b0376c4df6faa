//! The client session: the loaded snapshot, the signed-in user and every
//! mutation a user can make.
//!
//! Mutations patch the snapshot first and persist afterwards. When persisting
//! fails, the snapshot is restored to what it was before the mutation and the
//! error is returned to the caller.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::achievements::{check_and_award, level_for_xp};
use crate::backend::{Backend, VoteCounter, VoteTable};
use crate::case_study;
use crate::data::{
    AppData, AudioSummary, CaseStudy, ChatMessage, Comment, CommentTarget, ContentType,
    QuestionNotebook, Question, Source, User, UserCaseStudyInteraction, UserContentInteraction,
    UserNotebookInteraction, UserQuestionAnswer, UserVote,
};
use crate::generator::{ContentGenerator, GeneratedContent, GeneratedKind, PromptItem};
use crate::notebooks::{pick_questions, NotebookDraft, NotebookKey};
use crate::quiz::{record_in_stats, AnswerState, SelectOutcome};
use crate::raw_data::{NewAudioSummary, NewCaseStudy, NewChatMessage, NewNotebook, SourceFields};
use crate::schedule::{sort_events, COURSE_SCHEDULE};
use crate::votes::{self, author_xp_change, can_step, new_comment, VoteKind, VoteStep, Votes};
use crate::{Error, Result};

/// Sources whose summaries ground a "generate more" request.
const MAX_CONTEXT_SOURCES: usize = 5;

/// Read/favorite flags to set; `None` leaves the flag untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InteractionUpdate {
    pub is_read: Option<bool>,
    pub is_favorite: Option<bool>,
}

impl InteractionUpdate {
    pub fn read(is_read: bool) -> Self {
        Self {
            is_read: Some(is_read),
            is_favorite: None,
        }
    }

    pub fn favorite(is_favorite: bool) -> Self {
        Self {
            is_read: None,
            is_favorite: Some(is_favorite),
        }
    }
}

pub struct Platform<B, G> {
    backend: B,
    generator: G,
    data: AppData,
    user_id: Option<String>,
}

impl<B: Backend, G: ContentGenerator> Platform<B, G> {
    pub fn new(backend: B, generator: G) -> Self {
        Self::with_data(backend, generator, AppData::default())
    }

    pub fn with_data(backend: B, generator: G, data: AppData) -> Self {
        Self {
            backend,
            generator,
            data,
            user_id: None,
        }
    }

    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current_user(&self) -> Option<&User> {
        self.data.user(self.user_id.as_deref()?)
    }

    /// Replaces the snapshot with a fresh load of every table.
    pub async fn load(&mut self) -> Result<()> {
        self.data = self.backend.load_app_data().await?;

        info!(
            users = self.data.users.len(),
            sources = self.data.sources.len(),
            "snapshot loaded"
        );

        Ok(())
    }

    pub fn sign_in(&mut self, user_id: &str) -> Result<&User> {
        if self.data.user(user_id).is_none() {
            return Err(Error::NotFound(format!("user {user_id}")));
        }

        self.user_id = Some(user_id.to_owned());

        self.current_user()
            .ok_or_else(|| Error::NotFound(format!("user {user_id}")))
    }

    pub fn sign_out(&mut self) {
        self.user_id = None;
    }

    /// Creates a user and signs in as them.
    pub async fn register(&mut self, pseudonym: &str) -> Result<User> {
        let pseudonym = pseudonym.trim();

        if pseudonym.is_empty() {
            return Err(Error::InvalidContent(anyhow::anyhow!("pseudonym is empty")));
        }

        let user = self.backend.create_user(pseudonym).await?;

        info!(user = %user.pseudonym, "user registered");

        self.data.users.push(user.clone());
        self.user_id = Some(user.id.clone());

        Ok(user)
    }

    fn user(&self) -> Result<User> {
        self.current_user()
            .cloned()
            .ok_or_else(|| Error::NotFound("signed-in user".to_owned()))
    }

    fn replace_user(&mut self, user: User) {
        match self.data.users.iter_mut().find(|existing| existing.id == user.id) {
            Some(existing) => *existing = user,
            None => self.data.users.push(user),
        }
    }

    /// Returns `result`, restoring `snapshot` first when it is an error.
    fn settle<T>(&mut self, snapshot: AppData, action: &str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            error!(action, "persisting failed, reverting local changes: {err}");
            self.data = snapshot;
        }

        result
    }

    // Content interactions

    /// Sets the read/favorite flags of a content item. Marking an unread item
    /// as read grants the XP of its type once.
    pub async fn update_interaction(
        &mut self,
        content_type: ContentType,
        content_id: &str,
        update: InteractionUpdate,
    ) -> Result<()> {
        let mut user = self.user()?;
        let snapshot = self.data.clone();

        let (before, interaction) =
            self.merge_interaction(&user.id, content_type, content_id, |interaction| {
                if let Some(is_read) = update.is_read {
                    interaction.is_read = is_read;
                }
                if let Some(is_favorite) = update.is_favorite {
                    interaction.is_favorite = is_favorite;
                }
            });

        let rewarded = if !before.is_read && interaction.is_read && content_type.read_xp() > 0 {
            user.xp += content_type.read_xp();
            let user = check_and_award(user, &self.data);
            self.replace_user(user.clone());

            Some(user)
        } else {
            None
        };

        let result = async {
            let stored = self.backend.upsert_content_interaction(&interaction).await?;

            if let Some(user) = &rewarded {
                self.backend.update_user(user).await?;
            }

            Ok::<_, Error>(stored)
        }
        .await;

        let stored = self.settle(snapshot, "update interaction", result)?;
        self.store_interaction(stored);

        Ok(())
    }

    /// Applies `f` to the user's interaction with the item, creating it when
    /// missing. Returns the interaction before and after.
    fn merge_interaction<F>(
        &mut self,
        user_id: &str,
        content_type: ContentType,
        content_id: &str,
        f: F,
    ) -> (UserContentInteraction, UserContentInteraction)
    where
        F: FnOnce(&mut UserContentInteraction),
    {
        let interactions = &mut self.data.user_content_interactions;
        let index = match interactions
            .iter()
            .position(|interaction| interaction.matches(user_id, content_id, content_type))
        {
            Some(index) => index,
            None => {
                interactions.push(UserContentInteraction::new(user_id, content_id, content_type));
                interactions.len() - 1
            }
        };

        let before = interactions[index].clone();
        f(&mut interactions[index]);

        (before, interactions[index].clone())
    }

    fn store_interaction(&mut self, stored: UserContentInteraction) {
        if let Some(existing) = self.data.user_content_interactions.iter_mut().find(|existing| {
            existing.matches(&stored.user_id, &stored.content_id, stored.content_type)
        }) {
            *existing = stored;
        }
    }

    // Votes

    /// Moves the user's vote on a content item, the item's counter and the
    /// author's XP. Steps the tally does not allow are ignored.
    pub async fn vote_content(
        &mut self,
        content_type: ContentType,
        content_id: &str,
        kind: VoteKind,
        step: VoteStep,
    ) -> Result<()> {
        let user = self.user()?;
        let tally = self
            .data
            .content_interaction(&user.id, content_id, content_type)
            .map(|interaction| interaction.votes)
            .unwrap_or_default();

        if !can_step(tally, kind, step) {
            debug!(?content_type, content_id, ?kind, ?step, "ignoring vote step");
            return Ok(());
        }

        let delta = step.delta();
        let snapshot = self.data.clone();

        if !self
            .data
            .with_content_votes(content_type, content_id, |votes| votes.apply(kind, delta))
        {
            return Err(Error::NotFound(format!("{} {content_id}", content_type.table())));
        }

        let (_, interaction) =
            self.merge_interaction(&user.id, content_type, content_id, |interaction| {
                interaction.votes.apply(kind, delta)
            });

        let result = async {
            let stored = self.backend.upsert_content_interaction(&interaction).await?;

            if content_type == ContentType::CaseStudy {
                let id = content_id.parse::<Uuid>()?;
                self.backend
                    .increment_vote_count(VoteCounter::CaseStudy, id, kind, delta)
                    .await?;
            } else {
                self.backend
                    .increment_content_vote(content_type, content_id, kind, delta)
                    .await?;
            }

            Ok::<_, Error>(stored)
        }
        .await;

        let stored = self.settle(snapshot, "vote on content", result)?;
        self.store_interaction(stored);

        let author = self
            .data
            .author_of(content_type, content_id)
            .map(str::to_owned);
        self.credit_author(author, &user.id, kind, step).await;

        Ok(())
    }

    pub async fn vote_source(&mut self, source_id: Uuid, kind: VoteKind, step: VoteStep) -> Result<()> {
        let user = self.user()?;
        let author = self
            .data
            .source(source_id)
            .map(|source| source.user_id.clone())
            .ok_or_else(|| Error::NotFound(format!("source {source_id}")))?;

        let snapshot = self.data.clone();
        let vote = match self.step_user_vote(VoteTable::Sources, &user.id, source_id, kind, step) {
            Some(vote) => vote,
            None => return Ok(()),
        };

        if let Some(source) = self.data.source_mut(source_id) {
            source.votes.apply(kind, step.delta());
        }

        let result = self
            .persist_user_vote(VoteTable::Sources, VoteCounter::Source, &vote, kind, step)
            .await;
        let stored = self.settle(snapshot, "vote on source", result)?;
        self.store_user_vote(VoteTable::Sources, stored);

        self.credit_author(Some(author), &user.id, kind, step).await;

        Ok(())
    }

    pub async fn vote_message(&mut self, message_id: Uuid, kind: VoteKind, step: VoteStep) -> Result<()> {
        let user = self.user()?;

        if !self.data.chat_messages.iter().any(|message| message.id == message_id) {
            return Err(Error::NotFound(format!("chat message {message_id}")));
        }

        let snapshot = self.data.clone();
        let vote = match self.step_user_vote(VoteTable::Messages, &user.id, message_id, kind, step) {
            Some(vote) => vote,
            None => return Ok(()),
        };

        if let Some(message) = self
            .data
            .chat_messages
            .iter_mut()
            .find(|message| message.id == message_id)
        {
            message.votes.apply(kind, step.delta());
        }

        let result = self
            .persist_user_vote(VoteTable::Messages, VoteCounter::Message, &vote, kind, step)
            .await;
        let stored = self.settle(snapshot, "vote on message", result)?;
        self.store_user_vote(VoteTable::Messages, stored);

        Ok(())
    }

    fn user_votes_mut(&mut self, table: VoteTable) -> &mut Vec<UserVote> {
        match table {
            VoteTable::Sources => &mut self.data.user_source_votes,
            VoteTable::Messages => &mut self.data.user_message_votes,
        }
    }

    /// Moves the user's tally on `target_id`. `None` when the step is refused.
    fn step_user_vote(
        &mut self,
        table: VoteTable,
        user_id: &str,
        target_id: Uuid,
        kind: VoteKind,
        step: VoteStep,
    ) -> Option<UserVote> {
        let votes = self.user_votes_mut(table);
        let index = votes
            .iter()
            .position(|vote| vote.user_id == user_id && vote.target_id == target_id);
        let tally = index.map(|index| votes[index].votes).unwrap_or_default();

        if !can_step(tally, kind, step) {
            debug!(%target_id, ?kind, ?step, "ignoring vote step");
            return None;
        }

        let index = index.unwrap_or_else(|| {
            votes.push(UserVote {
                id: None,
                user_id: user_id.to_owned(),
                target_id,
                votes: Votes::default(),
            });
            votes.len() - 1
        });
        votes[index].votes.apply(kind, step.delta());

        Some(votes[index].clone())
    }

    async fn persist_user_vote(
        &self,
        table: VoteTable,
        counter: VoteCounter,
        vote: &UserVote,
        kind: VoteKind,
        step: VoteStep,
    ) -> Result<UserVote> {
        let stored = self.backend.upsert_user_vote(table, vote).await?;
        self.backend
            .increment_vote_count(counter, vote.target_id, kind, step.delta())
            .await?;

        Ok(stored)
    }

    fn store_user_vote(&mut self, table: VoteTable, stored: UserVote) {
        if let Some(existing) = self
            .user_votes_mut(table)
            .iter_mut()
            .find(|vote| vote.user_id == stored.user_id && vote.target_id == stored.target_id)
        {
            *existing = stored;
        }
    }

    /// Adjusts the author's XP for a vote. Self-votes earn nothing and a
    /// failure here leaves the vote itself in place.
    async fn credit_author(
        &mut self,
        author_id: Option<String>,
        voter_id: &str,
        kind: VoteKind,
        step: VoteStep,
    ) {
        let mut author = match author_id
            .filter(|author_id| author_id != voter_id)
            .and_then(|author_id| self.data.user(&author_id).cloned())
        {
            Some(author) => author,
            None => return,
        };

        author.xp += author_xp_change(kind, step);
        author.level = level_for_xp(author.xp);

        match self.backend.update_user(&author).await {
            Ok(()) => self.replace_user(author),
            Err(err) => warn!(author = %author.pseudonym, "failed to credit vote XP: {err}"),
        }
    }

    // Notebooks

    pub async fn vote_notebook(&mut self, notebook_id: Uuid, kind: VoteKind, step: VoteStep) -> Result<()> {
        let user = self.user()?;
        let author = self
            .data
            .question_notebooks
            .iter()
            .find(|notebook| notebook.id == notebook_id)
            .map(|notebook| notebook.user_id.clone())
            .ok_or_else(|| Error::NotFound(format!("notebook {notebook_id}")))?;

        let tally = self
            .data
            .user_notebook_interactions
            .iter()
            .find(|interaction| interaction.user_id == user.id && interaction.notebook_id == notebook_id)
            .map(|interaction| interaction.votes)
            .unwrap_or_default();

        if !can_step(tally, kind, step) {
            debug!(%notebook_id, ?kind, ?step, "ignoring vote step");
            return Ok(());
        }

        let delta = step.delta();
        let snapshot = self.data.clone();

        if let Some(notebook) = self
            .data
            .question_notebooks
            .iter_mut()
            .find(|notebook| notebook.id == notebook_id)
        {
            notebook.votes.apply(kind, delta);
        }

        let interaction = self.merge_notebook_interaction(&user.id, notebook_id, |interaction| {
            interaction.votes.apply(kind, delta)
        });

        let result = async {
            let stored = self.backend.upsert_notebook_interaction(&interaction).await?;
            self.backend
                .increment_vote_count(VoteCounter::Notebook, notebook_id, kind, delta)
                .await?;

            Ok::<_, Error>(stored)
        }
        .await;

        let stored = self.settle(snapshot, "vote on notebook", result)?;
        self.store_notebook_interaction(stored);

        self.credit_author(Some(author), &user.id, kind, step).await;

        Ok(())
    }

    pub async fn update_notebook_interaction(
        &mut self,
        notebook_id: Uuid,
        update: InteractionUpdate,
    ) -> Result<()> {
        let user = self.user()?;
        let snapshot = self.data.clone();

        let interaction = self.merge_notebook_interaction(&user.id, notebook_id, |interaction| {
            if let Some(is_read) = update.is_read {
                interaction.is_read = is_read;
            }
            if let Some(is_favorite) = update.is_favorite {
                interaction.is_favorite = is_favorite;
            }
        });

        let result = self.backend.upsert_notebook_interaction(&interaction).await;
        let stored = self.settle(snapshot, "update notebook interaction", result)?;
        self.store_notebook_interaction(stored);

        Ok(())
    }

    fn merge_notebook_interaction<F>(
        &mut self,
        user_id: &str,
        notebook_id: Uuid,
        f: F,
    ) -> UserNotebookInteraction
    where
        F: FnOnce(&mut UserNotebookInteraction),
    {
        let interactions = &mut self.data.user_notebook_interactions;
        let index = match interactions
            .iter()
            .position(|interaction| interaction.user_id == user_id && interaction.notebook_id == notebook_id)
        {
            Some(index) => index,
            None => {
                interactions.push(UserNotebookInteraction::new(user_id, notebook_id));
                interactions.len() - 1
            }
        };

        f(&mut interactions[index]);

        interactions[index].clone()
    }

    fn store_notebook_interaction(&mut self, stored: UserNotebookInteraction) {
        if let Some(existing) = self
            .data
            .user_notebook_interactions
            .iter_mut()
            .find(|existing| existing.user_id == stored.user_id && existing.notebook_id == stored.notebook_id)
        {
            *existing = stored;
        }
    }

    /// Builds and stores a notebook from `draft`.
    ///
    /// With a prompt, the pool is narrowed by the generator first; when that
    /// fails or keeps nothing the whole pool is used. A blank name is
    /// replaced by a generated one.
    pub async fn create_notebook(&mut self, draft: &NotebookDraft) -> Result<QuestionNotebook> {
        let user = self.user()?;
        let pool = draft
            .question_pool(&self.data, &user.id)?
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

        let pool = match draft.trimmed_prompt() {
            Some(prompt) => self.filter_pool(prompt, pool).await,
            None => pool,
        };

        let question_ids = {
            let mut rng = rand::thread_rng();
            pick_questions(
                pool.iter().map(|question| question.id).collect(),
                draft.question_count,
                &mut rng,
            )
        };

        let name = match draft.trimmed_name() {
            Some(name) => name.to_owned(),
            None => {
                let texts = pool
                    .iter()
                    .filter(|question| question_ids.contains(&question.id))
                    .map(|question| question.question_text.as_str())
                    .collect::<Vec<_>>();

                self.generator.generate_notebook_name(&texts).await?
            }
        };

        let notebook = self
            .backend
            .insert_notebook(&user.id, &NewNotebook { name, question_ids })
            .await?;

        info!(notebook = %notebook.name, questions = notebook.question_ids.len(), "notebook created");

        self.data.question_notebooks.insert(0, notebook.clone());

        Ok(notebook)
    }

    async fn filter_pool(&self, prompt: &str, pool: Vec<Question>) -> Vec<Question> {
        let items = pool
            .iter()
            .map(|question| PromptItem {
                id: question.id.to_string(),
                text: question.question_text.clone(),
            })
            .collect::<Vec<_>>();

        match self.generator.filter_items_by_prompt(prompt, &items).await {
            Ok(ids) => {
                let ids = ids.into_iter().collect::<HashSet<_>>();
                let filtered = pool
                    .iter()
                    .filter(|question| ids.contains(&question.id.to_string()))
                    .cloned()
                    .collect::<Vec<_>>();

                if filtered.is_empty() {
                    warn!(prompt, "no question matched the prompt, using the whole pool");
                    pool
                } else {
                    filtered
                }
            }
            Err(err) => {
                warn!(prompt, "filtering questions failed, using the whole pool: {err}");
                pool
            }
        }
    }

    pub async fn delete_notebook(&mut self, notebook_id: Uuid) -> Result<()> {
        let snapshot = self.data.clone();
        let key = NotebookKey::Saved(notebook_id);

        self.data
            .question_notebooks
            .retain(|notebook| notebook.id != notebook_id);
        self.data
            .user_notebook_interactions
            .retain(|interaction| interaction.notebook_id != notebook_id);
        self.data
            .user_question_answers
            .retain(|answer| answer.notebook_id != key);

        let result = self.backend.delete_notebook(notebook_id).await;

        self.settle(snapshot, "delete notebook", result)
    }

    // Answering

    fn saved_answer(&self, notebook: &NotebookKey, question_id: Uuid) -> Option<&UserQuestionAnswer> {
        let user_id = self.user_id.as_deref()?;

        self.data.user_question_answers.iter().find(|answer| {
            answer.user_id == user_id && &answer.notebook_id == notebook && answer.question_id == question_id
        })
    }

    /// The answering state of a question, resumed from its saved answer.
    pub fn answer_state(&self, notebook: &NotebookKey, question_id: Uuid) -> AnswerState {
        match (
            self.data.question(question_id),
            self.saved_answer(notebook, question_id),
        ) {
            (Some((_, question)), Some(saved)) => AnswerState::resume(question, saved),
            _ => AnswerState::new(),
        }
    }

    pub fn answered_question_ids(&self, notebook: &NotebookKey) -> HashSet<Uuid> {
        match self.user_id.as_deref() {
            Some(user_id) => self
                .data
                .answers_for(user_id, notebook)
                .map(|answer| answer.question_id)
                .collect(),
            None => HashSet::new(),
        }
    }

    /// Selects `option` on a question. The first completion of a question in
    /// a notebook is saved along with the XP and statistics it earns.
    pub async fn select_option(
        &mut self,
        notebook: &NotebookKey,
        question_id: Uuid,
        state: &mut AnswerState,
        option: &str,
    ) -> Result<SelectOutcome> {
        let mut user = self.user()?;
        let (topic, question) = self
            .data
            .question(question_id)
            .map(|(source, question)| (source.topic.clone(), question.clone()))
            .ok_or_else(|| Error::NotFound(format!("question {question_id}")))?;

        let outcome = state.select(&question, option);

        let answer = match outcome.clone() {
            SelectOutcome::Completed(answer) if self.saved_answer(notebook, question_id).is_none() => answer,
            _ => return Ok(outcome),
        };

        let snapshot = self.data.clone();

        let record = UserQuestionAnswer {
            id: None,
            user_id: user.id.clone(),
            notebook_id: notebook.clone(),
            question_id,
            attempts: answer.attempts.clone(),
            is_correct_first_try: answer.is_correct_first_try,
            xp_awarded: answer.xp,
            timestamp: Some(Utc::now()),
        };
        self.data.user_question_answers.push(record.clone());

        record_in_stats(&mut user.stats, Some(&topic), &answer);
        user.xp += i64::from(answer.xp);
        let user = check_and_award(user, &self.data);
        self.replace_user(user.clone());

        let result = async {
            let stored = self.backend.upsert_question_answer(&record).await?;
            self.backend.update_user(&user).await?;

            Ok::<_, Error>(stored)
        }
        .await;

        let stored = self.settle(snapshot, "record answer", result)?;

        if let Some(existing) = self.data.user_question_answers.iter_mut().rev().find(|existing| {
            existing.user_id == stored.user_id
                && existing.notebook_id == stored.notebook_id
                && existing.question_id == stored.question_id
        }) {
            *existing = stored;
        }

        Ok(outcome)
    }

    /// Forgets the user's answers in one notebook so it can be retaken.
    pub async fn clear_notebook_answers(&mut self, notebook: &NotebookKey) -> Result<()> {
        let user = self.user()?;
        let snapshot = self.data.clone();

        self.data
            .user_question_answers
            .retain(|answer| !(answer.user_id == user.id && &answer.notebook_id == notebook));

        let result = self.backend.clear_notebook_answers(&user.id, notebook).await;

        self.settle(snapshot, "clear notebook answers", result)
    }

    // Comments

    pub async fn add_comment(&mut self, target: CommentTarget, id: &str, text: &str) -> Result<()> {
        let user = self.user()?;
        let comment = match new_comment(&user, text) {
            Some(comment) => comment,
            None => return Ok(()),
        };

        self.update_thread(target, id, "add comment", |comments| {
            comments.push(comment);
            true
        })
        .await
    }

    pub async fn vote_comment(
        &mut self,
        target: CommentTarget,
        id: &str,
        comment_id: &str,
        kind: VoteKind,
    ) -> Result<()> {
        self.update_thread(target, id, "vote on comment", |comments| {
            votes::vote_comment(comments, comment_id, kind)
        })
        .await
    }

    /// Runs `f` on a comment thread and stores the result. `f` returns
    /// whether the comment it was looking for exists.
    async fn update_thread<F>(&mut self, target: CommentTarget, id: &str, action: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<Comment>) -> bool,
    {
        let snapshot = self.data.clone();
        let comments = self
            .data
            .comments_mut(target, id)
            .ok_or_else(|| Error::NotFound(format!("{} {id}", target.table())))?;

        if !f(comments) {
            return Err(Error::NotFound(format!("comment on {} {id}", target.table())));
        }

        let comments = comments.clone();
        let result = self.backend.update_comments(target, id, &comments).await;

        self.settle(snapshot, action, result)
    }

    // Sources and generated content

    pub async fn add_source(&mut self, fields: &SourceFields) -> Result<Source> {
        let user = self.user()?;
        let source = self.backend.insert_source(&user.id, fields).await?;

        info!(source = %source.title, "source added");

        self.data.sources.insert(0, source.clone());

        Ok(source)
    }

    pub async fn update_source(&mut self, source_id: Uuid, fields: &SourceFields) -> Result<()> {
        let snapshot = self.data.clone();
        let source = self
            .data
            .source_mut(source_id)
            .ok_or_else(|| Error::NotFound(format!("source {source_id}")))?;

        fields.apply_to(source);

        let result = self.backend.update_source(source_id, fields).await;

        self.settle(snapshot, "update source", result)
    }

    /// Deletes a source along with its stored files and nested content.
    pub async fn delete_source(&mut self, source_id: Uuid) -> Result<()> {
        let storage_paths = self
            .data
            .source(source_id)
            .map(|source| source.storage_path.clone())
            .ok_or_else(|| Error::NotFound(format!("source {source_id}")))?;

        let snapshot = self.data.clone();
        self.data.sources.retain(|source| source.id != source_id);

        let result = self.backend.delete_source(source_id, &storage_paths).await;

        self.settle(snapshot, "delete source", result)
    }

    /// Generates the initial content of a source from its extracted `text`.
    /// Returns the number of records stored.
    pub async fn generate_source_content(&mut self, source_id: Uuid, text: &str) -> Result<usize> {
        let (title, existing) = self
            .data
            .source(source_id)
            .map(|source| (source.title.clone(), source.questions.clone()))
            .ok_or_else(|| Error::NotFound(format!("source {source_id}")))?;

        let content = self
            .generator
            .generate_source_content(&title, text)
            .await?
            .validated(&existing)?;

        self.store_generated(source_id, content).await
    }

    /// Generates more content of one kind from the selected sources, or from
    /// every source when none is selected. New records go to the first of them.
    pub async fn generate_more_content(
        &mut self,
        kind: GeneratedKind,
        source_ids: &HashSet<Uuid>,
        prompt: &str,
    ) -> Result<usize> {
        let (target_id, existing, context) = {
            let sources = self
                .data
                .sources
                .iter()
                .filter(|source| source_ids.is_empty() || source_ids.contains(&source.id))
                .collect::<Vec<_>>();

            let target = sources.first().ok_or(Error::NoSources)?;
            let context = sources
                .iter()
                .take(MAX_CONTEXT_SOURCES)
                .map(|source| {
                    format!(
                        "Fonte: {}\n{}",
                        source.title,
                        source.summary.as_deref().unwrap_or_default()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n");

            (target.id, target.questions.clone(), context)
        };

        let content = self
            .generator
            .generate_specific_content(kind, &context, prompt)
            .await?
            .validated(&existing)?;

        self.store_generated(target_id, content).await
    }

    async fn store_generated(&mut self, source_id: Uuid, content: GeneratedContent) -> Result<usize> {
        if content.is_empty() {
            return Err(Error::Generation("no new content was generated".to_owned()));
        }

        let stored = self
            .backend
            .insert_generated_content(source_id, &content)
            .await?;
        let count = stored.len();

        info!(%source_id, count, "generated content stored");

        stored.join_onto(&mut self.data.sources);

        Ok(count)
    }

    pub async fn add_audio_summary(&mut self, source_id: Uuid, audio: &NewAudioSummary) -> Result<AudioSummary> {
        if self.data.source(source_id).is_none() {
            return Err(Error::NotFound(format!("source {source_id}")));
        }

        let audio = self.backend.insert_audio_summary(source_id, audio).await?;

        if let Some(source) = self.data.source_mut(source_id) {
            source.audio_summaries.push(audio.clone());
        }

        Ok(audio)
    }

    // Chat

    /// Posts a chat message as the current user. Blank text posts nothing.
    pub async fn post_message(&mut self, text: &str) -> Result<Option<ChatMessage>> {
        let user = self.user()?;
        let text = text.trim();

        if text.is_empty() {
            return Ok(None);
        }

        let message = self
            .backend
            .insert_chat_message(&NewChatMessage {
                author: user.pseudonym,
                text: text.to_owned(),
            })
            .await?;

        self.data.chat_messages.push(message.clone());

        Ok(Some(message))
    }

    // Case studies

    pub async fn add_case_study(&mut self, case_study: &NewCaseStudy) -> Result<CaseStudy> {
        let user = self.user()?;
        let case_study = self.backend.insert_case_study(&user.id, case_study).await?;

        self.data.case_studies.insert(0, case_study.clone());

        Ok(case_study)
    }

    /// Picks an option at the current decision point. Returns the XP earned.
    pub async fn choose_case_study_option(&mut self, case_study_id: Uuid, option_index: usize) -> Result<u32> {
        let mut user = self.user()?;
        let case_study = self
            .data
            .case_studies
            .iter()
            .find(|case_study| case_study.id == case_study_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("case study {case_study_id}")))?;

        let mut progress = self
            .case_study_progress(&user.id, case_study_id)
            .cloned()
            .unwrap_or_else(|| UserCaseStudyInteraction::start(&user.id, case_study_id));

        let xp = case_study::choose(&case_study, &mut progress, option_index)?;

        let snapshot = self.data.clone();
        self.store_case_study_progress(progress.clone());

        user.xp += i64::from(xp);
        let user = check_and_award(user, &self.data);
        self.replace_user(user.clone());

        let result = async {
            let stored = self.backend.upsert_case_study_interaction(&progress).await?;
            self.backend.update_user(&user).await?;

            Ok::<_, Error>(stored)
        }
        .await;

        let stored = self.settle(snapshot, "choose case study option", result)?;
        self.store_case_study_progress(stored);

        Ok(xp)
    }

    pub fn case_study_progress(&self, user_id: &str, case_study_id: Uuid) -> Option<&UserCaseStudyInteraction> {
        self.data
            .user_case_study_interactions
            .iter()
            .find(|progress| progress.user_id == user_id && progress.case_study_id == case_study_id)
    }

    fn store_case_study_progress(&mut self, progress: UserCaseStudyInteraction) {
        let interactions = &mut self.data.user_case_study_interactions;

        match interactions.iter_mut().find(|existing| {
            existing.user_id == progress.user_id && existing.case_study_id == progress.case_study_id
        }) {
            Some(existing) => *existing = progress,
            None => interactions.push(progress),
        }
    }

    /// Drops the user's progress so the case study starts over.
    pub async fn reset_case_study(&mut self, case_study_id: Uuid) -> Result<()> {
        let user = self.user()?;
        let snapshot = self.data.clone();

        self.data
            .user_case_study_interactions
            .retain(|progress| !(progress.user_id == user.id && progress.case_study_id == case_study_id));

        let result = self
            .backend
            .clear_case_study_progress(&user.id, case_study_id)
            .await;

        self.settle(snapshot, "reset case study", result)
    }

    // Schedule

    /// Stores the built-in course schedule, keeping events already present.
    /// Returns the number of events added to the snapshot.
    pub async fn seed_schedule(&mut self) -> Result<usize> {
        self.backend.seed_schedule(COURSE_SCHEDULE.as_slice()).await?;

        let known = self
            .data
            .schedule_events
            .iter()
            .map(|event| event.id.clone())
            .collect::<HashSet<_>>();
        let missing = COURSE_SCHEDULE
            .iter()
            .filter(|event| !known.contains(&event.id))
            .cloned()
            .collect::<Vec<_>>();
        let added = missing.len();

        self.data.schedule_events.extend(missing);
        sort_events(&mut self.data.schedule_events);

        info!(added, "schedule seeded");

        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};

    use super::*;
    use crate::case_study::{DecisionOption, DecisionPoint};
    use crate::generator::{GeneratedFlashcard, GeneratedQuestion};
    use crate::quiz::AnswerPhase;
    use crate::raw_data::{
        OfSource, Owned, RawAudioSummary, RawCaseStudy, RawChatMessage, RawFlashcard, RawMindMap,
        RawQuestion, RawQuestionNotebook, RawSource, RawSummary, RawUser, SourceContent,
    };
    use crate::schedule::ScheduleEvent;

    const SOURCE_ID: &str = "0b5d0c6e-1c1e-4d8a-9a55-51ef5b1d1a01";
    const SUMMARY_ID: &str = "0b5d0c6e-1c1e-4d8a-9a55-51ef5b1d1a02";
    const CASE_STUDY_ID: &str = "0b5d0c6e-1c1e-4d8a-9a55-51ef5b1d1a03";
    const MESSAGE_ID: &str = "0b5d0c6e-1c1e-4d8a-9a55-51ef5b1d1a04";
    const NOTEBOOK_ID: &str = "0b5d0c6e-1c1e-4d8a-9a55-51ef5b1d1a05";

    fn id(value: &str) -> Uuid {
        value.parse().unwrap()
    }

    /// Parses `row` the way rows coming back from the store are parsed,
    /// adding an id when the payload has none.
    fn stored<R, T>(mut row: Value) -> T
    where
        R: DeserializeOwned,
        T: From<R>,
    {
        if row.get("id").is_none() {
            row["id"] = json!(Uuid::new_v4());
        }

        serde_json::from_value::<R>(row).unwrap().into()
    }

    #[derive(Default)]
    struct MemoryBackend {
        data: AppData,
        pseudonyms: Mutex<Vec<String>>,
        calls: Mutex<Vec<String>>,
        fail: AtomicBool,
    }

    impl MemoryBackend {
        fn new(data: AppData) -> Self {
            Self {
                pseudonyms: Mutex::new(data.users.iter().map(|user| user.pseudonym.clone()).collect()),
                data,
                ..Self::default()
            }
        }

        fn record(&self, call: String) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Backend {
                    status: 503,
                    code: None,
                    message: "unavailable".to_owned(),
                });
            }

            self.calls.lock().unwrap().push(call);

            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Backend for MemoryBackend {
        async fn load_app_data(&self) -> Result<AppData> {
            self.record("load_app_data".to_owned())?;

            Ok(self.data.clone())
        }

        async fn insert_source(&self, user_id: &str, fields: &SourceFields) -> Result<Source> {
            self.record(format!("insert_source {}", fields.title))?;

            Ok(stored::<RawSource, _>(
                serde_json::to_value(Owned { user_id, fields }).unwrap(),
            ))
        }

        async fn update_source(&self, source_id: Uuid, _fields: &SourceFields) -> Result<()> {
            self.record(format!("update_source {source_id}"))
        }

        async fn delete_source(&self, source_id: Uuid, storage_paths: &[String]) -> Result<()> {
            self.record(format!("delete_source {source_id} {}", storage_paths.join(",")))
        }

        async fn insert_generated_content(
            &self,
            source_id: Uuid,
            content: &GeneratedContent,
        ) -> Result<SourceContent> {
            self.record(format!("insert_generated_content {source_id}"))?;

            fn rows<R, T, F>(source_id: Uuid, items: &[F]) -> Vec<T>
            where
                R: DeserializeOwned,
                T: From<R>,
                F: serde::Serialize,
            {
                items
                    .iter()
                    .map(|fields| stored::<R, T>(serde_json::to_value(OfSource { source_id, fields }).unwrap()))
                    .collect()
            }

            Ok(SourceContent {
                summaries: rows::<RawSummary, _, _>(source_id, &content.summaries),
                flashcards: rows::<RawFlashcard, _, _>(source_id, &content.flashcards),
                questions: rows::<RawQuestion, _, _>(source_id, &content.questions),
                mind_maps: rows::<RawMindMap, _, _>(source_id, &content.mind_maps),
                audio_summaries: Vec::new(),
            })
        }

        async fn insert_audio_summary(
            &self,
            source_id: Uuid,
            audio: &NewAudioSummary,
        ) -> Result<AudioSummary> {
            self.record(format!("insert_audio_summary {source_id}"))?;

            Ok(stored::<RawAudioSummary, _>(
                serde_json::to_value(OfSource {
                    source_id,
                    fields: audio,
                })
                .unwrap(),
            ))
        }

        async fn create_user(&self, pseudonym: &str) -> Result<User> {
            let mut pseudonyms = self.pseudonyms.lock().unwrap();

            if pseudonyms.iter().any(|taken| taken == pseudonym) {
                return Err(Error::DuplicatePseudonym);
            }

            pseudonyms.push(pseudonym.to_owned());

            Ok(stored::<RawUser, _>(json!({
                "id": format!("user-{}", pseudonyms.len()),
                "pseudonym": pseudonym,
            })))
        }

        async fn update_user(&self, user: &User) -> Result<()> {
            self.record(format!("update_user {} {}", user.id, user.xp))
        }

        async fn insert_chat_message(&self, message: &NewChatMessage) -> Result<ChatMessage> {
            self.record(format!("insert_chat_message {}", message.text))?;

            Ok(stored::<RawChatMessage, _>(serde_json::to_value(message).unwrap()))
        }

        async fn update_comments(&self, target: CommentTarget, id: &str, comments: &[Comment]) -> Result<()> {
            self.record(format!("update_comments {} {id} {}", target.table(), comments.len()))
        }

        async fn upsert_content_interaction(
            &self,
            interaction: &UserContentInteraction,
        ) -> Result<UserContentInteraction> {
            self.record(format!("upsert_content_interaction {}", interaction.content_id))?;

            let mut stored = interaction.clone();
            stored.id.get_or_insert_with(Uuid::new_v4);

            Ok(stored)
        }

        async fn increment_content_vote(
            &self,
            content_type: ContentType,
            content_id: &str,
            kind: VoteKind,
            increment: i32,
        ) -> Result<()> {
            self.record(format!(
                "increment_content_vote {} {content_id} {} {increment}",
                content_type.table(),
                kind.column()
            ))
        }

        async fn upsert_user_vote(&self, table: VoteTable, vote: &UserVote) -> Result<UserVote> {
            self.record(format!("upsert_user_vote {}", table.table()))?;

            let mut stored = vote.clone();
            stored.id.get_or_insert_with(Uuid::new_v4);

            Ok(stored)
        }

        async fn increment_vote_count(
            &self,
            counter: VoteCounter,
            id: Uuid,
            kind: VoteKind,
            increment: i32,
        ) -> Result<()> {
            self.record(format!("{} {id} {} {increment}", counter.function(), kind.column()))
        }

        async fn insert_notebook(&self, user_id: &str, notebook: &NewNotebook) -> Result<QuestionNotebook> {
            self.record(format!("insert_notebook {}", notebook.name))?;

            Ok(stored::<RawQuestionNotebook, _>(
                serde_json::to_value(Owned {
                    user_id,
                    fields: notebook,
                })
                .unwrap(),
            ))
        }

        async fn delete_notebook(&self, notebook_id: Uuid) -> Result<()> {
            self.record(format!("delete_notebook {notebook_id}"))
        }

        async fn upsert_notebook_interaction(
            &self,
            interaction: &UserNotebookInteraction,
        ) -> Result<UserNotebookInteraction> {
            self.record(format!("upsert_notebook_interaction {}", interaction.notebook_id))?;

            let mut stored = interaction.clone();
            stored.id.get_or_insert_with(Uuid::new_v4);

            Ok(stored)
        }

        async fn upsert_question_answer(&self, answer: &UserQuestionAnswer) -> Result<UserQuestionAnswer> {
            self.record(format!("upsert_question_answer {}", answer.question_id))?;

            let mut stored = answer.clone();
            stored.id.get_or_insert_with(Uuid::new_v4);

            Ok(stored)
        }

        async fn clear_notebook_answers(&self, user_id: &str, notebook: &NotebookKey) -> Result<()> {
            self.record(format!("clear_notebook_answers {user_id} {notebook}"))
        }

        async fn insert_case_study(&self, user_id: &str, case_study: &NewCaseStudy) -> Result<CaseStudy> {
            self.record(format!("insert_case_study {}", case_study.title))?;

            Ok(stored::<RawCaseStudy, _>(
                serde_json::to_value(Owned {
                    user_id,
                    fields: case_study,
                })
                .unwrap(),
            ))
        }

        async fn upsert_case_study_interaction(
            &self,
            interaction: &UserCaseStudyInteraction,
        ) -> Result<UserCaseStudyInteraction> {
            self.record(format!("upsert_case_study_interaction {}", interaction.case_study_id))?;

            let mut stored = interaction.clone();
            stored.id.get_or_insert_with(Uuid::new_v4);

            Ok(stored)
        }

        async fn clear_case_study_progress(&self, user_id: &str, case_study_id: Uuid) -> Result<()> {
            self.record(format!("clear_case_study_progress {user_id} {case_study_id}"))
        }

        async fn seed_schedule(&self, events: &[ScheduleEvent]) -> Result<()> {
            self.record(format!("seed_schedule {}", events.len()))
        }
    }

    #[derive(Default)]
    struct CannedGenerator {
        content: GeneratedContent,
        relevant_ids: Option<Vec<String>>,
        name: String,
    }

    #[async_trait]
    impl ContentGenerator for CannedGenerator {
        async fn generate_source_content(&self, _title: &str, _text: &str) -> Result<GeneratedContent> {
            Ok(self.content.clone())
        }

        async fn generate_specific_content(
            &self,
            _kind: GeneratedKind,
            _context: &str,
            _prompt: &str,
        ) -> Result<GeneratedContent> {
            Ok(self.content.clone())
        }

        async fn filter_items_by_prompt(&self, _prompt: &str, _items: &[PromptItem]) -> Result<Vec<String>> {
            self.relevant_ids
                .clone()
                .ok_or_else(|| Error::Generation("filter unavailable".to_owned()))
        }

        async fn generate_notebook_name(&self, _question_texts: &[&str]) -> Result<String> {
            Ok(self.name.clone())
        }
    }

    fn user(id: &str, pseudonym: &str) -> User {
        User {
            id: id.to_owned(),
            pseudonym: pseudonym.to_owned(),
            level: 1,
            xp: 0,
            achievements: Vec::new(),
            stats: Default::default(),
        }
    }

    fn question(index: u128, text: &str) -> Question {
        Question {
            id: Uuid::from_u128(index),
            source_id: id(SOURCE_ID),
            difficulty: "Fácil".to_owned(),
            question_text: text.to_owned(),
            options: vec!["A".to_owned(), "B".to_owned(), "C".to_owned()],
            correct_answer: "A".to_owned(),
            explanation: None,
            hints: vec!["pense no Bacen".to_owned()],
            votes: Votes::default(),
            comments: Vec::new(),
        }
    }

    fn app_data() -> AppData {
        let mut source: Source = stored::<RawSource, _>(json!({
            "id": SOURCE_ID,
            "user_id": "u2",
            "title": "Política monetária",
            "summary": "Copom e Selic",
            "storage_path": ["u2/politica.pdf"],
            "topic": "Juros",
        }));
        source.summaries.push(stored::<RawSummary, _>(json!({
            "id": SUMMARY_ID,
            "source_id": SOURCE_ID,
            "title": "Selic",
        })));
        source.questions = vec![
            question(1, "O que é a Selic?"),
            question(2, "Quem define a meta de inflação?"),
            question(3, "O que faz o Copom?"),
        ];

        let case_study: CaseStudy = stored::<RawCaseStudy, _>(json!({
            "id": CASE_STUDY_ID,
            "user_id": "u2",
            "title": "Banco em crise",
        }));
        let case_study = CaseStudy {
            decision_points: vec![
                DecisionPoint {
                    question: "Intervir?".to_owned(),
                    context: None,
                    options: vec![
                        DecisionOption {
                            text: "Sim".to_owned(),
                            feedback: None,
                            xp: 10,
                        },
                        DecisionOption {
                            text: "Não".to_owned(),
                            feedback: None,
                            xp: 0,
                        },
                    ],
                },
                DecisionPoint {
                    question: "Liquidar?".to_owned(),
                    context: None,
                    options: vec![DecisionOption {
                        text: "Sim".to_owned(),
                        feedback: Some("Correto".to_owned()),
                        xp: 5,
                    }],
                },
            ],
            ..case_study
        };

        AppData {
            users: vec![user("u1", "ana"), user("u2", "bia")],
            sources: vec![source],
            chat_messages: vec![stored::<RawChatMessage, _>(json!({
                "id": MESSAGE_ID,
                "author": "bia",
                "text": "bom dia",
            }))],
            question_notebooks: vec![stored::<RawQuestionNotebook, _>(json!({
                "id": NOTEBOOK_ID,
                "user_id": "u2",
                "name": "Revisão",
                "question_ids": [Uuid::from_u128(1)],
            }))],
            case_studies: vec![case_study],
            ..AppData::default()
        }
    }

    fn platform_with(generator: CannedGenerator) -> Platform<MemoryBackend, CannedGenerator> {
        let data = app_data();
        let mut platform = Platform::with_data(MemoryBackend::new(data.clone()), generator, data);
        platform.sign_in("u1").unwrap();

        platform
    }

    fn platform() -> Platform<MemoryBackend, CannedGenerator> {
        platform_with(CannedGenerator::default())
    }

    fn xp_of(platform: &Platform<MemoryBackend, CannedGenerator>, user_id: &str) -> i64 {
        platform.data().user(user_id).unwrap().xp
    }

    #[tokio::test]
    async fn test_load_replaces_snapshot() {
        let mut platform = Platform::new(MemoryBackend::new(app_data()), CannedGenerator::default());
        assert!(platform.sign_in("u1").is_err());

        platform.load().await.unwrap();

        assert_eq!(platform.sign_in("u1").unwrap().pseudonym, "ana");
        assert_eq!(platform.data().sources.len(), 1);
    }

    #[tokio::test]
    async fn test_reading_grants_xp_once() {
        let mut platform = platform();

        platform
            .update_interaction(ContentType::Summary, SUMMARY_ID, InteractionUpdate::read(true))
            .await
            .unwrap();
        assert_eq!(xp_of(&platform, "u1"), 5);

        platform
            .update_interaction(ContentType::Summary, SUMMARY_ID, InteractionUpdate::read(true))
            .await
            .unwrap();
        platform
            .update_interaction(ContentType::Summary, SUMMARY_ID, InteractionUpdate::favorite(true))
            .await
            .unwrap();
        assert_eq!(xp_of(&platform, "u1"), 5);

        let interaction = platform
            .data()
            .content_interaction("u1", SUMMARY_ID, ContentType::Summary)
            .unwrap();
        assert!(interaction.is_read);
        assert!(interaction.is_favorite);
        assert!(interaction.id.is_some());

        let user_updates = platform
            .backend()
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("update_user"))
            .collect::<Vec<_>>();
        assert_eq!(user_updates, vec!["update_user u1 5"]);
    }

    #[tokio::test]
    async fn test_failed_write_restores_snapshot() {
        let mut platform = platform();
        let before = platform.data().clone();
        platform.backend().fail(true);

        let result = platform
            .update_interaction(ContentType::Summary, SUMMARY_ID, InteractionUpdate::read(true))
            .await;
        assert!(result.is_err());
        assert_eq!(platform.data(), &before);

        let result = platform
            .vote_content(ContentType::Summary, SUMMARY_ID, VoteKind::Hot, VoteStep::Cast)
            .await;
        assert!(result.is_err());
        assert_eq!(platform.data(), &before);

        assert!(platform.delete_source(id(SOURCE_ID)).await.is_err());
        assert_eq!(platform.data(), &before);
    }

    #[tokio::test]
    async fn test_content_votes_move_counter_and_author_xp() {
        let mut platform = platform();

        platform
            .vote_content(ContentType::Summary, SUMMARY_ID, VoteKind::Hot, VoteStep::Cast)
            .await
            .unwrap();

        let summary = &platform.data().sources[0].summaries[0];
        assert_eq!(summary.votes, Votes::new(1, 0));
        assert_eq!(xp_of(&platform, "u2"), 1);
        assert!(platform
            .backend()
            .calls()
            .contains(&format!("increment_content_vote summaries {SUMMARY_ID} hot_votes 1")));

        let calls_before = platform.backend().calls().len();
        platform
            .vote_content(ContentType::Summary, SUMMARY_ID, VoteKind::Cold, VoteStep::Retract)
            .await
            .unwrap();
        assert_eq!(platform.backend().calls().len(), calls_before);

        platform
            .vote_content(ContentType::Summary, SUMMARY_ID, VoteKind::Hot, VoteStep::Retract)
            .await
            .unwrap();
        assert_eq!(platform.data().sources[0].summaries[0].votes, Votes::new(0, 0));
        assert_eq!(xp_of(&platform, "u2"), 0);
    }

    #[tokio::test]
    async fn test_self_votes_earn_no_xp() {
        let mut platform = platform();
        platform.sign_in("u2").unwrap();

        platform
            .vote_content(ContentType::Summary, SUMMARY_ID, VoteKind::Hot, VoteStep::Cast)
            .await
            .unwrap();

        assert_eq!(xp_of(&platform, "u2"), 0);
        assert_eq!(platform.data().sources[0].summaries[0].votes, Votes::new(1, 0));
    }

    #[tokio::test]
    async fn test_case_study_votes_use_their_counter() {
        let mut platform = platform();

        platform
            .vote_content(ContentType::CaseStudy, CASE_STUDY_ID, VoteKind::Cold, VoteStep::Cast)
            .await
            .unwrap();

        assert_eq!(platform.data().case_studies[0].votes, Votes::new(0, 1));
        assert!(platform
            .backend()
            .calls()
            .contains(&format!("increment_case_study_vote {CASE_STUDY_ID} cold_votes 1")));
    }

    #[tokio::test]
    async fn test_source_and_message_votes() {
        let mut platform = platform();

        platform
            .vote_source(id(SOURCE_ID), VoteKind::Hot, VoteStep::Cast)
            .await
            .unwrap();

        assert_eq!(platform.data().sources[0].votes, Votes::new(1, 0));
        assert_eq!(platform.data().user_source_votes[0].votes, Votes::new(1, 0));
        assert!(platform.data().user_source_votes[0].id.is_some());
        assert_eq!(xp_of(&platform, "u2"), 1);

        platform
            .vote_message(id(MESSAGE_ID), VoteKind::Cold, VoteStep::Cast)
            .await
            .unwrap();
        platform
            .vote_message(id(MESSAGE_ID), VoteKind::Cold, VoteStep::Retract)
            .await
            .unwrap();
        platform
            .vote_message(id(MESSAGE_ID), VoteKind::Cold, VoteStep::Retract)
            .await
            .unwrap();

        assert_eq!(platform.data().chat_messages[0].votes, Votes::new(0, 0));
        assert_eq!(platform.data().user_message_votes.len(), 1);

        let counter_calls = platform
            .backend()
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("increment_message_vote"))
            .count();
        assert_eq!(counter_calls, 2);
    }

    #[tokio::test]
    async fn test_notebook_votes_and_flags() {
        let mut platform = platform();

        platform
            .vote_notebook(id(NOTEBOOK_ID), VoteKind::Hot, VoteStep::Cast)
            .await
            .unwrap();
        platform
            .update_notebook_interaction(id(NOTEBOOK_ID), InteractionUpdate::favorite(true))
            .await
            .unwrap();

        assert_eq!(platform.data().question_notebooks[0].votes, Votes::new(1, 0));
        assert_eq!(platform.data().user_notebook_interactions.len(), 1);

        let interaction = &platform.data().user_notebook_interactions[0];
        assert!(interaction.is_favorite);
        assert_eq!(interaction.votes, Votes::new(1, 0));
        assert_eq!(xp_of(&platform, "u2"), 1);
    }

    #[tokio::test]
    async fn test_answering_saves_first_completion_only() {
        let mut platform = platform();
        let notebook = NotebookKey::AllQuestions;
        let question_id = Uuid::from_u128(1);
        let mut state = platform.answer_state(&notebook, question_id);

        let outcome = platform
            .select_option(&notebook, question_id, &mut state, "B")
            .await
            .unwrap();
        assert_eq!(outcome, SelectOutcome::Wrong { remaining: 2 });
        assert!(platform.data().user_question_answers.is_empty());

        let outcome = platform
            .select_option(&notebook, question_id, &mut state, "A")
            .await
            .unwrap();
        assert!(matches!(outcome, SelectOutcome::Completed(ref answer) if answer.xp == 5));

        let user = platform.data().user("u1").unwrap();
        assert_eq!(user.xp, 5);
        assert_eq!(user.stats.questions_answered, 1);
        assert_eq!(user.stats.correct_answers, 0);
        assert_eq!(user.stats.topic_performance["Juros"].total, 1);

        let saved = &platform.data().user_question_answers[0];
        assert_eq!(saved.attempts, vec!["B", "A"]);
        assert!(saved.id.is_some());

        let resumed = platform.answer_state(&notebook, question_id);
        let question = platform.data().question(question_id).unwrap().1;
        assert_eq!(resumed.phase(question), AnswerPhase::Correct);

        let mut fresh = AnswerState::new();
        platform
            .select_option(&notebook, question_id, &mut fresh, "A")
            .await
            .unwrap();
        assert_eq!(platform.data().user_question_answers.len(), 1);
        assert_eq!(xp_of(&platform, "u1"), 5);

        assert_eq!(
            platform.answered_question_ids(&notebook),
            HashSet::from([question_id])
        );

        platform.clear_notebook_answers(&notebook).await.unwrap();
        assert!(platform.data().user_question_answers.is_empty());
    }

    #[tokio::test]
    async fn test_create_notebook_with_prompt_and_generated_name() {
        let relevant = Uuid::from_u128(2);
        let mut platform = platform_with(CannedGenerator {
            relevant_ids: Some(vec![relevant.to_string()]),
            name: "Metas de inflação".to_owned(),
            ..CannedGenerator::default()
        });

        let notebook = platform
            .create_notebook(&NotebookDraft {
                prompt: Some("inflação".to_owned()),
                ..NotebookDraft::default()
            })
            .await
            .unwrap();

        assert_eq!(notebook.name, "Metas de inflação");
        assert_eq!(notebook.question_ids, vec![relevant]);
        assert_eq!(notebook.user_id, "u1");
        assert_eq!(platform.data().question_notebooks[0].id, notebook.id);
    }

    #[tokio::test]
    async fn test_create_notebook_falls_back_to_whole_pool() {
        let mut platform = platform();

        let notebook = platform
            .create_notebook(&NotebookDraft {
                name: Some("  Tudo  ".to_owned()),
                prompt: Some("câmbio".to_owned()),
                question_count: 2,
                ..NotebookDraft::default()
            })
            .await
            .unwrap();

        assert_eq!(notebook.name, "Tudo");
        assert_eq!(notebook.question_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_create_notebook_from_empty_pool() {
        let mut platform = platform();

        let result = platform
            .create_notebook(&NotebookDraft {
                source_ids: HashSet::from([Uuid::from_u128(99)]),
                ..NotebookDraft::default()
            })
            .await;

        assert!(matches!(result, Err(Error::EmptyQuestionPool)));
    }

    #[tokio::test]
    async fn test_delete_notebook_drops_answers() {
        let mut platform = platform();
        let notebook = NotebookKey::Saved(id(NOTEBOOK_ID));
        let mut state = AnswerState::new();

        platform
            .select_option(&notebook, Uuid::from_u128(1), &mut state, "A")
            .await
            .unwrap();
        platform.delete_notebook(id(NOTEBOOK_ID)).await.unwrap();

        assert!(platform.data().question_notebooks.is_empty());
        assert!(platform.data().user_question_answers.is_empty());
    }

    #[tokio::test]
    async fn test_comments() {
        let mut platform = platform();

        platform
            .add_comment(CommentTarget::Source, SOURCE_ID, "   ")
            .await
            .unwrap();
        assert!(platform.data().sources[0].comments.is_empty());

        platform
            .add_comment(CommentTarget::Source, SOURCE_ID, " ótimo material ")
            .await
            .unwrap();

        let comment = platform.data().sources[0].comments[0].clone();
        assert_eq!(comment.text, "ótimo material");
        assert_eq!(comment.author_pseudonym, "ana");

        platform
            .vote_comment(CommentTarget::Source, SOURCE_ID, &comment.id, VoteKind::Hot)
            .await
            .unwrap();
        assert_eq!(platform.data().sources[0].comments[0].votes, Votes::new(1, 0));

        let missing = platform
            .vote_comment(CommentTarget::Source, SOURCE_ID, "c_0", VoteKind::Hot)
            .await;
        assert!(matches!(missing, Err(Error::NotFound(_))));

        platform
            .add_comment(CommentTarget::Content(ContentType::Summary), SUMMARY_ID, "resumo claro")
            .await
            .unwrap();
        assert_eq!(platform.data().sources[0].summaries[0].comments.len(), 1);
        assert!(platform
            .backend()
            .calls()
            .contains(&format!("update_comments summaries {SUMMARY_ID} 1")));
    }

    #[tokio::test]
    async fn test_register() {
        let mut platform = platform();

        assert!(matches!(
            platform.register("ana").await,
            Err(Error::DuplicatePseudonym)
        ));

        let user = platform.register(" caio ").await.unwrap();

        assert_eq!(user.pseudonym, "caio");
        assert_eq!(user.level, 1);
        assert_eq!(platform.current_user().unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_generate_more_content_keeps_only_new_questions() {
        let existing = question(1, "O que é a Selic?");
        let mut platform = platform_with(CannedGenerator {
            content: GeneratedContent {
                questions: vec![
                    GeneratedQuestion {
                        difficulty: "Média".to_owned(),
                        question_text: "O que é o IPCA?".to_owned(),
                        options: vec!["Índice".to_owned(), "Taxa".to_owned()],
                        correct_answer: "Índice".to_owned(),
                        explanation: None,
                        hints: Vec::new(),
                    },
                    GeneratedQuestion {
                        difficulty: "Fácil".to_owned(),
                        question_text: existing.question_text.clone(),
                        options: existing.options.clone(),
                        correct_answer: existing.correct_answer.clone(),
                        explanation: None,
                        hints: Vec::new(),
                    },
                    GeneratedQuestion {
                        difficulty: "Fácil".to_owned(),
                        question_text: "Sem resposta".to_owned(),
                        options: vec!["X".to_owned(), "Y".to_owned()],
                        correct_answer: "Z".to_owned(),
                        explanation: None,
                        hints: Vec::new(),
                    },
                ],
                ..GeneratedContent::default()
            },
            ..CannedGenerator::default()
        });

        let added = platform
            .generate_more_content(
                GeneratedKind::Questions,
                &HashSet::from([id(SOURCE_ID)]),
                "inflação",
            )
            .await
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(platform.data().sources[0].questions.len(), 4);
        assert_eq!(platform.data().sources[0].questions[3].question_text, "O que é o IPCA?");
    }

    #[tokio::test]
    async fn test_generation_with_only_invalid_questions_fails() {
        let mut platform = platform_with(CannedGenerator {
            content: GeneratedContent {
                questions: vec![GeneratedQuestion {
                    difficulty: "Fácil".to_owned(),
                    question_text: "Sem resposta".to_owned(),
                    options: vec!["X".to_owned(), "Y".to_owned()],
                    correct_answer: "Z".to_owned(),
                    explanation: None,
                    hints: Vec::new(),
                }],
                ..GeneratedContent::default()
            },
            ..CannedGenerator::default()
        });
        let calls_before = platform.backend().calls().len();

        let result = platform
            .generate_source_content(id(SOURCE_ID), "texto extraído")
            .await;

        assert!(matches!(result, Err(Error::InvalidContent(_))));
        assert_eq!(platform.backend().calls().len(), calls_before);
        assert_eq!(platform.data().sources[0].questions.len(), 3);
    }

    #[tokio::test]
    async fn test_generation_without_new_content_fails() {
        let mut platform = platform();

        let result = platform
            .generate_source_content(id(SOURCE_ID), "texto extraído")
            .await;
        assert!(matches!(result, Err(Error::Generation(_))));

        let result = platform
            .generate_more_content(
                GeneratedKind::Flashcards,
                &HashSet::from([Uuid::from_u128(99)]),
                "",
            )
            .await;
        assert!(matches!(result, Err(Error::NoSources)));
    }

    #[tokio::test]
    async fn test_generate_source_content() {
        let mut platform = platform_with(CannedGenerator {
            content: GeneratedContent {
                flashcards: vec![
                    GeneratedFlashcard {
                        front: "Copom".to_owned(),
                        back: "Comitê de Política Monetária".to_owned(),
                    },
                    GeneratedFlashcard {
                        front: " ".to_owned(),
                        back: "vazio".to_owned(),
                    },
                ],
                ..GeneratedContent::default()
            },
            ..CannedGenerator::default()
        });

        let added = platform
            .generate_source_content(id(SOURCE_ID), "texto extraído")
            .await
            .unwrap();

        assert_eq!(added, 1);
        assert_eq!(platform.data().sources[0].flashcards[0].front, "Copom");
    }

    #[tokio::test]
    async fn test_source_lifecycle() {
        let mut platform = platform();

        let source = platform
            .add_source(&SourceFields {
                title: "Pix".to_owned(),
                ..SourceFields::default()
            })
            .await
            .unwrap();
        assert_eq!(platform.data().sources[0].id, source.id);
        assert_eq!(source.user_id, "u1");

        platform
            .update_source(
                source.id,
                &SourceFields {
                    title: "Pix e open finance".to_owned(),
                    topic: "Pagamentos".to_owned(),
                    ..SourceFields::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(platform.data().sources[0].title, "Pix e open finance");

        platform
            .add_audio_summary(
                source.id,
                &NewAudioSummary {
                    title: "Podcast".to_owned(),
                    audio_url: "https://cdn.example.com/pix.mp3".to_owned(),
                },
            )
            .await
            .unwrap();
        assert_eq!(platform.data().sources[0].audio_summaries.len(), 1);

        platform.delete_source(id(SOURCE_ID)).await.unwrap();
        assert_eq!(platform.data().sources.len(), 1);
        assert!(platform
            .backend()
            .calls()
            .contains(&format!("delete_source {SOURCE_ID} u2/politica.pdf")));
    }

    #[tokio::test]
    async fn test_chat() {
        let mut platform = platform();

        assert!(platform.post_message("  ").await.unwrap().is_none());

        let message = platform.post_message("alguém tem o resumo?").await.unwrap().unwrap();

        assert_eq!(message.author, "ana");
        assert_eq!(platform.data().chat_messages.len(), 2);
    }

    #[tokio::test]
    async fn test_case_study_progress() {
        let mut platform = platform();
        let case_study_id = id(CASE_STUDY_ID);

        assert_eq!(platform.choose_case_study_option(case_study_id, 0).await.unwrap(), 10);
        assert_eq!(platform.choose_case_study_option(case_study_id, 0).await.unwrap(), 5);
        assert_eq!(xp_of(&platform, "u1"), 15);

        let progress = platform.case_study_progress("u1", case_study_id).unwrap();
        assert!(progress.is_completed());
        assert_eq!(progress.xp_earned, 15);

        assert!(matches!(
            platform.choose_case_study_option(case_study_id, 0).await,
            Err(Error::InvalidChoice(_))
        ));

        platform.reset_case_study(case_study_id).await.unwrap();
        assert!(platform.case_study_progress("u1", case_study_id).is_none());
    }

    #[tokio::test]
    async fn test_add_case_study() {
        let mut platform = platform();

        let case_study = platform
            .add_case_study(&NewCaseStudy {
                title: "Fraude no Pix".to_owned(),
                ..NewCaseStudy::default()
            })
            .await
            .unwrap();

        assert_eq!(case_study.user_id, "u1");
        assert_eq!(platform.data().case_studies.len(), 2);
    }

    #[tokio::test]
    async fn test_seed_schedule_is_idempotent() {
        let mut platform = platform();

        let added = platform.seed_schedule().await.unwrap();
        assert_eq!(added, COURSE_SCHEDULE.len());

        assert_eq!(platform.seed_schedule().await.unwrap(), 0);
        assert_eq!(platform.data().schedule_events.len(), COURSE_SCHEDULE.len());
    }
}
