//! [`Backend`] over the hosted PostgREST store.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::backend::{Backend, VoteCounter, VoteTable, SOURCES_BUCKET};
use crate::config::BackendConfig;
use crate::data::{
    AppData, AudioSummary, CaseStudy, ChatMessage, Comment, CommentTarget, ContentType, Flashcard,
    MindMap, Question, QuestionNotebook, Source, Summary, User, UserCaseStudyInteraction,
    UserContentInteraction, UserNotebookInteraction, UserQuestionAnswer, UserStats, UserVote,
};
use crate::generator::GeneratedContent;
use crate::notebooks::NotebookKey;
use crate::raw_data::{
    user_vote_row, NewAudioSummary, NewCaseStudy, NewChatMessage, NewNotebook, OfSource, Owned,
    RawAudioSummary, RawCaseStudy, RawCaseStudyInteraction, RawChatMessage, RawContentInteraction,
    RawFlashcard, RawMindMap, RawNotebookInteraction, RawQuestion, RawQuestionAnswer,
    RawQuestionNotebook, RawScheduleEvent, RawSource, RawSummary, RawUser, RawUserVote,
    SourceContent, SourceFields,
};
use crate::rest::{eq, Order, RestClient};
use crate::schedule::{sort_events, ScheduleEvent};
use crate::votes::VoteKind;
use crate::{Error, Result};

#[derive(Clone, Debug)]
pub struct RemoteBackend {
    rest: RestClient,
}

impl RemoteBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(config)?,
        })
    }

    /// Loads one table.
    ///
    /// A PostgREST error for the table itself reads as an empty table. Rows
    /// that do not decode are skipped. Transport failures and server errors
    /// are returned.
    async fn fetch<R, T>(&self, table: &str, order: Option<(&str, Order)>) -> Result<Vec<T>>
    where
        R: DeserializeOwned,
        T: From<R>,
    {
        match self.rest.select::<Value>(table, order).await {
            Ok(rows) => {
                let rows = decode_rows::<R, T>(table, rows);
                debug!(table, rows = rows.len(), "loaded table");

                Ok(rows)
            }
            Err(err @ Error::Backend { status, .. }) if status < 500 => {
                warn!(table, "failed to load table: {err}");

                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Inserts a batch into `table`, skipping the request when it is empty.
    async fn insert_batch<B, R, T>(&self, table: &str, rows: &[B]) -> Result<Vec<T>>
    where
        B: Serialize,
        R: DeserializeOwned,
        T: From<R>,
    {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let inserted: Vec<R> = self.rest.insert(table, rows).await?;

        Ok(inserted.into_iter().map(Into::into).collect())
    }
}

/// Converts raw rows one by one, skipping the ones that do not decode.
fn decode_rows<R, T>(table: &str, rows: Vec<Value>) -> Vec<T>
where
    R: DeserializeOwned,
    T: From<R>,
{
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<R>(row) {
            Ok(raw) => Some(raw.into()),
            Err(err) => {
                warn!(table, index, "skipping row that does not decode: {err}");
                None
            }
        })
        .collect()
}

fn single<T>(rows: Vec<T>, what: &str) -> Result<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(what.to_owned()))
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn load_app_data(&self) -> Result<AppData> {
        let (
            users,
            sources,
            summaries,
            flashcards,
            questions,
            mind_maps,
            audio_summaries,
            chat_messages,
            question_notebooks,
            case_studies,
            schedule_events,
            user_message_votes,
            user_source_votes,
            user_content_interactions,
            user_notebook_interactions,
            raw_answers,
            user_case_study_interactions,
        ) = tokio::try_join!(
            self.fetch::<RawUser, User>("users", None),
            self.fetch::<RawSource, Source>("sources", Some(("created_at", Order::Descending))),
            self.fetch::<RawSummary, Summary>("summaries", None),
            self.fetch::<RawFlashcard, Flashcard>("flashcards", None),
            self.fetch::<RawQuestion, Question>("questions", None),
            self.fetch::<RawMindMap, MindMap>("mind_maps", None),
            self.fetch::<RawAudioSummary, AudioSummary>("audio_summaries", None),
            self.fetch::<RawChatMessage, ChatMessage>(
                "chat_messages",
                Some(("timestamp", Order::Ascending))
            ),
            self.fetch::<RawQuestionNotebook, QuestionNotebook>(
                "question_notebooks",
                Some(("created_at", Order::Descending))
            ),
            self.fetch::<RawCaseStudy, CaseStudy>(
                "case_studies",
                Some(("created_at", Order::Descending))
            ),
            self.fetch::<RawScheduleEvent, ScheduleEvent>(
                "schedule_events",
                Some(("date", Order::Ascending))
            ),
            self.fetch::<RawUserVote, UserVote>("user_message_votes", None),
            self.fetch::<RawUserVote, UserVote>("user_source_votes", None),
            self.fetch::<RawContentInteraction, UserContentInteraction>(
                "user_content_interactions",
                None
            ),
            self.fetch::<RawNotebookInteraction, UserNotebookInteraction>(
                "user_notebook_interactions",
                None
            ),
            self.fetch::<RawQuestionAnswer, RawQuestionAnswer>("user_question_answers", None),
            self.fetch::<RawCaseStudyInteraction, UserCaseStudyInteraction>(
                "user_case_study_interactions",
                None
            ),
        )?;

        let mut sources = sources;
        SourceContent {
            summaries,
            flashcards,
            questions,
            mind_maps,
            audio_summaries,
        }
        .join_onto(&mut sources);

        let user_question_answers = raw_answers
            .into_iter()
            .filter_map(|raw| {
                let question_id = raw.question_id;

                UserQuestionAnswer::try_from(raw)
                    .map_err(|err| warn!(%question_id, "skipping answer with bad notebook key: {err}"))
                    .ok()
            })
            .collect();

        let mut schedule_events = schedule_events;
        sort_events(&mut schedule_events);

        Ok(AppData {
            users,
            sources,
            chat_messages,
            question_notebooks,
            case_studies,
            schedule_events,
            user_message_votes,
            user_source_votes,
            user_content_interactions,
            user_notebook_interactions,
            user_question_answers,
            user_case_study_interactions,
        })
    }

    async fn insert_source(&self, user_id: &str, fields: &SourceFields) -> Result<Source> {
        let rows: Vec<RawSource> = self
            .rest
            .insert("sources", &Owned { user_id, fields })
            .await?;

        Ok(single(rows, "inserted source")?.into())
    }

    async fn update_source(&self, source_id: Uuid, fields: &SourceFields) -> Result<()> {
        self.rest
            .update("sources", &[eq("id", source_id)], fields)
            .await
    }

    async fn delete_source(&self, source_id: Uuid, storage_paths: &[String]) -> Result<()> {
        if !storage_paths.is_empty() {
            if let Err(err) = self.rest.remove_objects(SOURCES_BUCKET, storage_paths).await {
                error!(%source_id, "failed to delete source files from storage: {err}");
            }
        }

        self.rest.delete("sources", &[eq("id", source_id)]).await
    }

    async fn insert_generated_content(
        &self,
        source_id: Uuid,
        content: &GeneratedContent,
    ) -> Result<SourceContent> {
        fn tagged<T>(source_id: Uuid, items: &[T]) -> Vec<OfSource<'_, T>> {
            items
                .iter()
                .map(|fields| OfSource { source_id, fields })
                .collect()
        }

        let summaries = tagged(source_id, &content.summaries);
        let flashcards = tagged(source_id, &content.flashcards);
        let questions = tagged(source_id, &content.questions);
        let mind_maps = tagged(source_id, &content.mind_maps);

        let (summaries, flashcards, questions, mind_maps) = tokio::try_join!(
            self.insert_batch::<_, RawSummary, Summary>("summaries", &summaries),
            self.insert_batch::<_, RawFlashcard, Flashcard>("flashcards", &flashcards),
            self.insert_batch::<_, RawQuestion, Question>("questions", &questions),
            self.insert_batch::<_, RawMindMap, MindMap>("mind_maps", &mind_maps),
        )?;

        Ok(SourceContent {
            summaries,
            flashcards,
            questions,
            mind_maps,
            audio_summaries: Vec::new(),
        })
    }

    async fn insert_audio_summary(
        &self,
        source_id: Uuid,
        audio: &NewAudioSummary,
    ) -> Result<AudioSummary> {
        let rows: Vec<RawAudioSummary> = self
            .rest
            .insert(
                "audio_summaries",
                &OfSource {
                    source_id,
                    fields: audio,
                },
            )
            .await?;

        Ok(single(rows, "inserted audio summary")?.into())
    }

    async fn create_user(&self, pseudonym: &str) -> Result<User> {
        let payload = json!({
            "pseudonym": pseudonym,
            "level": 1,
            "xp": 0,
            "achievements": [],
            "stats": UserStats::default(),
        });

        match self.rest.insert::<_, RawUser>("users", &payload).await {
            Ok(rows) => Ok(single(rows, "inserted user")?.into()),
            Err(err) if err.is_unique_violation() => {
                warn!(pseudonym, "pseudonym already taken");
                Err(Error::DuplicatePseudonym)
            }
            Err(err) => Err(err),
        }
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.rest
            .update(
                "users",
                &[eq("id", &user.id)],
                &json!({
                    "pseudonym": user.pseudonym,
                    "level": user.level,
                    "xp": user.xp,
                    "achievements": user.achievements,
                    "stats": user.stats,
                }),
            )
            .await
    }

    async fn insert_chat_message(&self, message: &NewChatMessage) -> Result<ChatMessage> {
        let mut row = serde_json::to_value(message)?;
        row["hot_votes"] = json!(0);
        row["cold_votes"] = json!(0);

        let rows: Vec<RawChatMessage> = self.rest.insert("chat_messages", &row).await?;

        Ok(single(rows, "inserted chat message")?.into())
    }

    async fn update_comments(&self, target: CommentTarget, id: &str, comments: &[Comment]) -> Result<()> {
        self.rest
            .update(target.table(), &[eq("id", id)], &json!({ "comments": comments }))
            .await
    }

    async fn upsert_content_interaction(
        &self,
        interaction: &UserContentInteraction,
    ) -> Result<UserContentInteraction> {
        let mut row = serde_json::to_value(interaction)?;
        row["updated_at"] = json!(Utc::now());

        let rows: Vec<RawContentInteraction> = self
            .rest
            .upsert(
                "user_content_interactions",
                "user_id,content_id,content_type",
                &row,
            )
            .await?;

        Ok(single(rows, "upserted content interaction")?.into())
    }

    async fn increment_content_vote(
        &self,
        content_type: ContentType,
        content_id: &str,
        kind: VoteKind,
        increment: i32,
    ) -> Result<()> {
        if content_type == ContentType::Schedule {
            return self
                .rest
                .rpc(
                    "increment_schedule_event_vote",
                    &json!({
                        "event_id_param": content_id,
                        "vote_type": kind.column(),
                        "increment_value": increment,
                    }),
                )
                .await;
        }

        self.rest
            .rpc(
                "increment_content_vote",
                &json!({
                    "table_name": content_type.table(),
                    "content_id_param": content_id,
                    "vote_type": kind.column(),
                    "increment_value": increment,
                }),
            )
            .await
    }

    async fn upsert_user_vote(&self, table: VoteTable, vote: &UserVote) -> Result<UserVote> {
        let rows: Vec<RawUserVote> = self
            .rest
            .upsert(
                table.table(),
                &format!("user_id,{}", table.target_column()),
                &user_vote_row(vote, table.target_column()),
            )
            .await?;

        Ok(single(rows, "upserted vote")?.into())
    }

    async fn increment_vote_count(
        &self,
        counter: VoteCounter,
        id: Uuid,
        kind: VoteKind,
        increment: i32,
    ) -> Result<()> {
        let mut args = json!({
            "vote_type": kind.column(),
            "increment_value": increment,
        });
        args[counter.id_param()] = json!(id);

        self.rest.rpc(counter.function(), &args).await
    }

    async fn insert_notebook(&self, user_id: &str, notebook: &NewNotebook) -> Result<QuestionNotebook> {
        let rows: Vec<RawQuestionNotebook> = self
            .rest
            .insert(
                "question_notebooks",
                &Owned {
                    user_id,
                    fields: notebook,
                },
            )
            .await?;

        Ok(single(rows, "inserted notebook")?.into())
    }

    async fn delete_notebook(&self, notebook_id: Uuid) -> Result<()> {
        self.rest
            .delete("question_notebooks", &[eq("id", notebook_id)])
            .await
    }

    async fn upsert_notebook_interaction(
        &self,
        interaction: &UserNotebookInteraction,
    ) -> Result<UserNotebookInteraction> {
        let rows: Vec<RawNotebookInteraction> = self
            .rest
            .upsert("user_notebook_interactions", "user_id,notebook_id", interaction)
            .await?;

        Ok(single(rows, "upserted notebook interaction")?.into())
    }

    async fn upsert_question_answer(&self, answer: &UserQuestionAnswer) -> Result<UserQuestionAnswer> {
        let mut row = serde_json::to_value(answer)?;
        row["timestamp"] = json!(Utc::now());

        let rows: Vec<RawQuestionAnswer> = self
            .rest
            .upsert("user_question_answers", "user_id,notebook_id,question_id", &row)
            .await?;

        Ok(single(rows, "upserted answer")?.try_into()?)
    }

    async fn clear_notebook_answers(&self, user_id: &str, notebook: &NotebookKey) -> Result<()> {
        self.rest
            .delete(
                "user_question_answers",
                &[eq("user_id", user_id), eq("notebook_id", notebook)],
            )
            .await
    }

    async fn insert_case_study(&self, user_id: &str, case_study: &NewCaseStudy) -> Result<CaseStudy> {
        let rows: Vec<RawCaseStudy> = self
            .rest
            .insert(
                "case_studies",
                &Owned {
                    user_id,
                    fields: case_study,
                },
            )
            .await?;

        Ok(single(rows, "inserted case study")?.into())
    }

    async fn upsert_case_study_interaction(
        &self,
        interaction: &UserCaseStudyInteraction,
    ) -> Result<UserCaseStudyInteraction> {
        let rows: Vec<RawCaseStudyInteraction> = self
            .rest
            .upsert("user_case_study_interactions", "user_id,case_study_id", interaction)
            .await?;

        Ok(single(rows, "upserted case study interaction")?.into())
    }

    async fn clear_case_study_progress(&self, user_id: &str, case_study_id: Uuid) -> Result<()> {
        self.rest
            .delete(
                "user_case_study_interactions",
                &[eq("user_id", user_id), eq("case_study_id", case_study_id)],
            )
            .await
    }

    async fn seed_schedule(&self, events: &[ScheduleEvent]) -> Result<()> {
        self.rest
            .insert_missing("schedule_events", "id", events)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use secrecy::SecretString;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use url::Url;

    const SOURCE_ID: &str = "6f1c3a4e-5b55-4a53-9f39-1f9b1e0f9a10";
    const QUESTION_ID: &str = "6f1c3a4e-5b55-4a53-9f39-1f9b1e0f9a11";

    #[derive(Clone, Debug)]
    struct Request {
        method: String,
        path: String,
        query: Vec<(String, String)>,
        body: Value,
    }

    impl Request {
        fn param(&self, name: &str) -> Option<&str> {
            self.query
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        }
    }

    type Requests = Arc<Mutex<Vec<Request>>>;

    /// Serves one canned response per request on a local port and records
    /// what was asked.
    async fn serve<F>(respond: F) -> (RemoteBackend, Requests)
    where
        F: Fn(&Request) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let requests = Requests::default();
        let respond = Arc::new(respond);

        let log = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let respond = respond.clone();
                let log = log.clone();

                tokio::spawn(async move { answer(stream, &*respond, &log).await });
            }
        });

        let backend =
            RemoteBackend::new(BackendConfig::new(url, SecretString::new("anon".to_owned()))).unwrap();

        (backend, requests)
    }

    async fn answer<F>(mut stream: TcpStream, respond: &F, log: &Mutex<Vec<Request>>)
    where
        F: Fn(&Request) -> (u16, String),
    {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            if let Some(end) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
                break end + 4;
            }

            let read = stream.read(&mut chunk).await.unwrap();
            if read == 0 {
                return;
            }
            buffer.extend_from_slice(&chunk[..read]);
        };

        let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
        let mut lines = head.lines();
        let mut request_line = lines.next().unwrap().split_whitespace();
        let method = request_line.next().unwrap().to_owned();
        let target = request_line.next().unwrap().to_owned();
        let length = lines
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .map(|(_, value)| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);

        while buffer.len() < header_end + length {
            let read = stream.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
        }

        let url = Url::parse(&format!("http://stub{target}")).unwrap();
        let request = Request {
            method,
            path: url.path().to_owned(),
            query: url.query_pairs().into_owned().collect(),
            body: serde_json::from_slice(&buffer[header_end..header_end + length])
                .unwrap_or(Value::Null),
        };

        let (status, body) = respond(&request);
        log.lock().unwrap().push(request);

        let response = format!(
            "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
    }

    fn recorded(requests: &Requests) -> Vec<Request> {
        requests.lock().unwrap().clone()
    }

    fn load_response(request: &Request) -> (u16, String) {
        let body = match request.path.as_str() {
            "/rest/v1/users" => json!([{ "id": "u1", "pseudonym": "ana", "xp": 230 }]),
            "/rest/v1/sources" => json!([{ "id": SOURCE_ID, "title": "Pix" }]),
            "/rest/v1/questions" => json!([
                {
                    "id": QUESTION_ID,
                    "source_id": SOURCE_ID,
                    "question_text": "O que é Pix?",
                    "options": ["Pagamento", "Crédito"],
                    "correct_answer": "Pagamento",
                    "comments": [{ "id": "c1", "text": "x" }]
                },
                { "id": "not-a-uuid", "source_id": SOURCE_ID }
            ]),
            "/rest/v1/mind_maps" => {
                return (
                    404,
                    json!({ "code": "42P01", "message": "relation \"mind_maps\" does not exist" })
                        .to_string(),
                )
            }
            _ => json!([]),
        };

        (200, body.to_string())
    }

    #[tokio::test]
    async fn test_load_joins_content_and_skips_bad_rows() {
        let (backend, requests) = serve(load_response).await;

        let data = backend.load_app_data().await.unwrap();

        assert_eq!(data.users.len(), 1);
        assert_eq!(data.users[0].level, 3);
        assert_eq!(data.sources.len(), 1);

        let questions = &data.sources[0].questions;
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id.to_string(), QUESTION_ID);
        assert!(questions[0].comments.is_empty());
        assert!(data.sources[0].mind_maps.is_empty());

        let requests = recorded(&requests);
        assert_eq!(requests.len(), 17);
        assert!(requests.iter().all(|request| request.method == "GET"));

        let sources = requests
            .iter()
            .find(|request| request.path == "/rest/v1/sources")
            .unwrap();
        assert_eq!(sources.param("select"), Some("*"));
        assert_eq!(sources.param("order"), Some("created_at.desc"));

        let messages = requests
            .iter()
            .find(|request| request.path == "/rest/v1/chat_messages")
            .unwrap();
        assert_eq!(messages.param("order"), Some("timestamp.asc"));
    }

    #[tokio::test]
    async fn test_load_fails_on_server_error() {
        let (backend, _) = serve(|_| (503, "Service Unavailable".to_owned())).await;

        match backend.load_app_data().await {
            Err(Error::Backend { status, .. }) => assert_eq!(status, 503),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_fails_when_unreachable() {
        let config = BackendConfig::new(
            Url::parse("http://127.0.0.1:1/").unwrap(),
            SecretString::new("anon".to_owned()),
        );
        let backend = RemoteBackend::new(config).unwrap();

        assert!(matches!(backend.load_app_data().await, Err(Error::Http(_))));
    }

    #[test]
    fn test_decode_rows_skips_bad_rows() {
        let rows = vec![
            json!({ "id": "u1", "pseudonym": "ana" }),
            json!({ "id": "u2" }),
            json!({ "id": "u3", "pseudonym": "bia", "xp": "muito" }),
            json!({ "id": "u4", "pseudonym": "caio", "xp": 90 }),
        ];

        let users = decode_rows::<RawUser, User>("users", rows);

        let ids = users.iter().map(|user| user.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["u1", "u4"]);
    }

    #[tokio::test]
    async fn test_upsert_content_interaction_conflict_columns() {
        let (backend, requests) = serve(|request| (201, format!("[{}]", request.body))).await;
        let mut interaction = UserContentInteraction::new("u1", QUESTION_ID, ContentType::Question);
        interaction.is_read = true;

        let stored = backend.upsert_content_interaction(&interaction).await.unwrap();

        assert!(stored.is_read);
        assert_eq!(stored.content_id, QUESTION_ID);

        let requests = recorded(&requests);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/rest/v1/user_content_interactions");
        assert_eq!(
            requests[0].param("on_conflict"),
            Some("user_id,content_id,content_type")
        );
        assert_eq!(requests[0].body["content_type"], "question");
        assert!(requests[0].body["updated_at"].is_string());
    }

    #[tokio::test]
    async fn test_vote_rpc_arguments() {
        let (backend, requests) = serve(|_| (204, String::new())).await;
        let notebook_id = Uuid::from_u128(7);

        backend
            .increment_content_vote(ContentType::Schedule, "evt-1", VoteKind::Hot, 1)
            .await
            .unwrap();
        backend
            .increment_content_vote(ContentType::Question, QUESTION_ID, VoteKind::Cold, -1)
            .await
            .unwrap();
        backend
            .increment_vote_count(VoteCounter::Notebook, notebook_id, VoteKind::Cold, -1)
            .await
            .unwrap();

        let requests = recorded(&requests);
        assert_eq!(requests.len(), 3);

        assert_eq!(requests[0].path, "/rest/v1/rpc/increment_schedule_event_vote");
        assert_eq!(
            requests[0].body,
            json!({ "event_id_param": "evt-1", "vote_type": "hot_votes", "increment_value": 1 })
        );

        assert_eq!(requests[1].path, "/rest/v1/rpc/increment_content_vote");
        assert_eq!(requests[1].body["table_name"], "questions");
        assert_eq!(requests[1].body["content_id_param"], QUESTION_ID);

        assert_eq!(requests[2].path, "/rest/v1/rpc/increment_notebook_vote");
        assert_eq!(
            requests[2].body,
            json!({
                "notebook_id_param": notebook_id.to_string(),
                "vote_type": "cold_votes",
                "increment_value": -1,
            })
        );
    }

    #[tokio::test]
    async fn test_delete_source_removes_files_first() {
        let (backend, requests) = serve(|_| (200, "[]".to_owned())).await;
        let source_id = Uuid::from_u128(3);

        backend
            .delete_source(source_id, &["u1/pix.pdf".to_owned()])
            .await
            .unwrap();

        let requests = recorded(&requests);
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].method, "DELETE");
        assert_eq!(requests[0].path, format!("/storage/v1/object/{SOURCES_BUCKET}"));
        assert_eq!(requests[0].body, json!({ "prefixes": ["u1/pix.pdf"] }));

        assert_eq!(requests[1].method, "DELETE");
        assert_eq!(requests[1].path, "/rest/v1/sources");
        assert_eq!(requests[1].param("id"), Some(format!("eq.{source_id}").as_str()));
    }
}
