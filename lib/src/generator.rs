//! AI content generation and the checks generated content goes through
//! before it is stored.

use std::collections::HashSet;

use anyhow::bail;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::data::Question;
use crate::{Error, Result};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct GeneratedContent {
    pub summaries: Vec<GeneratedSummary>,
    pub flashcards: Vec<GeneratedFlashcard>,
    pub questions: Vec<GeneratedQuestion>,
    pub mind_maps: Vec<GeneratedMindMap>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct GeneratedSummary {
    pub title: String,
    pub content: String,
    #[serde(alias = "keyPoints")]
    pub key_points: Vec<Value>,
    #[serde(alias = "relatedTopics")]
    pub related_topics: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeneratedFlashcard {
    pub front: String,
    pub back: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeneratedQuestion {
    #[serde(default)]
    pub difficulty: String,
    #[serde(alias = "questionText")]
    pub question_text: String,
    pub options: Vec<String>,
    #[serde(alias = "correctAnswer")]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub hints: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeneratedMindMap {
    pub title: String,
    #[serde(default, alias = "imageUrl")]
    pub image_url: Option<String>,
}

/// Kind of content requested when generating more for existing sources.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeneratedKind {
    Summaries,
    Flashcards,
    Questions,
}

/// A candidate handed to [`ContentGenerator::filter_items_by_prompt`].
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PromptItem {
    pub id: String,
    pub text: String,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Everything derivable from a freshly added source.
    async fn generate_source_content(&self, title: &str, text: &str) -> Result<GeneratedContent>;

    /// More content of one kind, grounded on `context`.
    async fn generate_specific_content(
        &self,
        kind: GeneratedKind,
        context: &str,
        prompt: &str,
    ) -> Result<GeneratedContent>;

    /// Ids of the items relevant to `prompt`.
    async fn filter_items_by_prompt(&self, prompt: &str, items: &[PromptItem]) -> Result<Vec<String>>;

    async fn generate_notebook_name(&self, question_texts: &[&str]) -> Result<String>;
}

impl GeneratedQuestion {
    pub fn check(&self) -> anyhow::Result<()> {
        if self.question_text.trim().is_empty() {
            bail!("question has no text");
        }

        if self.options.len() < 2 || self.options.len() > 5 {
            bail!(
                "question `{}` must have between 2 and 5 options, got {}",
                self.question_text,
                self.options.len()
            );
        }

        let correct_count = self
            .options
            .iter()
            .filter(|option| **option == self.correct_answer)
            .count();

        if correct_count != 1 {
            bail!(
                "question `{}` must list its correct answer exactly once, found {}",
                self.question_text,
                correct_count
            );
        }

        Ok(())
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.question_text, &self.options, &self.correct_answer)
    }
}

/// Content hash of a question, insensitive to option order, case and
/// surrounding whitespace.
pub fn fingerprint(question_text: &str, options: &[String], correct_answer: &str) -> String {
    let normalize = |text: &str| text.trim().to_lowercase();

    let mut options = options.iter().map(|option| normalize(option)).collect::<Vec<_>>();
    options.sort();

    let mut hasher = blake3::Hasher::new();

    hasher.update(normalize(question_text).as_bytes());
    hasher.update(options.join("\u{1f}").as_bytes());
    hasher.update(normalize(correct_answer).as_bytes());

    hasher.finalize().to_string()
}

pub fn question_fingerprint(question: &Question) -> String {
    fingerprint(&question.question_text, &question.options, &question.correct_answer)
}

impl GeneratedContent {
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
            && self.flashcards.is_empty()
            && self.questions.is_empty()
            && self.mind_maps.is_empty()
    }

    /// Drops invalid questions, duplicates within the batch and questions
    /// already present in `existing`, keeping the generator's order.
    ///
    /// Fails with [`Error::InvalidContent`] when the batch held only
    /// questions and every one of them failed [`GeneratedQuestion::check`].
    pub fn validated(mut self, existing: &[Question]) -> Result<Self> {
        let mut seen = existing.iter().map(question_fingerprint).collect::<HashSet<_>>();
        let generated = self.questions.len();
        let mut last_err = None;

        self.flashcards
            .retain(|card| !card.front.trim().is_empty() && !card.back.trim().is_empty());

        self.questions.retain(|question| match question.check() {
            Ok(()) => true,
            Err(err) => {
                warn!("dropping generated question: {err}");
                last_err = Some(err);
                false
            }
        });

        if let Some(err) = last_err {
            let only_questions = self.summaries.is_empty()
                && self.flashcards.is_empty()
                && self.mind_maps.is_empty();

            if self.questions.is_empty() && only_questions {
                return Err(Error::InvalidContent(
                    err.context(format!("all {generated} generated questions are invalid")),
                ));
            }
        }

        self.questions.retain(|question| {
            let is_new = seen.insert(question.fingerprint());

            if !is_new {
                debug!(question = %question.question_text, "skipping repeated question");
            }

            is_new
        });

        Ok(self)
    }
}

/// Gemini-style `generateContent` client asking for JSON output.
#[derive(Clone, Debug)]
pub struct GeminiGenerator {
    client: Client,
    config: GeneratorConfig,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct FilteredIds {
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct NotebookName {
    name: String,
}

impl GeminiGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            config,
        })
    }

    async fn generate_json<T>(&self, prompt: String) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.config.generate_url()?;
        debug!(%url, model = %self.config.model, "generation request");

        let response = self
            .client
            .post(url)
            .query(&[("key", self.config.api_key.expose_secret())])
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
                "generationConfig": { "responseMimeType": "application/json" },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Generation(format!(
                "{status}: {}",
                response.text().await.unwrap_or_default()
            )));
        }

        parse_candidate(response.json().await?)
    }
}

fn parse_candidate<T>(response: GenerateResponse) -> Result<T>
where
    T: DeserializeOwned,
{
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| Error::Generation("response has no candidates".to_owned()))?;

    Ok(serde_json::from_str(strip_fences(&text))?)
}

fn strip_fences(text: &str) -> &str {
    let text = text.trim();

    text.strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .and_then(|inner| inner.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(text)
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate_source_content(&self, title: &str, text: &str) -> Result<GeneratedContent> {
        let prompt = format!(
            "Com base no material \"{title}\", gere um objeto JSON com as chaves \
             summaries (title, content, keyPoints, relatedTopics), flashcards (front, back), \
             questions (difficulty, questionText, options, correctAnswer, explanation, hints) \
             e mind_maps (title).\n\nMaterial:\n{text}"
        );

        self.generate_json(prompt).await
    }

    async fn generate_specific_content(
        &self,
        kind: GeneratedKind,
        context: &str,
        prompt: &str,
    ) -> Result<GeneratedContent> {
        let shape = match kind {
            GeneratedKind::Summaries => "summaries (title, content, keyPoints, relatedTopics)",
            GeneratedKind::Flashcards => "flashcards (front, back)",
            GeneratedKind::Questions => {
                "questions (difficulty, questionText, options, correctAnswer, explanation, hints)"
            }
        };
        let prompt = format!(
            "Gere um objeto JSON contendo apenas a chave {shape}.\n\
             Pedido: {prompt}\n\nContexto:\n{context}"
        );

        self.generate_json(prompt).await
    }

    async fn filter_items_by_prompt(&self, prompt: &str, items: &[PromptItem]) -> Result<Vec<String>> {
        let prompt = format!(
            "Retorne um objeto JSON {{\"ids\": [...]}} com os ids dos itens relevantes para: \
             {prompt}\n\nItens:\n{}",
            serde_json::to_string(items)?
        );
        let filtered: FilteredIds = self.generate_json(prompt).await?;

        Ok(filtered.ids)
    }

    async fn generate_notebook_name(&self, question_texts: &[&str]) -> Result<String> {
        let prompt = format!(
            "Retorne um objeto JSON {{\"name\": \"...\"}} com um nome curto para um caderno \
             com as questões:\n{}",
            question_texts.join("\n")
        );
        let named: NotebookName = self.generate_json(prompt).await?;

        Ok(named.name.trim().to_owned())
    }
}
