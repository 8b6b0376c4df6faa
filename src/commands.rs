use anyhow::Result;
use procap_study::config::{BackendConfig, GeneratorConfig};
use procap_study::generator::GeminiGenerator;
use procap_study::notebooks::NotebookKey;
use procap_study::platform::Platform;
use procap_study::quiz::leaderboard as notebook_leaderboard;
use procap_study::remote::RemoteBackend;
use procap_study::schedule::events_by_day;
use secrecy::SecretString;
use serde_json::json;
use url::Url;

pub type RemotePlatform = Platform<RemoteBackend, GeminiGenerator>;

pub fn connect(
    backend_url: Url,
    backend_key: SecretString,
    ai_url: Url,
    ai_key: SecretString,
    ai_model: Option<String>,
) -> Result<RemotePlatform> {
    let backend = RemoteBackend::new(BackendConfig::new(backend_url, backend_key))?;
    let generator = GeminiGenerator::new(GeneratorConfig::new(ai_url, ai_key, ai_model))?;

    Ok(Platform::new(backend, generator))
}

pub async fn snapshot(platform: &mut RemotePlatform) -> Result<()> {
    platform.load().await?;

    let data = platform.data();
    let sources = &data.sources;

    let counts = json!({
        "users": data.users.len(),
        "sources": sources.len(),
        "summaries": sources.iter().map(|source| source.summaries.len()).sum::<usize>(),
        "flashcards": sources.iter().map(|source| source.flashcards.len()).sum::<usize>(),
        "questions": sources.iter().map(|source| source.questions.len()).sum::<usize>(),
        "mind_maps": sources.iter().map(|source| source.mind_maps.len()).sum::<usize>(),
        "audio_summaries": sources.iter().map(|source| source.audio_summaries.len()).sum::<usize>(),
        "chat_messages": data.chat_messages.len(),
        "question_notebooks": data.question_notebooks.len(),
        "case_studies": data.case_studies.len(),
        "schedule_events": data.schedule_events.len(),
        "user_message_votes": data.user_message_votes.len(),
        "user_source_votes": data.user_source_votes.len(),
        "user_content_interactions": data.user_content_interactions.len(),
        "user_notebook_interactions": data.user_notebook_interactions.len(),
        "user_question_answers": data.user_question_answers.len(),
        "user_case_study_interactions": data.user_case_study_interactions.len(),
    });

    println!("{}", serde_json::to_string_pretty(&counts)?);

    Ok(())
}

pub async fn schedule(platform: &mut RemotePlatform) -> Result<()> {
    platform.load().await?;

    for (day, events) in events_by_day(&platform.data().schedule_events) {
        println!("{}", day.format("%d/%m/%Y"));

        for event in events {
            let professor = event
                .professor
                .as_deref()
                .map(|professor| format!(" ({professor})"))
                .unwrap_or_default();

            println!(
                "  {}-{} {}{professor}",
                event.start_time.format("%H:%M"),
                event.end_time.format("%H:%M"),
                event.title
            );
        }
    }

    Ok(())
}

pub async fn leaderboard(platform: &mut RemotePlatform, notebook: &NotebookKey) -> Result<()> {
    platform.load().await?;

    let entries = notebook_leaderboard(platform.data(), notebook);

    println!("{}", serde_json::to_string_pretty(&entries)?);

    Ok(())
}

pub async fn seed_schedule(platform: &mut RemotePlatform) -> Result<()> {
    platform.load().await?;

    let added = platform.seed_schedule().await?;

    println!("{added} schedule events added");

    Ok(())
}
