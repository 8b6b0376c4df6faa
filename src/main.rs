use clap::{Parser, Subcommand};
use procap_study::notebooks::NotebookKey;
use secrecy::SecretString;
use tracing_subscriber::EnvFilter;
use url::Url;

mod commands;

#[derive(Parser)]
#[clap(about = "Inspect and seed the study platform's hosted store")]
struct Cli {
    #[clap(long, env = "PROCAP_BACKEND_URL", value_parser)]
    backend_url: Url,

    #[clap(long, env = "PROCAP_BACKEND_KEY", hide_env_values = true, value_parser)]
    backend_key: String,

    #[clap(
        long,
        env = "PROCAP_AI_URL",
        default_value = "https://generativelanguage.googleapis.com/",
        value_parser
    )]
    ai_url: Url,

    #[clap(long, env = "PROCAP_AI_KEY", hide_env_values = true, default_value = "", value_parser)]
    ai_key: String,

    #[clap(long, env = "PROCAP_AI_MODEL", value_parser)]
    ai_model: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load every table and print row counts.
    Snapshot,
    /// Print the course calendar grouped by day.
    Schedule,
    /// Print the ranking of a notebook by correct first tries.
    Leaderboard {
        #[clap(short, long, value_parser, value_name = "KEY")]
        notebook: NotebookKey,
    },
    /// Insert the built-in course calendar, keeping stored events.
    SeedSchedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(feature = "env-file")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut platform = commands::connect(
        cli.backend_url,
        SecretString::new(cli.backend_key),
        cli.ai_url,
        SecretString::new(cli.ai_key),
        cli.ai_model,
    )?;

    match cli.command {
        Command::Snapshot => commands::snapshot(&mut platform).await,
        Command::Schedule => commands::schedule(&mut platform).await,
        Command::Leaderboard { notebook } => commands::leaderboard(&mut platform, &notebook).await,
        Command::SeedSchedule => commands::seed_schedule(&mut platform).await,
    }
}
