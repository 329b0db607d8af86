use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use skybot_agents::{build_assistant, AssistantConfig, FlightAssistant};
use skybot_completion::{Completion, CompletionConfig};
use skybot_core::{describe_flight, is_affirmative, FlightNumber, ResponsePayload};
use skybot_observability::{init_cli_tracing, AppMetrics};
use skybot_storage::{sample_flights, FlightRepository, Store};

const BANNER_WIDTH: usize = 60;
const FAREWELL: &str = "Thank you for using SkyBot! Have a safe journey! 👋";

#[derive(Debug, Parser)]
#[command(name = "skybot")]
#[command(about = "SkyBot flight information assistant")]
struct Cli {
    /// sqlite URL; without it an in-memory store with sample flights is used
    #[arg(long, env = "SKYBOT_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Skip the completion provider and rely on pattern matching only
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive conversation
    Chat {
        /// Per-character delay of the typing effect, 0 to disable
        #[arg(long, env = "SKYBOT_TYPING_DELAY_MS", default_value_t = 30)]
        typing_delay_ms: u64,
    },
    /// Answer one question and print the payload as JSON
    Ask { text: String },
    /// Look up a flight number directly, bypassing extraction
    Lookup { flight_number: String },
    /// Insert the sample flights and print their ids
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_cli_tracing("skybot_cli");
    let cli = Cli::parse();
    let database_url = configured_database_url(&cli).map(str::to_string);

    match cli.command {
        Command::Seed => {
            let store = open_seed_target(database_url.as_deref()).await?;
            let outcome = seed(&store).await;
            store.close().await;
            outcome
        }
        Command::Chat { typing_delay_ms } => {
            let assistant = open_assistant(cli.offline, database_url).await?;
            let outcome = run_chat(&assistant, Duration::from_millis(typing_delay_ms)).await;
            assistant.store().close().await;
            outcome
        }
        Command::Ask { text } => {
            let assistant = open_assistant(cli.offline, database_url).await?;
            let outcome = assistant
                .answer(&text)
                .await
                .and_then(|payload| print_json(&payload));
            assistant.store().close().await;
            outcome
        }
        Command::Lookup { flight_number } => {
            let assistant = open_assistant(cli.offline, database_url).await?;
            let flight_number = FlightNumber::parse(flight_number.trim()).ok();
            let payload = assistant.lookup(flight_number.as_ref()).await;
            assistant.store().close().await;
            print_json(&payload)
        }
    }
}

async fn open_assistant(
    offline: bool,
    database_url: Option<String>,
) -> Result<FlightAssistant<Store, Completion>> {
    let completion = if offline {
        CompletionConfig::offline()
    } else {
        CompletionConfig::from_env().context("invalid completion configuration")?
    };
    let config = AssistantConfig {
        completion,
        database_url,
    };
    build_assistant(&config, AppMetrics::shared()).await
}

fn print_json(payload: &ResponsePayload) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

fn configured_database_url(cli: &Cli) -> Option<&str> {
    cli.database_url
        .as_deref()
        .filter(|value| !value.trim().is_empty())
}

/// Seeding never goes through the assistant bootstrap, which would preload
/// an in-memory store and double every record.
async fn open_seed_target(database_url: Option<&str>) -> Result<Store> {
    match database_url {
        Some(database_url) => Store::sqlite(database_url).await,
        None => {
            eprintln!(
                "{}",
                "SKYBOT_DATABASE_URL is not set; seeding a throwaway in-memory store".yellow()
            );
            Ok(Store::memory())
        }
    }
}

async fn insert_samples(store: &Store) -> Result<Vec<String>> {
    store
        .insert_flights(&sample_flights())
        .await
        .context("failed to insert sample flights")
}

async fn seed(store: &Store) -> Result<()> {
    let ids = insert_samples(store).await?;

    println!("{} inserted {} flights", "✅".green(), ids.len());
    for id in ids {
        println!("  {id}");
    }
    Ok(())
}

async fn run_chat(assistant: &FlightAssistant<Store, Completion>, delay: Duration) -> Result<()> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let rule = "=".repeat(BANNER_WIDTH);

    println!("\n{}", rule.cyan());
    println!(
        "{}",
        "✈️  Welcome to SkyBot - Your Flight Information Assistant!".cyan()
    );
    println!("{}", rule.cyan());
    println!("Ask about flight status, departure times, or destinations.");
    println!("Type 'exit' to end the conversation.\n");

    loop {
        let Some(message) = prompt()? else {
            break;
        };

        if message.eq_ignore_ascii_case("exit") {
            bot_says(FAREWELL, delay).await?;
            break;
        }

        let payload = match assistant.converse(&session_id, &message).await {
            Ok(payload) => payload,
            Err(error) => {
                eprintln!("\n{} {error:#}\n", "❌ Request failed:".red());
                continue;
            }
        };

        bot_says(&payload.answer, delay).await?;

        if let Some(record) = payload.flight_data {
            tokio::time::sleep(Duration::from_millis(500)).await;
            println!(
                "\n{}",
                "Would you like to know more details about this flight? (yes/no)".yellow()
            );
            match prompt()? {
                Some(reply) if is_affirmative(&reply) => {
                    bot_says(&format!("\n{}\n", describe_flight(&record)), delay).await?;
                }
                Some(_) => {}
                None => break,
            }
        }

        println!();
    }

    Ok(())
}

/// Reads one trimmed line. `None` on end of input.
fn prompt() -> Result<Option<String>> {
    print!("{}", "You: ".green());
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

async fn bot_says(text: &str, delay: Duration) -> Result<()> {
    print!("\n{}", "SkyBot: ".cyan());
    type_out(text, delay).await
}

async fn type_out(text: &str, delay: Duration) -> Result<()> {
    let mut stdout = io::stdout();
    if delay.is_zero() {
        writeln!(stdout, "{text}")?;
        return Ok(());
    }

    for ch in text.chars() {
        write!(stdout, "{ch}")?;
        stdout.flush()?;
        tokio::time::sleep(delay).await;
    }
    writeln!(stdout)?;
    Ok(())
}
