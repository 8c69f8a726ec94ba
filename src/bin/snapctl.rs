use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use snapkit::error::Redirect;
use snapkit::model::{ConfigPatch, Identity, Tone};
use snapkit::orchestrator::GenerateOutcome;
use snapkit::{Config, Orchestrator, PendingImage};

#[derive(Parser, Debug)]
#[command(name = "snapctl", about = "CLI for the SnapKit generation service", version)]
struct Cli {
    /// Supabase user id (falls back to SNAPKIT_USER_ID)
    #[arg(global = true, long)]
    user_id: Option<String>,

    /// Supabase access token for the user (falls back to SUPABASE_ACCESS_TOKEN)
    #[arg(global = true, long)]
    access_token: Option<String>,

    /// Override GEMINI_MODEL
    #[arg(global = true, long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a photo and generate a social kit for it
    Generate {
        /// Path to the image file
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
        /// playful, professional, minimal, inspirational or funny
        #[arg(long)]
        tone: Option<Tone>,
        /// Target platform (repeatable)
        #[arg(long = "platform", value_name = "NAME")]
        platforms: Vec<String>,
        /// Ask for copy without emoji
        #[arg(long)]
        no_emoji: bool,
        /// Output language
        #[arg(long)]
        language: Option<String>,
        /// Pretty-print the resulting JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Past generations
    History {
        #[command(subcommand)]
        cmd: HistoryCmd,
    },
    /// Gemini API key stored on the profile
    Key {
        #[command(subcommand)]
        cmd: KeyCmd,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCmd {
    /// List past generations, most recent first
    List {
        /// Output raw JSON instead of one line per entry
        #[arg(long)]
        json: bool,
    },
    /// Print the stored kit of one entry
    Show { id: String },
    /// Delete one entry
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum KeyCmd {
    /// Store a new key
    Set { key: String },
    /// Report whether a key is stored
    Show,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Load env and parse CLI
    Config::dotenv_load();
    let cli = Cli::parse();

    let mut conf = Config::new()?;
    if let Some(model) = cli.model {
        conf.gemini_model = model;
    }
    let orchestrator = Arc::new(snapkit::connect(&conf)?);

    let user_id = cli
        .user_id
        .or_else(|| std::env::var("SNAPKIT_USER_ID").ok())
        .ok_or("Must provide --user-id or SNAPKIT_USER_ID")?;
    let mut identity = Identity::new(user_id);
    identity.access_token = cli
        .access_token
        .or_else(|| std::env::var("SUPABASE_ACCESS_TOKEN").ok());
    // Wait for the stored key so `generate` sees it.
    orchestrator.acquire_session(identity).await?;

    match cli.command {
        Commands::Generate { image, tone, platforms, no_emoji, language, pretty } => {
            let patch = ConfigPatch {
                tone,
                platforms: if platforms.is_empty() { None } else { Some(platforms) },
                include_emoji: Some(!no_emoji),
                language,
            };
            run_generate(&orchestrator, image, patch, pretty).await
        }
        Commands::History { cmd } => match cmd {
            HistoryCmd::List { json } => {
                let records = orchestrator.history().await?;
                if json {
                    println!("{}", serde_json::to_string(&records)?);
                } else if records.is_empty() {
                    eprintln!("No generations yet");
                } else {
                    for r in records {
                        println!("{}\t{}\t{}", r.id, r.created_at.to_rfc3339(), r.image_url);
                    }
                }
                Ok(())
            }
            HistoryCmd::Show { id } => {
                let records = orchestrator.history().await?;
                let Some(record) = records.into_iter().find(|r| r.id == id) else {
                    eprintln!("No generation with id={}", id);
                    std::process::exit(1);
                };
                orchestrator.load_from_history(record.result, record.image_url);
                let snapshot = orchestrator.snapshot();
                println!("image: {}", snapshot.image_preview.unwrap_or_default());
                let result = snapshot.result.map(|r| r.0).unwrap_or(Value::Null);
                println!("{}", serde_json::to_string_pretty(&result)?);
                Ok(())
            }
            HistoryCmd::Delete { id } => {
                orchestrator.delete_history_entry(&id).await?;
                println!("Deleted {}", id);
                Ok(())
            }
        },
        Commands::Key { cmd } => match cmd {
            KeyCmd::Set { key } => {
                orchestrator.save_credential(&key).await?;
                println!("API key saved");
                Ok(())
            }
            KeyCmd::Show => {
                if orchestrator.snapshot().has_credential {
                    println!("API key configured");
                } else {
                    println!("No API key configured; run `snapctl key set <KEY>`");
                }
                Ok(())
            }
        },
    }
}

async fn run_generate(
    orchestrator: &Arc<Orchestrator>,
    path: PathBuf,
    patch: ConfigPatch,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(&path).await?;
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    orchestrator.select_image(PendingImage::new(bytes, None, file_name)?);
    orchestrator.set_config(patch)?;

    match orchestrator.generate().await {
        GenerateOutcome::Completed { result } => {
            if pretty {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", serde_json::to_string(&result)?);
            }
            Ok(())
        }
        GenerateOutcome::Redirected { redirect: Redirect::Authenticate } => {
            eprintln!("Error: sign in first (--user-id / --access-token)");
            std::process::exit(2);
        }
        GenerateOutcome::Redirected { redirect: Redirect::ConfigureCredential } => {
            eprintln!("Error: no Gemini API key stored; run `snapctl key set <KEY>`");
            std::process::exit(2);
        }
        GenerateOutcome::Failed { message, redirect } => {
            eprintln!("Error: {}", message);
            if redirect == Some(Redirect::ConfigureCredential) {
                eprintln!("Hint: update the key with `snapctl key set <KEY>`");
            }
            std::process::exit(1);
        }
        other => {
            eprintln!("Generation did not run: {:?}", other);
            std::process::exit(1);
        }
    }
}
