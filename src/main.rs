use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod app;
mod config;
mod conversation;
mod error;
mod handler;
mod ollama;
mod orchestrator;
mod tui;
mod ui;

#[cfg(test)]
mod test_support;

use app::App;
use config::{Config, Overrides};
use conversation::Conversation;
use ollama::OllamaClient;
use orchestrator::Completions;

#[derive(Parser)]
#[command(name = "ollama-chat")]
#[command(about = "Chat with models served by a local Ollama instance", version)]
struct Cli {
    /// Ollama base URL (defaults to $OLLAMA_HOST, then the config file, then http://localhost:11434)
    #[arg(short, long)]
    url: Option<String>,
    /// Model to select when it is available
    #[arg(short, long)]
    model: Option<String>,
    /// Timeout for listing models and the startup probe, in seconds
    #[arg(long, value_name = "SECS")]
    list_timeout: Option<u64>,
    /// Timeout for a chat reply, in seconds
    #[arg(long, value_name = "SECS")]
    chat_timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available Ollama models and exit
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = init_tracing();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config file");
        Config::default()
    });
    let overrides = Overrides {
        base_url: cli.url,
        model: cli.model,
        list_timeout_secs: cli.list_timeout,
        chat_timeout_secs: cli.chat_timeout,
    };
    let settings = config.resolve(std::env::var("OLLAMA_HOST").ok(), &overrides);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %settings.base_url,
        log_file = ?log_path,
        "starting"
    );

    match cli.command {
        Some(Commands::Models) => list_models(&OllamaClient::new(&settings)).await,
        None => run_tui(&settings).await,
    }
}

async fn run_tui(settings: &config::Settings) -> Result<()> {
    let (orchestrator, completions) = orchestrator::channel();
    let mut app = App::new(settings, orchestrator);
    app.start();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = event_loop(&mut terminal, &mut app, completions).await;
    tui::restore()?;

    result
}

async fn event_loop(
    terminal: &mut tui::Tui,
    app: &mut App,
    mut completions: Completions<Conversation>,
) -> Result<()> {
    let mut events = tui::EventHandler::new();

    loop {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            event = events.next() => match event {
                Some(event) => handler::handle_event(app, event),
                None => break,
            },
            Some(done) = completions.next() => app.apply(done),
        }

        // Apply anything else that finished meanwhile before the next frame
        while let Some(done) = completions.try_next() {
            app.apply(done);
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

async fn list_models(ollama: &OllamaClient) -> Result<()> {
    let models = ollama.list_models().await.with_context(|| {
        format!(
            "could not list models from {} (is `ollama serve` running?)",
            ollama.base_url()
        )
    })?;

    if models.is_empty() {
        println!("No models found. Pull a model with: ollama pull llama3.2");
    }
    for model in models {
        println!("{}", model);
    }
    Ok(())
}

/// Log to a file; the terminal belongs to the UI. Returns the file in use.
fn init_tracing() -> Option<PathBuf> {
    use tracing_subscriber::EnvFilter;

    let log_dir = dirs::data_local_dir()?.join("ollama-chat");
    std::fs::create_dir_all(&log_dir).ok()?;
    let log_path = log_dir.join("ollama-chat.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ollama_chat=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .init();

    Some(log_path)
}
