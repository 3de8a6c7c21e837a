use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use rafiki::logging::{self, LogTarget};
use rafiki::{
    ChatBackend, Config, ConversationController, FileStore, MemoryStore, Outcome, PreferenceStore,
    RafikiClient, SubmitError,
};

#[derive(Parser)]
#[command(name = "rafiki")]
#[command(about = "Chat with Rafiki, the IT-support assistant")]
struct Cli {
    /// Backend base URL (overrides RAFIKI_BACKEND_URL and the config file)
    #[arg(long, global = true)]
    backend_url: Option<String>,
    /// Keep the theme preference in memory only
    #[arg(long, global = true)]
    no_persist: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print Rafiki's reply
    Ask {
        /// Your question
        message: String,
    },
    /// Check whether the backend is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = match cli.command {
        None => LogTarget::File(logging::default_log_path()),
        Some(_) => LogTarget::Stderr,
    };
    logging::init(target)?;

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config file");
        Config::new()
    });
    let backend_url = config.resolve_backend_url(cli.backend_url.as_deref());
    tracing::info!(%backend_url, "using backend");
    let client = RafikiClient::new(&backend_url);

    match cli.command {
        None => run_tui(client, open_store(cli.no_persist)).await,
        Some(Commands::Ask { message }) => ask(client, &message).await,
        Some(Commands::Health) => health(&client).await,
    }
}

fn open_store(no_persist: bool) -> Box<dyn PreferenceStore> {
    if no_persist {
        return Box::new(MemoryStore::new());
    }
    match FileStore::default_location() {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!(error = %e, "theme preference will not be saved");
            Box::new(MemoryStore::new())
        }
    }
}

async fn run_tui(client: RafikiClient, store: Box<dyn PreferenceStore>) -> Result<()> {
    use std::io::IsTerminal;

    if !std::io::stdin().is_terminal() || !std::io::stderr().is_terminal() {
        eprintln!("{}", "rafiki needs an interactive terminal; try `rafiki ask \"...\"`".red());
        return Ok(());
    }

    let controller = ConversationController::new(Arc::new(client), store);
    let mut app = App::new(controller);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = event_loop(&mut terminal, &mut app).await;

    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new();
    app.refresh_health();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    if let Some(pending) = app.pending.take() {
        tracing::debug!("exiting with a reply still in flight");
        pending.abort();
    }
    Ok(())
}

async fn ask(client: RafikiClient, message: &str) -> Result<()> {
    let mut controller = ConversationController::new(Arc::new(client), Box::new(MemoryStore::new()));

    match controller.submit(message).await {
        Ok(outcome) => {
            let reply = controller
                .transcript()
                .last()
                .map(|turn| turn.content.as_str())
                .unwrap_or_default();
            match outcome {
                Outcome::Replied => println!("{}\n{}", "Rafiki:".bold().green(), reply),
                Outcome::Rejected | Outcome::Unreachable => {
                    println!("{}\n{}", "Rafiki:".bold().yellow(), reply)
                }
            }
        }
        Err(SubmitError::EmptyMessage) => {
            eprintln!("{}", "Nothing to send".yellow());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

async fn health(client: &RafikiClient) -> Result<()> {
    println!("🔍 Checking {}", client.base_url().cyan());

    match client.health().await {
        Ok(status) => {
            let state = if status.is_online() {
                status.status.bold().green()
            } else {
                status.status.bold().red()
            };
            println!("{} {} ({} mode)", status.service, state, status.chatbot_mode);
        }
        Err(e) => {
            println!("{}: {}", "Backend unreachable".red(), e);
        }
    }

    Ok(())
}
