//! Studia readline REPL.
//!
//! Terminal front end for the study assistant: ask questions, attach
//! documents, and watch the Architect, Illustrator and Historian catch up in
//! the background.

mod command;
mod helper;
mod logging;
mod render;

use anyhow::{Context as _, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::{ColorMode, Editor};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use studia_application::{NarrationStatus, RawFile, StudiaApp};
use studia_core::account::{Account, Credentials};
use studia_core::session::Session;
use studia_core::StudiaError;
use studia_infrastructure::{ConfigService, JsonBlobStore, SecretService, StudiaPaths};
use studia_interaction::GeminiInferenceProvider;

use command::Command;
use helper::CliHelper;

#[derive(Parser, Debug)]
#[command(name = "studia", version, about = "Multi-agent study assistant")]
struct Args {
    /// Keep config, secrets, logs and data under this directory
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Read answers aloud regardless of the configured default
    #[arg(long)]
    narration: bool,
}

type Prompt = Editor<CliHelper, DefaultHistory>;

/// REPL state that outlives a single command.
struct Repl {
    app: Arc<StudiaApp>,
    /// Result of the last `/sessions`, used to resolve `/switch <n>`.
    listing: Vec<Session>,
}

enum Flow {
    Continue,
    Exit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let paths = StudiaPaths::new(args.data_dir.as_deref());
    let _log_guard = logging::init(&paths.logs_dir()?)?;
    tracing::info!("[Studia] Starting");

    let mut config = ConfigService::new(args.data_dir.as_deref())?.get_config();
    if args.narration {
        config.narration_enabled = true;
    }

    let store = Arc::new(JsonBlobStore::open(paths.store_file()?).await?);
    let secrets = SecretService::new(args.data_dir.as_deref())?;
    let provider = GeminiInferenceProvider::from_secrets(&secrets, config.models.clone())
        .context("Set GEMINI_API_KEY or add it to secret.json")?;

    let app = Arc::new(StudiaApp::new(
        &config,
        store.clone(),
        store,
        Arc::new(provider),
    ));

    let _account_subscription = app.accounts.observe_account(Arc::new(|account: Option<Account>| {
        match account {
            Some(account) => {
                let name = if account.display_name.is_empty() {
                    account.email
                } else {
                    account.display_name
                };
                println!("{}", format!("Signed in as {}", name).green());
            }
            None => println!("{}", "Signed out".bright_black()),
        }
    }));
    let watcher = spawn_activity_watcher(&app);

    let mut rl: Prompt = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Studia ===".bright_magenta().bold());
    println!("{}", "Type /help for commands, or 'quit' to exit.".bright_black());

    let mut repl = Repl {
        app: app.clone(),
        listing: Vec::new(),
    };
    repl.greet().await;

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match command::parse(trimmed) {
                    Ok(command) => command,
                    Err(usage) => {
                        println!("{}", usage.yellow());
                        continue;
                    }
                };
                match repl.handle(command, &mut rl).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Exit) => break,
                    Err(e) => report(&e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    println!("{}", "Finishing background work...".bright_black());
    app.shutdown().await;
    watcher.abort();
    println!("{}", "Goodbye!".bright_green());
    tracing::info!("[Studia] Exited");
    Ok(())
}

/// Prints satellite results as they land in the live session.
fn spawn_activity_watcher(app: &StudiaApp) -> tokio::task::JoinHandle<()> {
    let mut rx = app.live.subscribe();
    tokio::spawn(async move {
        let mut previous = rx.borrow_and_update().clone();
        while rx.changed().await.is_ok() {
            let current = rx.borrow_and_update().clone();
            for note in render::describe_changes(&previous, &current) {
                println!("{}", format!("· {}", note).bright_black());
            }
            previous = current;
        }
    })
}

/// Auth failures are shown verbatim; everything else with its category.
fn report(error: &StudiaError) {
    match error {
        StudiaError::Auth(auth) => println!("{}", auth.to_string().red()),
        other => eprintln!("{}", format!("Error: {}", other).red()),
    }
}

impl Repl {
    async fn greet(&mut self) {
        if self.app.accounts.current_account().await.is_none() {
            println!(
                "{}",
                "Sign in with /login <email> or create an account with /signup <email> [name]."
                    .bright_black()
            );
            return;
        }
        self.resume().await;
    }

    async fn resume(&mut self) {
        match self.app.sessions.resume_latest().await {
            Ok(Some(session)) => render::print_session(&session),
            Ok(None) => println!(
                "{}",
                "No sessions yet. Start one with /new <topic>.".bright_black()
            ),
            Err(e) => report(&e),
        }
    }

    async fn handle(&mut self, command: Command, rl: &mut Prompt) -> studia_core::Result<Flow> {
        match command {
            Command::Ask(text) => self.ask(&text).await?,
            Command::New(topic) => {
                let session = self.app.sessions.create_session(&topic).await?;
                render::print_session(&session);
            }
            Command::Sessions => {
                self.listing = self.app.sessions.list_sessions().await?;
                let current = self.app.live.session_id().await;
                render::print_listing(&self.listing, current.as_deref());
            }
            Command::Switch(target) => {
                let id = self.resolve(&target)?;
                let session = self.app.sessions.switch_session(&id).await?;
                render::print_session(&session);
            }
            Command::Rename(topic) => {
                let id = self.current_id().await?;
                let session = self.app.sessions.rename_session(&id, &topic).await?;
                println!("{}", format!("Renamed to '{}'", session.topic).green());
            }
            Command::Pin(target) => {
                let id = match target {
                    Some(target) => self.resolve(&target)?,
                    None => self.current_id().await?,
                };
                let pinned = self.app.sessions.toggle_pin(&id).await?;
                let label = if pinned { "Pinned" } else { "Unpinned" };
                println!("{}", label.green());
            }
            Command::Upload(path) => self.upload(&path).await?,
            Command::Diagram => {
                let session = self.app.live.session().await;
                render::print_diagram(session.as_ref().and_then(|s| s.diagram.as_deref()));
            }
            Command::Image => {
                let session = self.app.live.session().await;
                render::print_image(session.as_ref().and_then(|s| s.image.as_deref()));
            }
            Command::Narration(value) => {
                let settings = self.app.turns.settings();
                let enabled = value.unwrap_or(!settings.narration_enabled());
                settings.set_narration_enabled(enabled);
                let label = if enabled { "Narration on" } else { "Narration off" };
                println!("{}", label.green());
            }
            Command::Audio(path) => self.save_audio(&path).await?,
            Command::Status => render::print_agents(&self.app.live.snapshot()),
            Command::SignUp {
                email,
                display_name,
            } => {
                let password = read_password(rl)?;
                self.app
                    .accounts
                    .sign_up(&Credentials::new(email, password), &display_name)
                    .await?;
                self.resume().await;
            }
            Command::LogIn { email } => {
                let password = read_password(rl)?;
                self.app
                    .accounts
                    .log_in(&Credentials::new(email, password))
                    .await?;
                self.resume().await;
            }
            Command::LogOut => {
                self.app.accounts.log_out().await?;
                self.listing.clear();
            }
            Command::Help => render::print_help(),
            Command::Quit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    async fn ask(&self, text: &str) -> studia_core::Result<()> {
        println!("{}", "Teacher is thinking...".bright_black());
        let turn = self.app.turns.submit_turn(text).await?;
        if let Some(answer) = turn.answer() {
            render::print_message(answer);
        }
        Ok(())
    }

    /// Stages the file now and lets the Historian read it in the background.
    async fn upload(&self, path: &Path) -> studia_core::Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StudiaError::io(format!("{}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        println!(
            "{}",
            format!("Attaching {} ({})...", name, mime_type).bright_black()
        );
        let app = self.app.clone();
        self.app.tasks.spawn(async move {
            if let Err(e) = app
                .ingestion
                .ingest_file(RawFile::new(name, mime_type, bytes))
                .await
            {
                report(&e);
            }
        });
        Ok(())
    }

    async fn save_audio(&self, path: &Path) -> studia_core::Result<()> {
        let NarrationStatus::Ready { audio, .. } = self.app.live.snapshot().narration else {
            return Err(StudiaError::validation("No narration is ready"));
        };
        tokio::fs::write(path, &audio.data)
            .await
            .map_err(|e| StudiaError::io(format!("{}: {}", path.display(), e)))?;
        println!(
            "{}",
            format!("Saved {} audio to {}", audio.mime_type, path.display()).green()
        );
        Ok(())
    }

    async fn current_id(&self) -> studia_core::Result<String> {
        self.app
            .live
            .session_id()
            .await
            .ok_or_else(|| StudiaError::validation("No session is open (try /new <topic>)"))
    }

    /// Accepts a 1-based index into the last listing, a full id, or an id prefix.
    fn resolve(&self, target: &str) -> studia_core::Result<String> {
        if let Ok(index) = target.parse::<usize>() {
            return index
                .checked_sub(1)
                .and_then(|i| self.listing.get(i))
                .map(|s| s.id.clone())
                .ok_or_else(|| {
                    StudiaError::validation(format!("No session #{} (run /sessions first)", index))
                });
        }
        let matches: Vec<&Session> = self
            .listing
            .iter()
            .filter(|s| s.id.starts_with(target))
            .collect();
        match matches.as_slice() {
            [only] => Ok(only.id.clone()),
            [] => Ok(target.to_string()),
            _ => Err(StudiaError::validation(format!(
                "'{}' matches several sessions",
                target
            ))),
        }
    }
}

/// Reads a password with the input masked. Nothing is added to history.
fn read_password(rl: &mut Prompt) -> studia_core::Result<String> {
    set_masking(rl, true);
    rl.set_color_mode(ColorMode::Forced);
    let password = rl.readline("password: ");
    rl.set_color_mode(ColorMode::Enabled);
    set_masking(rl, false);

    password.map_err(|e| StudiaError::io(format!("Failed to read password: {}", e)))
}

fn set_masking(rl: &mut Prompt, masking: bool) {
    if let Some(helper) = rl.helper_mut() {
        helper.masking = masking;
    }
}
