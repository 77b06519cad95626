mod utils;

pub mod chat;
pub mod commands;
pub mod coordinator;
pub mod ledger;
pub mod models;
pub mod notes;
pub mod settings;
pub mod storage;
pub mod timer;

use std::{io::Write, sync::Arc};

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde_json::Map;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use chat::ConsoleChat;
use commands::{execute, format_timer, parse_command, Command};
use coordinator::{Coordinator, CoordinatorConfig, InputRouter, Submission};
use ledger::{SessionLedger, SharedLedger};
use notes::NotesStore;
use settings::AppConfig;
use storage::SharedStore;
use timer::{TimerController, TimerStatus};

pub struct AppState {
    pub config: AppConfig,
    pub timer: TimerController,
    pub ledger: SharedLedger,
    pub notes: NotesStore,
    pub chat: Arc<ConsoleChat>,
    pub router: InputRouter,
}

impl AppState {
    pub fn new(config: AppConfig, store: SharedStore) -> Self {
        let timer = TimerController::new(config.default_timer_minutes);
        let ledger = SessionLedger::load(store.clone(), config.default_study_minutes).into_shared();
        let chat = Arc::new(ConsoleChat::new());
        let router = InputRouter::new(timer.clone(), ledger.clone(), chat.clone());

        Self {
            config,
            timer,
            ledger,
            notes: NotesStore::new(store),
            chat,
            router,
        }
    }

    pub fn coordinator(&self) -> Coordinator {
        Coordinator::new(
            self.timer.clone(),
            self.ledger.clone(),
            self.chat.clone(),
            CoordinatorConfig::from(&self.config),
        )
    }
}

/// Prints a line when a countdown runs out, since ticks themselves are silent.
fn spawn_finish_notifier(timer: &TimerController, cancel: CancellationToken) {
    let mut updates = timer.subscribe();
    tokio::spawn(async move {
        let mut was_finished = updates.borrow().status == TimerStatus::Finished;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    let finished = snapshot.status == TimerStatus::Finished;
                    if finished && !was_finished {
                        println!("⏰ Time's up! {}", format_timer(&snapshot));
                    }
                    was_finished = finished;
                }
            }
        }
    });
}

fn prompt() {
    print!("study-pal> ");
    let _ = std::io::stdout().flush();
}

async fn run_app() -> Result<()> {
    let data_dir = settings::data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings_path = data_dir.join("settings.json");
    let config = AppConfig::load(&settings_path)?;
    if !settings_path.exists() {
        config.save(&settings_path)?;
    }

    let store = config.open_store(&data_dir)?;
    let state = AppState::new(config, store);

    let cancel = CancellationToken::new();
    let coordinator = state.coordinator().spawn(cancel.clone());
    spawn_finish_notifier(&state.timer, cancel.clone());

    println!("Study Pal. Type /help for commands.");
    prompt();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        match parse_command(&line) {
            Some(Ok(Command::Quit)) => break,
            Some(Ok(command)) => match execute(&state, command).await {
                Ok(output) if !output.is_empty() => println!("{output}"),
                Ok(_) => {}
                Err(err) => warn!("Command failed: {err:#}"),
            },
            Some(Err(message)) => println!("{message}"),
            None => match state.router.submit(&line, Map::new()).await {
                Ok(Submission::StudyStarted(session)) => {
                    println!("{}", format_timer(&state.timer.get_snapshot().await));
                    info!("Session {} is running", session.id);
                }
                Ok(_) => {}
                Err(err) => warn!("{err:#}"),
            },
        }
        prompt();
    }

    cancel.cancel();
    if let Err(err) = coordinator.await {
        error!("Coordinator task failed: {err}");
    }
    state.timer.shutdown().await;
    info!("Study Pal shutting down");
    Ok(())
}

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    let default_level = if settings::debug_mode() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    info!("Study Pal starting up...");

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run_app()) {
        error!("{err:#}");
        std::process::exit(1);
    }
}
