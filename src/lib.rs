pub mod commands;
pub mod config;
pub mod display;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod perception;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::display::list::render_items;
use crate::engine::engine::{EngineSettings, ScanEngine};
use crate::engine::event_bus::ScanMessage;
use crate::engine::state::ScanCommand;
use crate::errors::QrLensResult;
use crate::executor::launcher::SystemLauncher;
use crate::perception::decoder::RqrrDecoder;

pub async fn run() -> QrLensResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("init-config") => {
            let path = config::init_config(args.next().map(std::path::PathBuf::from))?;
            println!("wrote default config to {}", path.display());
            return Ok(());
        }
        Some("--version" | "-V") => {
            println!("qrlens {}", commands::version());
            return Ok(());
        }
        Some(other) => tracing::warn!(arg = %other, "ignoring unknown argument"),
        None => {}
    }

    let cfg = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config; using defaults");
            AppConfig::default()
        }
    };

    let session = config::create_session(&cfg.capture)?;
    let settings = EngineSettings::from_config(&cfg)?;
    let decoder = Arc::new(RqrrDecoder::new(cfg.scanner.max_dimension));
    let engine = ScanEngine::new(session, decoder, Arc::new(SystemLauncher), settings);

    let events = engine.subscribe();
    let command_tx = engine.command_sender();
    tracing::info!(version = commands::version(), "spawning scan engine");
    let engine_task = tokio::spawn(engine.run_loop());
    let printer = tokio::spawn(print_events(events));

    println!("{}", commands::HELP);
    command_tx.send(ScanCommand::Start).await.ok();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = commands::parse_command(&line) else {
            println!("{}", commands::HELP);
            continue;
        };
        let quit = command == ScanCommand::Shutdown;
        if command_tx.send(command).await.is_err() || quit {
            break;
        }
    }
    // stdin closed or quit
    command_tx.send(ScanCommand::Shutdown).await.ok();

    if let Err(e) = engine_task.await {
        tracing::error!(error = %e, "scan engine task failed");
    }
    printer.abort();
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<ScanMessage>) {
    loop {
        match events.recv().await {
            Ok(msg) => print_event(&msg),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_event(msg: &ScanMessage) {
    match msg {
        ScanMessage::StateChanged { state } => println!("[state] {state:?}"),
        ScanMessage::SnapshotChanged { diff, .. } => {
            for entry in &diff.added {
                println!("[scan] {}", entry.value);
            }
        }
        ScanMessage::ListRendered { items } => print!("{}", render_items(items)),
        ScanMessage::UrlOpened { url, .. } => println!("[open] {url}"),
        ScanMessage::Notice { notice, detail } => match detail {
            Some(d) => println!("[notice] {notice} ({d})"),
            None => println!("[notice] {notice}"),
        },
        ScanMessage::OverlayUpdated { .. } => {
            if let Ok(json) = serde_json::to_string(msg) {
                tracing::debug!(event = %json, "overlay updated");
            }
        }
    }
}
