//! Glint agent entry point.
//!
//! Wires together all infrastructure services and runs until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config, API keys and system prompt   (fatal on failure)
//!  └─ install input hooks                       (fatal on failure)
//!       ├─ keyboard hook thread ─┐
//!       └─ mouse hook thread ────┴─► bounded event queue
//!  └─ spawn
//!       ├─ EventDispatcher        (Tokio task, sole queue consumer)
//!       └─ PresentResultsUseCase  (Tokio task, console output)
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use glint_agent::application::dispatch_events::{DispatcherPorts, EventDispatcher};
use glint_agent::application::present_results::PresentResultsUseCase;
use glint_agent::application::replay_text::ReplayTextUseCase;
use glint_agent::application::rotate_credentials::CredentialRotation;
use glint_agent::application::run_request::RunRequestUseCase;
use glint_agent::infrastructure::emission::platform_emitter;
use glint_agent::infrastructure::inference::gemini::GeminiProvider;
use glint_agent::infrastructure::input_capture::{
    platform_hook, EventSink, KeyboardTap, PointerListener, EVENT_QUEUE_CAPACITY,
};
use glint_agent::infrastructure::presentation::ConsolePresenter;
use glint_agent::infrastructure::screen_capture::platform_capture;
use glint_agent::infrastructure::storage::config;
use glint_core::{EmitterConfig, KeyCode, SharedKeyState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Configuration ─────────────────────────────────────────────────────────
    let cfg = config::load_config().context("failed to load configuration")?;

    // Initialise structured logging.  `RUST_LOG` wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.agent.log_level)),
        )
        .init();

    info!("Glint agent starting");
    write_default_config_if_missing(&cfg);

    let credentials = config::resolve_credentials(&cfg).context("no usable API keys")?;
    info!(count = credentials.len(), "API keys loaded");
    let system_prompt = config::load_system_prompt(&cfg).context("system prompt is required")?;
    info!(path = %cfg.agent.system_prompt_path.display(), "system prompt loaded");

    // ── Use cases ─────────────────────────────────────────────────────────────
    let provider = GeminiProvider::new(cfg.inference.gemini(), system_prompt)
        .context("failed to build HTTP client")?;
    let rotation = Arc::new(CredentialRotation::new(Arc::new(provider), credentials));
    let requests = Arc::new(RunRequestUseCase::new(platform_capture(), rotation));
    let replay = Arc::new(ReplayTextUseCase::new(
        platform_emitter(),
        EmitterConfig::with_base_wpm(cfg.agent.typing_wpm),
    ));

    // ── Input hooks ───────────────────────────────────────────────────────────
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let sink = EventSink::new(events_tx.clone());
    let pressed = SharedKeyState::new();
    let select_mode = Arc::new(AtomicBool::new(false));
    let replay_trigger = KeyCode(cfg.agent.replay_trigger_vk);

    let keyboard = Arc::new(KeyboardTap::new(pressed.clone(), sink.clone(), replay_trigger));
    let pointer = Arc::new(PointerListener::new(sink.clone(), Arc::clone(&select_mode)));
    let hook = platform_hook();
    hook.install(keyboard, pointer)
        .context("failed to install input hooks")?;
    info!("input hooks installed");

    // ── Tasks ─────────────────────────────────────────────────────────────────
    let (presentation_tx, presentation_rx) = mpsc::unbounded_channel();
    let presenter = tokio::spawn(
        PresentResultsUseCase::new(ConsolePresenter::new(std::io::stdout())).run(presentation_rx),
    );

    let ports = DispatcherPorts {
        requests,
        replay,
        presentation: presentation_tx,
        events: events_tx,
        select_mode,
    };
    let dispatcher =
        tokio::spawn(EventDispatcher::new(pressed, ports).with_drop_monitor(sink).run(events_rx));

    print_banner(replay_trigger);

    // ── Shutdown ──────────────────────────────────────────────────────────────
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown signal received");

    hook.uninstall();
    dispatcher.abort();
    let _ = dispatcher.await;
    // The dispatcher owned the last presentation sender, so the presenter
    // drains and exits on its own.
    let _ = presenter.await;

    info!("Glint agent stopped");
    Ok(())
}

fn write_default_config_if_missing(cfg: &config::AppConfig) {
    let Ok(path) = config::config_file_path() else {
        return;
    };
    if path.exists() {
        return;
    }
    match config::save_config(cfg) {
        Ok(()) => info!(path = %path.display(), "wrote default config"),
        Err(e) => tracing::warn!(error = %e, "could not write default config"),
    }
}

fn print_banner(replay_trigger: KeyCode) {
    let key = format!("Key {replay_trigger}");
    println!("Glint is running.");
    println!("  Alt + Left Click        capture the window under the cursor");
    println!("  Alt + Shift, then drag  capture a screen region");
    println!("  Alt                     dismiss the answer, abort loading or typing");
    println!("  {key:<23} type the displayed answer");
    println!("  Esc                     cancel region selection");
    println!("  Ctrl + C                quit");
}
