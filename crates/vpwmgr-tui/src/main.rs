//! vpwmgr - Terminal UI for a Vault-backed password manager
//!
//! Built with Ratatui and crossterm.

mod app;
mod config;
mod handlers;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vpwmgr_core::{MemoryStore, PasswordManager, SecretStore, VaultClient};

use app::{App, AppState};
use config::Config;

/// vpwmgr - manage personal and team passwords stored in Vault
#[derive(Parser, Debug)]
#[command(name = "vpwmgr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Vault address (overrides config and VAULT_ADDR)
    #[arg(long, value_name = "URL")]
    vault_addr: Option<String>,

    /// Vault id to pre-fill on the login screen
    #[arg(short, long)]
    user: Option<String>,

    /// Run against built-in demo data instead of a Vault server
    #[arg(long)]
    demo: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vpwmgr=info".parse()?))
        .with_writer(std::io::stderr) // Write logs to stderr to not interfere with TUI
        .init();

    let mut config = Config::load(args.config)?;

    if let Ok(addr) = std::env::var("VAULT_ADDR") {
        tracing::info!("Using VAULT_ADDR from environment: {}", addr);
        config.store.vault_addr = addr;
    }
    if let Some(addr) = args.vault_addr {
        tracing::info!("Overriding Vault address from CLI: {}", addr);
        config.store.vault_addr = addr;
    }
    if args.user.is_some() {
        config.default_user = args.user;
    }

    if args.demo {
        tracing::info!("Starting vpwmgr with demo data (login psparks / pw)");
        run(PasswordManager::new(MemoryStore::demo()), &config)
    } else {
        tracing::info!("Starting vpwmgr against {}", config.store.vault_addr);
        let client = VaultClient::new(&config.store).context("Failed to create Vault client")?;
        run(PasswordManager::new(client), &config)
    }
}

fn run<S: SecretStore>(manager: PasswordManager<S>, config: &Config) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(manager, config);

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

fn run_app<B: Backend, S: SecretStore>(terminal: &mut Terminal<B>, app: &mut App<S>) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if handlers::handle_key(app, key) {
                    break;
                }
            }
        }

        if matches!(app.state, AppState::Quit) {
            break;
        }
    }

    Ok(())
}
