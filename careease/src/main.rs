//! careease: terminal client for the CareEase support assistant.
//!
//! `careease` with no subcommand opens the TUI. The account subcommands
//! (`register`, `login`, `logout`, `profile`) and the admin listings run
//! without entering the alternate screen.
//!
//! # Startup sequence
//!
//! 1. Logging to a daily file under the data dir (never stdout, the TUI owns it).
//! 2. Config from XDG, then the env and `--api-url` overrides.
//! 3. Settings store and HTTP client.
//! 4. For the TUI: `install_panic_hook()` first so it is the innermost hook,
//!    then `register_sigterm()`, `init_tui()`, the event task and the backend
//!    worker.
//!
//! `restore_tui()` runs after the event loop exits on every path. Inside the
//! loop `?` is never used; draw errors break out with the error instead.

mod app;
mod backend;
mod config;
mod event;
mod theme;
mod tui;
mod ui;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use careease_core::api::{CareApi, HttpCareApi};
use careease_core::db::SettingsStore;
use careease_core::types::{NewUser, ProfileUpdate, User};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::{AppState, TimerCommand, ToastLevel};
use crate::config::Config;
use crate::event::AppEvent;
use crate::theme::ThemeName;
use crate::ui::keybindings::{handle_key, handle_mouse, KeyAction};

#[derive(Parser)]
#[command(name = "careease", version, about = "CareEase support chat in your terminal")]
struct Cli {
    /// Backend base URL, overriding config and CAREEASE_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token.
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and store its session token.
    Register,
    /// Sign out and forget the stored token.
    Logout,
    /// Show the signed-in profile, or update it when any field is given.
    Profile {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Admin listings (admin accounts only).
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List user accounts.
    Users {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List every user's chats.
    Chats {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

fn init_logging(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "careease.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(non_blocking),
        )
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = config::data_dir();
    let _guard = init_logging(&data_dir.join("logs"))?;

    let config = Config::load().with_api_url_override(cli.api_url);
    info!(api_url = %config.api_url, "starting careease");

    let settings = SettingsStore::open(data_dir.join("settings.db"))
        .await
        .context("opening settings database")?;
    let api = HttpCareApi::new(config.api_url.clone(), config.request_timeout())
        .context("building HTTP client")?;

    match cli.command {
        Some(Commands::Login { email }) => login(&api, &settings, email).await,
        Some(Commands::Register) => register(&api, &settings).await,
        Some(Commands::Logout) => logout(&api, &settings).await,
        Some(Commands::Profile {
            first_name,
            last_name,
            username,
            email,
        }) => {
            signed_in(&api, &settings).await?;
            let fields = [first_name, last_name, username, email];
            if fields.iter().all(Option::is_none) {
                print_user(&api.profile().await?);
                return Ok(());
            }
            let [first_name, last_name, username, email] = fields;
            let update = ProfileUpdate::new(
                first_name.as_deref(),
                last_name.as_deref(),
                username.as_deref(),
                email.as_deref(),
            )?;
            let user = api.update_profile(&update).await?;
            info!(user = %user.email, "profile updated");
            println!("Profile updated.");
            print_user(&user);
            Ok(())
        }
        Some(Commands::Admin { command }) => {
            signed_in(&api, &settings).await?;
            admin(&api, command).await
        }
        None => run_tui(api, settings, &config).await,
    }
}

/// Loads the stored token into `api`.
async fn signed_in(api: &HttpCareApi, settings: &SettingsStore) -> anyhow::Result<()> {
    let token = settings
        .token()
        .await?
        .context("not signed in, run `careease login` first")?;
    api.set_token(Some(token));
    Ok(())
}

fn print_user(user: &User) {
    println!("{} <{}>", user.full_name(), user.email);
    if !user.username.is_empty() {
        println!("username: {}", user.username);
    }
    println!("role: {}", user.role.label());
}

async fn login(api: &HttpCareApi, settings: &SettingsStore, email: Option<String>) -> anyhow::Result<()> {
    let email = match email {
        Some(email) => email,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Email")
            .interact_text()?,
    };
    let password = dialoguer::Password::new()
        .with_prompt("Password")
        .allow_empty_password(false)
        .interact()?;

    let (token, user) = api.login(email.trim(), &password).await?;
    settings.set_token(&token).await?;
    info!(user = %user.email, "signed in");
    println!(
        "Signed in as {} {} ({}).",
        user.first_name, user.last_name, user.email
    );
    Ok(())
}

async fn register(api: &HttpCareApi, settings: &SettingsStore) -> anyhow::Result<()> {
    let prompt = |label: &str| {
        dialoguer::Input::<String>::new()
            .with_prompt(label)
            .interact_text()
    };
    let first_name = prompt("First name")?;
    let last_name = prompt("Last name")?;
    let username = prompt("Username")?;
    let email = prompt("Email")?;
    let password = dialoguer::Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;

    let new_user = NewUser::new(&first_name, &last_name, &username, &email, &password)?;
    let (token, user) = api.register(&new_user).await?;
    settings.set_token(&token).await?;
    info!(user = %user.email, "registered");
    println!("Welcome to CareEase, {}!", user.first_name);
    Ok(())
}

async fn admin(api: &HttpCareApi, command: AdminCommand) -> anyhow::Result<()> {
    match command {
        AdminCommand::Users { page } => {
            let users = api.admin_users(page).await?;
            if users.is_empty() {
                println!("No users on page {page}.");
            }
            for entry in users {
                let flag = match (entry.is_banned, entry.is_active) {
                    (true, _) => "banned",
                    (false, false) => "inactive",
                    (false, true) => "active",
                };
                let last_login = entry
                    .last_login
                    .map_or_else(|| "never".to_owned(), |t| t.format("%Y-%m-%d").to_string());
                println!(
                    "{:<26} {:<32} {:<6} {:<8} last login {}",
                    entry.user.full_name(),
                    entry.user.email,
                    entry.user.role.label(),
                    flag,
                    last_login
                );
            }
        }
        AdminCommand::Chats { page } => {
            let chats = api.admin_chats(page).await?;
            if chats.is_empty() {
                println!("No chats on page {page}.");
            }
            for chat in chats {
                let owner = chat
                    .owner
                    .as_ref()
                    .map_or_else(|| "unknown".to_owned(), |o| o.label());
                let rating = chat
                    .review
                    .as_ref()
                    .map_or_else(|| "-".to_owned(), |r| format!("{}/5", r.rating));
                let title = if chat.title.is_empty() {
                    "Untitled"
                } else {
                    chat.title.as_str()
                };
                println!(
                    "{:<30} {:<28} {:<10} {:<8} {:<9} {}",
                    title,
                    owner,
                    chat.category.label(),
                    chat.priority.label(),
                    chat.status.label(),
                    rating
                );
            }
        }
    }
    Ok(())
}

async fn logout(api: &HttpCareApi, settings: &SettingsStore) -> anyhow::Result<()> {
    if let Some(token) = settings.token().await? {
        api.set_token(Some(token));
        if let Err(e) = api.logout().await {
            warn!(error = %e, "server logout failed, forgetting token anyway");
        }
    }
    settings.clear_token().await?;
    println!("Signed out.");
    Ok(())
}

async fn run_tui(api: HttpCareApi, settings: SettingsStore, config: &Config) -> anyhow::Result<()> {
    let stored = settings.load().await.unwrap_or_else(|e| {
        warn!(error = %e, "could not read settings, starting signed out");
        Default::default()
    });
    let signed_in = stored.token.is_some();
    api.set_token(stored.token);
    let theme_name = ThemeName::parse(stored.theme.as_deref().unwrap_or(&config.theme));

    let mut state = AppState::new(theme_name, config.poll_interval());
    if !signed_in {
        state.signed_in = false;
        state.notify(
            ToastLevel::Error,
            "Not signed in. Quit and run `careease login` first.",
        );
    }

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let tx = handler.tx;
    let mut rx = handler.rx;

    let (api_tx, api_rx) = mpsc::unbounded_channel();
    let api: Arc<dyn CareApi> = Arc::new(api);
    tokio::spawn(backend::worker::worker_loop(api, settings, api_rx, tx.clone()));
    state.api_tx = Some(api_tx);
    if signed_in {
        state.load_initial();
    }

    let mut reveal_timer: Option<JoinHandle<()>> = None;
    let reveal_interval = config.reveal_interval();
    let mut result: anyhow::Result<()> = Ok(());

    'event_loop: loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
            maybe_event = rx.recv() => {
                match maybe_event {
                    Some(AppEvent::Render) => {
                        if let Err(e) = terminal.draw(|frame| ui::render(frame, &mut state)) {
                            result = Err(e.into());
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Key(key)) => {
                        if handle_key(key, &mut state) == KeyAction::Quit {
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Mouse(mouse)) => {
                        if handle_mouse(mouse, &mut state) == KeyAction::Quit {
                            break 'event_loop;
                        }
                    }
                    Some(AppEvent::Tick) => state.on_tick(Instant::now(), Utc::now()),
                    Some(AppEvent::RevealTick(token)) => state.on_reveal_tick(token),
                    Some(AppEvent::Backend(response)) => state.apply_response(*response),
                    Some(AppEvent::Resize(_, _)) => {}
                    Some(AppEvent::Quit) | None => break 'event_loop,
                }

                match state.take_timer_command() {
                    Some(TimerCommand::Start { token, ticks }) => {
                        if let Some(old) = reveal_timer.take() {
                            old.abort();
                        }
                        reveal_timer = Some(event::spawn_reveal_timer(
                            tx.clone(),
                            token,
                            ticks,
                            reveal_interval,
                        ));
                    }
                    Some(TimerCommand::Stop) => {
                        if let Some(old) = reveal_timer.take() {
                            old.abort();
                        }
                    }
                    None => {}
                }

                if term_flag.load(Ordering::Relaxed) {
                    break 'event_loop;
                }
            }
        }
    }

    if let Some(timer) = reveal_timer.take() {
        timer.abort();
    }
    tui::restore_tui()?;
    info!("careease exited");
    result
}
