mod config;
mod render;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    AdminDashboard, DeleteOutcome, EventsApi, HttpEventsClient, JsonFileStore, KeyValueStore,
    Notice, RegisterOutcome, StudentDashboard,
};
use shared::{domain::EventId, protocol::EventDraft};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(name = "campus", about = "Campus events dashboards")]
struct Cli {
    /// Overrides the configured API base URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Config file; defaults to ./campus.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Admin(AdminCommand),
    #[command(subcommand)]
    Student(StudentCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    List,
    Create(CreateArgs),
    Edit {
        id: i64,
        #[command(flatten)]
        changes: EditArgs,
    },
    Delete {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    Registrations {
        id: i64,
    },
    Stats,
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: String,
    /// YYYY-MM-DD
    #[arg(long)]
    date: String,
    /// HH:MM
    #[arg(long)]
    time: String,
    #[arg(long)]
    location: String,
    #[arg(long = "link")]
    registration_link: String,
}

#[derive(Args, Debug, Default)]
struct EditArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    time: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long = "link")]
    registration_link: Option<String>,
}

impl EditArgs {
    fn changes(self) -> Vec<(&'static str, String)> {
        [
            ("title", self.title),
            ("description", self.description),
            ("date", self.date),
            ("time", self.time),
            ("location", self.location),
            ("registration_link", self.registration_link),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

impl From<CreateArgs> for EventDraft {
    fn from(args: CreateArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            date: args.date,
            time: args.time,
            location: args.location,
            registration_link: args.registration_link,
        }
    }
}

#[derive(Subcommand, Debug)]
enum StudentCommand {
    List,
    Register { id: i64 },
    Whoami,
    Logout,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        settings.api_base_url = config::normalize_base_url(&url);
    }
    info!(api_base_url = %settings.api_base_url, "campus client starting");

    let api: Arc<dyn EventsApi> = Arc::new(
        HttpEventsClient::with_timeout(settings.api_base_url.clone(), settings.request_timeout())
            .context("failed to build http client")?,
    );

    match cli.command {
        Command::Admin(command) => run_admin(api, command).await.map(|()| ExitCode::SUCCESS),
        Command::Student(command) => run_student(api, &settings, command).await,
    }
}

async fn run_admin(api: Arc<dyn EventsApi>, command: AdminCommand) -> Result<()> {
    let dashboard = AdminDashboard::new(api);
    let result = admin_command(&dashboard, command).await;
    print_notices(dashboard.take_notices().await);
    result
}

async fn admin_command(dashboard: &AdminDashboard, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::List => {
            dashboard.refresh().await.context("failed to load events")?;
            print!(
                "{}",
                render::render_events(&dashboard.events().await, render::ADMIN_PREVIEW_CHARS)
            );
        }
        AdminCommand::Create(args) => {
            dashboard.open_create_form().await;
            let created = dashboard
                .create_event(args.into())
                .await
                .context("failed to create event")?;
            match created {
                Some(event) => println!("created event #{} {}", event.id, event.title),
                None => println!("event created"),
            }
        }
        AdminCommand::Edit { id, changes } => {
            let id = EventId(id);
            let changes = changes.changes();
            if changes.is_empty() {
                bail!("nothing to change; pass at least one field flag");
            }
            dashboard.refresh().await.context("failed to load events")?;
            dashboard.begin_edit(id).await?;
            for (name, value) in changes {
                dashboard.edit_field(name, value).await?;
            }
            dashboard
                .submit_edit()
                .await
                .with_context(|| format!("failed to update event {id}"))?;
            println!("updated event #{id}");
        }
        AdminCommand::Delete { id, yes } => {
            let id = EventId(id);
            dashboard.refresh().await.context("failed to load events")?;
            let outcome = dashboard
                .delete_event(id, |event| {
                    yes || confirm(&format!(
                        "Delete '{}'?",
                        event.map_or_else(|| format!("event #{id}"), |e| e.title.clone())
                    ))
                })
                .await
                .with_context(|| format!("failed to delete event {id}"))?;
            match outcome {
                DeleteOutcome::Deleted => println!("deleted event #{id}"),
                DeleteOutcome::Cancelled => println!("cancelled"),
            }
        }
        AdminCommand::Registrations { id } => {
            let id = EventId(id);
            dashboard.refresh().await.context("failed to load events")?;
            dashboard.view_registrations(id).await?;
            let panel = dashboard.registrations_panel().await;
            if let Some(event) = &panel.selected {
                print!("{}", render::render_registrations(event, &panel.registrations));
            }
        }
        AdminCommand::Stats => {
            dashboard.refresh().await.context("failed to load events")?;
            let totals = dashboard.registration_totals().await;
            print!("{}", render::render_stats(&totals.stats));
            if totals.is_partial() {
                let ids: Vec<String> = totals.failed.iter().map(ToString::to_string).collect();
                bail!(
                    "total registrations is incomplete; could not load events {}",
                    ids.join(", ")
                );
            }
        }
    }
    Ok(())
}

async fn run_student(
    api: Arc<dyn EventsApi>,
    settings: &Settings,
    command: StudentCommand,
) -> Result<ExitCode> {
    let store_path = settings.store_path()?;
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(store_path.clone()));
    let dashboard = StudentDashboard::open(api, store, &settings.identity_profile())
        .with_context(|| format!("failed to open identity store '{}'", store_path.display()))?;

    let result = match command {
        StudentCommand::List => match dashboard.load_events().await {
            Ok(_) => {
                print!(
                    "{}",
                    render::render_events(&dashboard.events().await, render::STUDENT_PREVIEW_CHARS)
                );
                Ok(ExitCode::SUCCESS)
            }
            Err(err) => Err(anyhow::Error::new(err).context("failed to load events")),
        },
        StudentCommand::Register { id } => {
            let outcome = dashboard.register(EventId(id)).await;
            register_exit_code(&outcome, EventId(id))
        }
        StudentCommand::Whoami => {
            let identity = dashboard.identity();
            println!("username:   {}", identity.username);
            println!("email:      {}", identity.email);
            println!("department: {}", identity.department);
            Ok(ExitCode::SUCCESS)
        }
        StudentCommand::Logout => dashboard
            .logout()
            .context("failed to clear session")
            .map(|()| {
                println!("logged out");
                ExitCode::SUCCESS
            }),
    };

    print_notices(dashboard.take_notices().await);
    result
}

/// A failed registration has already been reported through its notice, so it
/// only sets the exit status.
fn register_exit_code(outcome: &RegisterOutcome, id: EventId) -> Result<ExitCode> {
    match outcome {
        RegisterOutcome::Registered(_) => Ok(ExitCode::SUCCESS),
        RegisterOutcome::Failed { .. } => Ok(ExitCode::FAILURE),
        RegisterOutcome::AlreadyInFlight => {
            bail!("registration for event {id} already in progress")
        }
    }
}

fn print_notices(notices: Vec<Notice>) {
    for notice in notices {
        if notice.is_error() {
            eprintln!("{notice}");
        } else {
            println!("{notice}");
        }
    }
}

fn confirm(prompt: &str) -> bool {
    print!("{prompt} [y/N] ");
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
