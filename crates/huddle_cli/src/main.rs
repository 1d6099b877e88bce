//! Command-line boundary over the scheduling core.
//!
//! # Responsibility
//! - Open the SQLite database and wire the reference adapters into
//!   `SchedulingService`.
//! - Resolve the acting user from `--as <email>` and print results as JSON.
//!
//! Times are Unix epoch milliseconds.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use huddle_core::db::open_db;
use huddle_core::directory::normalize_email;
use huddle_core::{
    core_version, default_log_level, init_logging, MeetingDraft, MeetingPatch, SchedulingService,
    SqliteMeetingRepository, SqliteUserDirectory, UserDirectory, UserId,
};
use log::info;
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Schedule meetings without double-booking anyone")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "HUDDLE_DB", default_value = "huddle.db", global = true)]
    db: PathBuf,

    /// Email of the acting user
    #[arg(long = "as", value_name = "EMAIL", global = true)]
    actor: Option<String>,

    /// Directory for rotated log files; logging is off when omitted
    #[arg(long, env = "HUDDLE_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user in the directory
    UserAdd {
        email: String,
        name: String,
    },
    /// Print the core version
    Version,
    #[command(flatten)]
    Scheduling(SchedulingCommand),
}

/// Commands run on behalf of the `--as` user.
#[derive(Subcommand)]
enum SchedulingCommand {
    /// Search other users by email or name
    Users {
        query: String,

        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Propose a meeting organized by the acting user
    Create {
        title: String,

        #[arg(short, long)]
        start: i64,

        #[arg(short, long)]
        end: i64,

        #[arg(long)]
        description: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        /// Attendee emails, comma separated or repeated
        #[arg(short, long, value_delimiter = ',')]
        invite: Vec<String>,
    },
    /// Edit a meeting the acting user organizes
    Update {
        id: Uuid,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        start: Option<i64>,

        #[arg(short, long)]
        end: Option<i64>,

        /// Empty string clears the description
        #[arg(long)]
        description: Option<String>,

        /// Empty string clears the location
        #[arg(short, long)]
        location: Option<String>,

        /// Replaces the whole attendee roster
        #[arg(short, long, value_delimiter = ',', conflicts_with = "clear_invites")]
        invite: Option<Vec<String>>,

        /// Removes every attendee
        #[arg(long)]
        clear_invites: bool,
    },
    /// Accept or decline an invitation
    Respond {
        id: Uuid,

        /// accepted|declined
        status: String,
    },
    /// Delete a meeting the acting user organizes
    Delete { id: Uuid },
    /// Show one meeting
    Show { id: Uuid },
    /// List meetings the acting user organizes or is invited to
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        start_logging(log_dir, cli.log_level.as_deref())?;
    }

    let command = match cli.command {
        Commands::Version => {
            println!("huddle_core version={}", core_version());
            return Ok(());
        }
        Commands::UserAdd { email, name } => {
            let conn = open(&cli.db)?;
            let user = SqliteUserDirectory::new(&conn).register_user(&email, &name)?;
            info!("event=cli_user_add module=cli status=ok user_id={}", user.id);
            return print_json(&user);
        }
        Commands::Scheduling(command) => command,
    };

    let conn = open(&cli.db)?;
    let actor = resolve_actor(&SqliteUserDirectory::new(&conn), cli.actor.as_deref())?;
    let service = SchedulingService::new(
        SqliteMeetingRepository::try_new(&conn)?,
        SqliteUserDirectory::new(&conn),
    );

    match command {
        SchedulingCommand::Users { query, limit } => {
            print_json(&service.search_users(actor, &query, limit)?)
        }
        SchedulingCommand::Create {
            title,
            start,
            end,
            description,
            location,
            invite,
        } => {
            let draft = MeetingDraft {
                title,
                description,
                start_at: start,
                end_at: end,
                location,
                attendee_emails: invite,
            };
            print_json(&service.create(&draft, actor)?)
        }
        SchedulingCommand::Update {
            id,
            title,
            start,
            end,
            description,
            location,
            invite,
            clear_invites,
        } => {
            let patch = MeetingPatch {
                title,
                description,
                start_at: start,
                end_at: end,
                location,
                attendee_emails: if clear_invites {
                    Some(Vec::new())
                } else {
                    invite
                },
            };
            print_json(&service.update(id, &patch, actor)?)
        }
        SchedulingCommand::Respond { id, status } => {
            print_json(&service.respond_with_status(id, actor, &status)?)
        }
        SchedulingCommand::Delete { id } => {
            service.delete(id, actor)?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        SchedulingCommand::Show { id } => print_json(&service.get(id, actor)?),
        SchedulingCommand::List => print_json(&service.list(actor)?),
    }
}

fn open(path: &Path) -> Result<Connection> {
    open_db(path).with_context(|| format!("failed to open database `{}`", path.display()))
}

fn start_logging(log_dir: &Path, level: Option<&str>) -> Result<()> {
    let log_dir = if log_dir.is_absolute() {
        log_dir.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to resolve current directory")?
            .join(log_dir)
    };
    let log_dir = log_dir
        .to_str()
        .ok_or_else(|| anyhow!("log directory is not valid UTF-8: {}", log_dir.display()))?;
    init_logging(level.unwrap_or_else(|| default_log_level()), log_dir).map_err(|err| anyhow!(err))
}

fn resolve_actor(directory: &SqliteUserDirectory<'_>, email: Option<&str>) -> Result<UserId> {
    let email = email.ok_or_else(|| anyhow!("this command needs the acting user: --as <EMAIL>"))?;
    let email = normalize_email(email)?;
    let user = directory
        .resolve_by_emails(std::slice::from_ref(&email))?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("unknown user: {email}"))?;
    Ok(user.id)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
