//! Command-line front end.
//!
//! Every command maps onto one client call and prints the result as
//! pretty-printed JSON on stdout. Diagnostics go to the log file.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::api::types::{NewComment, NewTicket, Priority, TicketFilters, TicketStatus, TicketUpdate};
use crate::api::{Navigator, TicketClient};
use crate::config::{Config, Profile};
use crate::error::{AppError, Result};
use crate::logging;

/// Command-line client for the ticketdesk REST API.
#[derive(Debug, Parser)]
#[command(name = "ticketdesk", version, about)]
pub struct Cli {
    /// Profile to use (defaults to the configured default profile).
    #[arg(short, long, global = true, env = "TICKETDESK_PROFILE")]
    pub profile: Option<String>,

    /// Override the profile's API base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session tokens.
    Login {
        /// Username (defaults to the profile's username).
        #[arg(short, long)]
        username: Option<String>,
        /// Password (read from stdin when omitted).
        #[arg(long, env = "TICKETDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Show the active profile and whether a session is stored.
    Status,
    /// Work with tickets.
    #[command(subcommand)]
    Tickets(TicketCommand),
    /// Work with ticket comments.
    #[command(subcommand)]
    Comments(CommentCommand),
    /// Show the current user's profile.
    Profile,
    /// Manage server profiles in the configuration file.
    #[command(subcommand)]
    Profiles(ProfilesCommand),
    /// Look up users.
    #[command(subcommand)]
    Users(UserCommand),
}

#[derive(Debug, Subcommand)]
pub enum TicketCommand {
    /// List tickets, optionally filtered.
    List(ListArgs),
    /// Tickets you created.
    Mine,
    /// Tickets assigned to you.
    Assigned,
    /// Show one ticket.
    Show { id: u64 },
    /// Open a new ticket.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        /// User id to assign the ticket to.
        #[arg(long)]
        assign_to: Option<u64>,
    },
    /// Change fields of a ticket.
    Update {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        #[arg(long, conflicts_with = "unassign")]
        assign_to: Option<u64>,
        #[arg(long)]
        unassign: bool,
    },
    /// Close a ticket.
    Close { id: u64 },
    /// Reopen a closed ticket (staff only).
    Reopen { id: u64 },
}

/// Filters for `tickets list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long, value_enum)]
    pub status: Option<StatusArg>,
    #[arg(long, value_enum)]
    pub priority: Option<PriorityArg>,
    #[arg(long)]
    pub assigned_to: Option<u64>,
    #[arg(long)]
    pub created_by: Option<u64>,
    /// Free-text search.
    #[arg(long)]
    pub search: Option<String>,
    /// Sort field, e.g. `-created_at`.
    #[arg(long)]
    pub ordering: Option<String>,
    /// Extra raw query parameter, repeatable.
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub extra: Vec<(String, String)>,
}

impl ListArgs {
    /// Build the query filters for these arguments.
    pub fn to_filters(&self) -> TicketFilters {
        let mut filters: TicketFilters = self.extra.iter().cloned().collect();
        if let Some(status) = self.status {
            filters = filters.status(TicketStatus::from(status).as_api_str());
        }
        if let Some(priority) = self.priority {
            filters = filters.priority(Priority::from(priority).as_api_str());
        }
        if let Some(id) = self.assigned_to {
            filters = filters.assigned_to(id);
        }
        if let Some(id) = self.created_by {
            filters = filters.created_by(id);
        }
        if let Some(search) = &self.search {
            filters = filters.search(search.clone());
        }
        if let Some(ordering) = &self.ordering {
            filters = filters.ordering(ordering.clone());
        }
        filters
    }
}

#[derive(Debug, Subcommand)]
pub enum CommentCommand {
    /// List the comments on a ticket.
    List { ticket: u64 },
    /// Comment on a ticket.
    Add {
        ticket: u64,
        content: String,
        /// Only visible to support staff.
        #[arg(long)]
        internal: bool,
    },
    /// Show one comment.
    Show { id: u64 },
    /// Delete a comment.
    Delete { id: u64 },
}

#[derive(Debug, Subcommand)]
pub enum ProfilesCommand {
    /// Show the configured profiles.
    List,
    /// Add a profile, or replace one with the same name.
    Add {
        name: String,
        /// API root, e.g. https://desk.example.com/api
        base_url: String,
        /// Username suggested at login.
        #[arg(short, long)]
        username: Option<String>,
        /// Make this the default profile.
        #[arg(long = "default")]
        make_default: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List all users.
    List,
    /// Show one user.
    Show { id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl From<StatusArg> for TicketStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Open => TicketStatus::Open,
            StatusArg::InProgress => TicketStatus::InProgress,
            StatusArg::Resolved => TicketStatus::Resolved,
            StatusArg::Closed => TicketStatus::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    Critical,
    High,
    Medium,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Critical => Priority::Critical,
            PriorityArg::High => Priority::High,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::Low => Priority::Low,
        }
    }
}

/// Parse a `KEY=VALUE` argument.
fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Tells the terminal user to log in again.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn to_login(&self) {
        info!("Login required");
        eprintln!("Session ended. Run 'ticketdesk login' to sign in again.");
    }
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    match cli.command {
        Command::Profiles(cmd) => run_profiles(config, cmd),
        command => run_with_client(&config, cli.profile.as_deref(), cli.base_url, command).await,
    }
}

async fn run_with_client(
    config: &Config,
    requested_profile: Option<&str>,
    base_url: Option<String>,
    command: Command,
) -> Result<()> {
    let mut profile: Profile = config.resolve_profile(requested_profile)?.clone();
    if let Some(url) = base_url {
        profile.base_url = url;
        profile.validate()?;
    }
    debug!(profile = %profile.name, "Resolved profile");

    let client = TicketClient::from_profile(&profile, &config.settings, Arc::new(TerminalNavigator))?;

    match command {
        Command::Login { username, password } => {
            let username = username
                .or_else(|| profile.username.clone())
                .ok_or_else(|| AppError::usage("no username given; pass --username"))?;
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            client.login(&username, &password).await?;
            print_json(&json!({"profile": profile.name, "username": username, "authenticated": true}))
        }
        Command::Logout => {
            client.logout();
            print_json(&json!({"profile": profile.name, "authenticated": false}))
        }
        Command::Status => print_json(&json!({
            "profile": profile.name,
            "base_url": client.gateway().base_url(),
            "authenticated": client.is_authenticated(),
            "token_storage": config.settings.token_storage,
            "log_directory": logging::log_directory(),
        })),
        Command::Tickets(cmd) => run_tickets(&client, cmd).await,
        Command::Comments(cmd) => run_comments(&client, cmd).await,
        Command::Profile => print_json(&client.get_my_profile().await?),
        Command::Users(UserCommand::List) => print_json(&client.get_users().await?),
        Command::Users(UserCommand::Show { id }) => print_json(&client.get_user(id).await?),
        Command::Profiles(_) => unreachable!("profile commands run without a client"),
    }
}

fn run_profiles(mut config: Config, cmd: ProfilesCommand) -> Result<()> {
    match cmd {
        ProfilesCommand::List => print_json(&json!({
            "path": Config::path()?,
            "default_profile": config.settings.default_profile,
            "profiles": config.profiles,
        })),
        ProfilesCommand::Add {
            name,
            base_url,
            username,
            make_default,
        } => {
            config.upsert_profile(Profile {
                name: name.clone(),
                base_url,
                username,
            })?;
            if make_default {
                config.settings.default_profile = Some(name.clone());
            }
            config.save()?;
            info!(profile = %name, "Profile saved");
            print_json(&json!({"saved": name, "default_profile": config.settings.default_profile}))
        }
    }
}

async fn run_tickets(client: &TicketClient, cmd: TicketCommand) -> Result<()> {
    match cmd {
        TicketCommand::List(args) => {
            let tickets = client.get_tickets(&args.to_filters()).await?;
            if tickets.has_next() {
                eprintln!(
                    "Showing {} of {} tickets; pass --filter page=N for more.",
                    tickets.items().len(),
                    tickets.total()
                );
            }
            print_json(&tickets)
        }
        TicketCommand::Mine => print_json(&client.get_my_tickets().await?),
        TicketCommand::Assigned => print_json(&client.get_assigned_tickets().await?),
        TicketCommand::Show { id } => print_json(&client.get_ticket(id).await?),
        TicketCommand::Create {
            title,
            description,
            priority,
            assign_to,
        } => {
            let ticket = NewTicket {
                priority: priority.map(Priority::from),
                assigned_to: assign_to,
                ..NewTicket::new(title, description)
            };
            print_json(&client.create_ticket(&ticket).await?)
        }
        TicketCommand::Update {
            id,
            title,
            description,
            status,
            priority,
            assign_to,
            unassign,
        } => {
            let update = TicketUpdate {
                title,
                description,
                status: status.map(TicketStatus::from),
                priority: priority.map(Priority::from),
                assigned_to: if unassign { Some(None) } else { assign_to.map(Some) },
            };
            if update.is_empty() {
                return Err(AppError::usage("nothing to update; pass at least one field"));
            }
            print_json(&client.update_ticket(id, &update).await?)
        }
        TicketCommand::Close { id } => print_json(&client.close_ticket(id).await?),
        TicketCommand::Reopen { id } => print_json(&client.reopen_ticket(id).await?),
    }
}

async fn run_comments(client: &TicketClient, cmd: CommentCommand) -> Result<()> {
    match cmd {
        CommentCommand::List { ticket } => print_json(&client.get_comments(ticket).await?),
        CommentCommand::Add {
            ticket,
            content,
            internal,
        } => {
            let comment = NewComment {
                is_internal: internal,
                ..NewComment::new(ticket, content)
            };
            print_json(&client.create_comment(&comment).await?)
        }
        CommentCommand::Show { id } => print_json(&client.get_comment(id).await?),
        CommentCommand::Delete { id } => {
            client.delete_comment(id).await?;
            print_json(&json!({"deleted": id}))
        }
    }
}

/// Prompt on stderr and read one line from stdin.
fn read_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AppError::usage("empty password"));
    }
    Ok(password)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_PATH_ENV;
    use serial_test::serial;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("department=IT").unwrap(),
            ("department".to_string(), "IT".to_string())
        );
        assert_eq!(
            parse_key_val("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_parse_login() {
        let cli = parse(&["ticketdesk", "--profile", "prod", "login", "-u", "ana"]);
        assert_eq!(cli.profile.as_deref(), Some("prod"));
        match cli.command {
            Command::Login { username, .. } => assert_eq!(username.as_deref(), Some("ana")),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_list_args_build_filters() {
        let cli = parse(&[
            "ticketdesk",
            "tickets",
            "list",
            "--status",
            "in-progress",
            "--priority",
            "high",
            "--filter",
            "department=IT",
        ]);
        let Command::Tickets(TicketCommand::List(args)) = cli.command else {
            panic!("expected tickets list");
        };
        assert_eq!(
            args.to_filters().to_query(),
            vec![
                ("department".to_string(), "IT".to_string()),
                ("priority".to_string(), "alta".to_string()),
                ("status".to_string(), "en_progreso".to_string()),
            ]
        );
    }

    #[test]
    fn test_update_assign_conflicts_with_unassign() {
        let result = Cli::try_parse_from([
            "ticketdesk",
            "tickets",
            "update",
            "3",
            "--assign-to",
            "4",
            "--unassign",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_comment_add_internal() {
        let cli = parse(&["ticketdesk", "comments", "add", "9", "Looking into it", "--internal"]);
        match cli.command {
            Command::Comments(CommentCommand::Add {
                ticket,
                content,
                internal,
            }) => {
                assert_eq!(ticket, 9);
                assert_eq!(content, "Looking into it");
                assert!(internal);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_profiles_add() {
        let cli = parse(&[
            "ticketdesk",
            "profiles",
            "add",
            "prod",
            "https://desk.example.com/api",
            "-u",
            "ana",
            "--default",
        ]);
        match cli.command {
            Command::Profiles(ProfilesCommand::Add {
                name,
                base_url,
                username,
                make_default,
            }) => {
                assert_eq!(name, "prod");
                assert_eq!(base_url, "https://desk.example.com/api");
                assert_eq!(username.as_deref(), Some("ana"));
                assert!(make_default);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_profiles_add_saves_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::env::set_var(CONFIG_PATH_ENV, &path);

        let result = run_profiles(
            Config::default(),
            ProfilesCommand::Add {
                name: "prod".to_string(),
                base_url: "https://desk.example.com/api".to_string(),
                username: None,
                make_default: true,
            },
        );
        std::env::remove_var(CONFIG_PATH_ENV);
        result.unwrap();

        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.settings.default_profile.as_deref(), Some("prod"));
        assert_eq!(
            saved.resolve_profile(None).unwrap().base_url,
            "https://desk.example.com/api"
        );
        assert!(saved.profile("default").is_some());
    }

    #[test]
    #[serial]
    fn test_profiles_add_rejects_invalid_profile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::env::set_var(CONFIG_PATH_ENV, &path);

        let result = run_profiles(
            Config::default(),
            ProfilesCommand::Add {
                name: "bad name".to_string(),
                base_url: "https://desk.example.com/api".to_string(),
                username: None,
                make_default: false,
            },
        );
        std::env::remove_var(CONFIG_PATH_ENV);

        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
