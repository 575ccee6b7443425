//! Clap derive structures for the `skillbridge` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// skillbridge -- community skill exchange from the command line
#[derive(Debug, Parser)]
#[command(
    name = "skillbridge",
    version,
    about = "Browse opportunities, notifications, and chat from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "SKILLBRIDGE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend base URL (overrides profile)
    #[arg(long, short = 'b', env = "SKILLBRIDGE_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Backend API key
    #[arg(long, env = "SKILLBRIDGE_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Acting user id (overrides profile)
    #[arg(long, short = 'u', env = "SKILLBRIDGE_USER_ID", global = true)]
    pub user_id: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SKILLBRIDGE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, env = "SKILLBRIDGE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Browse active opportunities
    #[command(alias = "opps", alias = "o")]
    Opportunities(OpportunitiesArgs),

    /// View the recent community activity feed
    #[command(alias = "act")]
    Activities(ActivitiesArgs),

    /// Manage your notifications
    #[command(alias = "notif", alias = "n")]
    Notifications(NotificationsArgs),

    /// Search members by name
    Search(SearchArgs),

    /// Send a connection request to another member
    Connect(ConnectArgs),

    /// Read and send chat messages
    Chat(ChatArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OPPORTUNITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct OpportunitiesArgs {
    #[command(subcommand)]
    pub command: OpportunitiesCommand,
}

#[derive(Debug, Subcommand)]
pub enum OpportunitiesCommand {
    /// List active opportunities (completed ones are filtered out)
    #[command(alias = "ls")]
    List {
        /// Max results to show
        #[arg(long, short = 'l', default_value = "25")]
        limit: usize,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,
    },

    /// Watch the board live, printing changes as they arrive
    Watch,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ACTIVITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ActivitiesArgs {
    #[command(subcommand)]
    pub command: ActivitiesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ActivitiesCommand {
    /// Show the recent activity feed (newest first)
    #[command(alias = "ls")]
    List,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  NOTIFICATIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// List your notifications
    #[command(alias = "ls")]
    List {
        /// Only show unread notifications
        #[arg(long)]
        unread: bool,
    },

    /// Mark one notification as read
    MarkRead {
        /// Notification id
        id: String,
    },

    /// Mark every notification as read
    MarkAllRead,

    /// Delete a notification
    Dismiss {
        /// Notification id
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SEARCH / CONNECT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Name fragment to search for (2 characters minimum)
    pub term: String,
}

#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// The member to send the request to
    pub recipient_id: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CHAT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[command(subcommand)]
    pub command: ChatCommand,
}

#[derive(Debug, Subcommand)]
pub enum ChatCommand {
    /// Show a room's transcript (oldest first)
    History {
        /// Room id
        room: String,

        /// Max messages to show
        #[arg(long, short = 'l', default_value = "50")]
        limit: u32,
    },

    /// Send a message to a room
    Send {
        /// Room id
        room: String,

        /// Message text
        message: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Print the config file path
    Path,
}
