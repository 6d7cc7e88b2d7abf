pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::{ClientStatus, Contact, DocumentType};

#[derive(Parser)]
#[command(name = "client-board")]
#[command(about = "Client registry and approval board for a small business")]
#[command(version)]
pub struct Cli {
    /// Log level filter (overrides observability.log_level)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit JSON log lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with e-mail and password
    Login {
        #[arg(long, help = "Account e-mail")]
        email: String,
        #[arg(
            long,
            env = "CLIENT_BOARD_PASSWORD",
            hide_env_values = true,
            help = "Account password"
        )]
        password: String,
    },
    /// Create an account; the first profile is an administrator
    Register {
        #[arg(long, help = "Name shown in the dashboard header")]
        username: String,
        #[arg(long, help = "Account e-mail")]
        email: String,
        #[arg(
            long,
            env = "CLIENT_BOARD_PASSWORD",
            hide_env_values = true,
            help = "Password (at least 6 characters)"
        )]
        password: String,
        #[arg(long, help = "Repeat the password")]
        confirm_password: String,
    },
    /// Sign out and remove the local session
    Logout,
    /// Show who is signed in
    Whoami,
    /// Resolve a dashboard path through the session gate and open that page
    Open {
        /// e.g. /dashboard, /dashboard/clients, /auth
        #[arg(default_value = "/dashboard")]
        path: String,
    },
    /// Manage the client registry
    Clients {
        #[command(subcommand)]
        action: ClientsAction,
    },
    /// Work the approval board
    Board {
        #[command(subcommand)]
        action: Option<BoardAction>,
    },
    /// Look up a CNPJ in the public registry
    Lookup {
        /// CNPJ, masked or bare digits
        cnpj: String,
    },
    /// Show the effective configuration
    Settings {
        #[arg(long, help = "Write the effective configuration to this TOML file")]
        save: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ClientsAction {
    /// List clients ordered by code
    List {
        #[arg(long, help = "Match trade name, code, document or legal name")]
        search: Option<String>,
        #[arg(long, help = "Only clients in this status")]
        status: Option<ClientStatus>,
    },
    /// Show one client with contacts and status options
    Show { id: Uuid },
    /// Register a new client
    Add(ClientArgs),
    /// Edit an existing client; omitted fields keep their value
    Edit {
        id: Uuid,
        #[command(flatten)]
        fields: ClientArgs,
        #[arg(long, help = "Remove every contact")]
        clear_contacts: bool,
    },
    /// Delete a client and its contacts
    Delete {
        id: Uuid,
        #[arg(short = 'y', long, help = "Confirm the deletion")]
        yes: bool,
    },
    /// Set a client's status (active, blocked or cancelled)
    Status {
        id: Uuid,
        status: ClientStatus,
        #[arg(short = 'y', long, help = "Confirm the change")]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ClientArgs {
    #[arg(long, help = "Unique client code")]
    pub code: Option<String>,
    #[arg(long, help = "cpf or cnpj (detected from the digit count when omitted)")]
    pub document_type: Option<DocumentType>,
    #[arg(long, help = "Document number, masked or bare digits")]
    pub document: Option<String>,
    #[arg(long, help = "Registered legal name")]
    pub legal_name: Option<String>,
    #[arg(long, help = "Trade name shown on the board")]
    pub trade_name: Option<String>,
    #[arg(long, help = "Free-form note")]
    pub note: Option<String>,
    #[arg(long = "contact", value_name = "NAME:PHONE[:ROLE]", help = "Contact; repeat for several")]
    pub contacts: Vec<Contact>,
    #[arg(long, help = "Fill legal and trade name from the public CNPJ registry")]
    pub lookup: bool,
}

#[derive(Subcommand)]
pub enum BoardAction {
    /// Show the board columns
    Show,
    /// Send a cancelled or blocked client back to "to release"
    Release { id: Uuid },
    /// Confirm release of a pending client
    Confirm { id: Uuid },
    /// Move a card one step back
    Restore { id: Uuid },
    /// Remove a released client from the board
    Clear { id: Uuid },
    /// Move a card to another column
    Move { id: Uuid, status: ClientStatus },
}
