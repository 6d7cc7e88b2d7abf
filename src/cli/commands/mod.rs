pub mod auth;
pub mod board;
pub mod clients;
pub mod lookup;
pub mod settings;

use std::sync::Arc;
use tracing::debug;

use crate::auth::{display_name, AuthManager, Navigation, Route, Session, SessionGate, SessionStore};
use crate::cli::{BoardAction, ClientsAction, Commands};
use crate::config::ClientBoardConfig;
use crate::errors::AppError;
use crate::lookup::{CnpjWsLookup, DocumentLookup};
use crate::remote::{Backend, RemoteStore, RestBackend};

/// Everything a command needs to reach the remote service and the local session
pub struct AppContext {
    config: ClientBoardConfig,
    backend: Arc<dyn Backend>,
    lookup: Arc<dyn DocumentLookup>,
}

/// A command running on behalf of a signed-in user
pub struct SignedIn {
    pub session: Session,
    pub store: Arc<dyn RemoteStore>,
}

impl AppContext {
    pub fn from_config(config: ClientBoardConfig) -> Result<Self, AppError> {
        let backend = RestBackend::from_config(&config)?;
        let lookup = CnpjWsLookup::from_config(&config)?;
        Ok(Self::with_parts(config, Arc::new(backend), Arc::new(lookup)))
    }

    pub fn with_parts(
        config: ClientBoardConfig,
        backend: Arc<dyn Backend>,
        lookup: Arc<dyn DocumentLookup>,
    ) -> Self {
        Self {
            config,
            backend,
            lookup,
        }
    }

    pub fn config(&self) -> &ClientBoardConfig {
        &self.config
    }

    pub fn lookup(&self) -> &dyn DocumentLookup {
        self.lookup.as_ref()
    }

    fn session_store(&self) -> SessionStore {
        SessionStore::new(self.config.session.path.clone())
    }

    pub fn auth(&self) -> AuthManager {
        AuthManager::new(self.backend.clone(), self.session_store())
    }

    pub fn gate(&self) -> SessionGate {
        SessionGate::new(self.session_store())
    }

    /// Pass the session gate for `route` and scope table access to the user
    pub async fn signed_in(&self, route: Route) -> Result<SignedIn, AppError> {
        let session = self.gate().guard(route).await?;
        let store = self.backend.with_session(&session.access_token);
        Ok(SignedIn { session, store })
    }

    /// Name recorded as the approver; falls back to the e-mail when the
    /// profile cannot be read
    pub async fn actor_name(&self, signed_in: &SignedIn) -> String {
        let user = &signed_in.session.user;
        match signed_in.store.get_profile(user.id).await {
            Ok(profile) => display_name(profile.as_ref(), user),
            Err(err) => {
                debug!(error = %err, "Profile unavailable, using account e-mail");
                display_name(None, user)
            }
        }
    }
}

/// Run one subcommand. `settings` works without remote credentials, every
/// other command needs them.
pub async fn dispatch(command: Commands, config: ClientBoardConfig) -> Result<(), AppError> {
    if let Commands::Settings { save } = command {
        return settings::SettingsCommand::new(config)
            .with_save_path(save)
            .execute();
    }
    let ctx = AppContext::from_config(config)?;
    run(command, &ctx).await
}

pub async fn run(command: Commands, ctx: &AppContext) -> Result<(), AppError> {
    match command {
        Commands::Login { email, password } => {
            auth::LoginCommand::new(email, password).execute(ctx).await
        }
        Commands::Register {
            username,
            email,
            password,
            confirm_password,
        } => {
            auth::RegisterCommand::new(username, email, password, confirm_password)
                .execute(ctx)
                .await
        }
        Commands::Logout => auth::LogoutCommand.execute(ctx).await,
        Commands::Whoami => auth::WhoamiCommand.execute(ctx).await,
        Commands::Open { path } => open(ctx, &path).await,
        Commands::Clients { action } => match action {
            ClientsAction::List { search, status } => {
                clients::ListCommand::new()
                    .with_search(search)
                    .with_status(status)
                    .execute(ctx)
                    .await
            }
            ClientsAction::Show { id } => clients::ShowCommand::new(id).execute(ctx).await,
            ClientsAction::Add(fields) => clients::AddCommand::new(fields).execute(ctx).await,
            ClientsAction::Edit {
                id,
                fields,
                clear_contacts,
            } => {
                clients::EditCommand::new(id, fields)
                    .with_clear_contacts(clear_contacts)
                    .execute(ctx)
                    .await
            }
            ClientsAction::Delete { id, yes } => {
                clients::DeleteCommand::new(id)
                    .with_confirmation(yes)
                    .execute(ctx)
                    .await
            }
            ClientsAction::Status { id, status, yes } => {
                clients::StatusCommand::new(id, status)
                    .with_confirmation(yes)
                    .execute(ctx)
                    .await
            }
        },
        Commands::Board { action } => {
            board::BoardCommand::new(action.unwrap_or(BoardAction::Show))
                .execute(ctx)
                .await
        }
        Commands::Lookup { cnpj } => lookup::LookupCommand::new(cnpj).execute(ctx).await,
        Commands::Settings { save } => settings::SettingsCommand::new(ctx.config().clone())
            .with_save_path(save)
            .execute(),
    }
}

/// Follow the session gate for `path` and show the page it lands on
async fn open(ctx: &AppContext, path: &str) -> Result<(), AppError> {
    let route = match ctx.gate().resolve(path).await? {
        Navigation::Render(route) => route,
        Navigation::Redirect(route) => {
            println!("↪️  {path} redirects to {}", route.path());
            println!();
            route
        }
    };

    match route {
        Route::Auth => {
            show_sign_in_help();
            Ok(())
        }
        Route::Board => board::BoardCommand::new(BoardAction::Show).execute(ctx).await,
        Route::Clients => clients::ListCommand::new().execute(ctx).await,
        Route::Settings => settings::SettingsCommand::new(ctx.config().clone()).execute(),
    }
}

pub fn show_sign_in_help() {
    println!("🔑 CLIENT BOARD - Sign in");
    println!("=========================");
    println!();
    println!("📋 Sign in:        client-board login --email you@example.com --password ...");
    println!("🆕 New account:    client-board register --username Ana --email ... --password ... --confirm-password ...");
}

/// Overview shown when no subcommand is given
pub fn show_overview() {
    println!("📇 CLIENT BOARD - Registry and approvals");
    println!("=======================================");
    println!();
    println!("🔑 ACCOUNT:");
    println!("   client-board login --email you@example.com");
    println!("   client-board whoami");
    println!();
    println!("🏢 CLIENTS:");
    println!("   client-board clients list [--search text] [--status active]");
    println!("   client-board clients add --code C-001 --document 11.222.333/0001-81 --lookup");
    println!("   client-board clients status <id> blocked --yes");
    println!();
    println!("📋 APPROVAL BOARD:");
    println!("   client-board board show");
    println!("   client-board board confirm <approval-id>");
    println!("   client-board board move <approval-id> cancelled");
    println!();
    println!("⚙️  client-board settings");
}
