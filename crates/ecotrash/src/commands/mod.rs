//! Command dispatch: bridges CLI args -> core screens -> output formatting.

pub mod auth;
pub mod clients;
pub mod config_cmd;
pub mod entity;
pub mod locations;
pub mod managements;
pub mod util;

use ecotrash_config::{FileSessionStore, Profile};
use ecotrash_core::{CoreError, Credentials, CurrentUser, SessionContext};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Everything a backend-bound command needs.
pub struct Ctx<'a> {
    pub session: SessionContext<FileSessionStore>,
    pub profile_name: String,
    pub profile: Profile,
    pub credentials: Option<Credentials>,
    pub global: &'a GlobalOpts,
}

impl Ctx<'_> {
    /// The logged-in user, or `NotLoggedIn`.
    pub fn require_user(&self) -> Result<CurrentUser, CliError> {
        Ok(self.session.require()?)
    }

    /// Map a core error, clearing the stored session when the server
    /// rejected its token.
    pub fn fail(&self, err: CoreError) -> CliError {
        if err.is_unauthorized() && self.session.is_authenticated() {
            return self.expired();
        }
        err.into()
    }

    /// Clear the rejected session.
    pub fn expired(&self) -> CliError {
        self.session.invalidate();
        CliError::SessionExpired
    }
}

/// Dispatch a backend-bound command to its handler.
pub async fn dispatch(cmd: Command, ctx: &Ctx<'_>) -> Result<(), CliError> {
    match cmd {
        Command::Login { email } => auth::login(ctx, email).await,
        Command::Logout => auth::logout(ctx),
        Command::Whoami => auth::whoami(ctx),
        Command::Register(args) => auth::register(ctx, args).await,
        Command::Password => auth::change_password(ctx).await,
        Command::Managements(args) => managements::handle(ctx, args).await,
        Command::Locations(args) => locations::handle(ctx, args).await,
        Command::Clients(args) => clients::handle(ctx, args).await,
        // Handled before a session exists
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
