mod cli;
mod commands;
mod config;
mod error;
mod output;
mod prompt;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ecotrash_config::FileSessionStore;
use ecotrash_core::SessionContext;

use crate::cli::{Cli, Command};
use crate::commands::Ctx;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // No backend needed
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "ecotrash", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let resolved = config::resolve(&cli.global)?;
            let api = Arc::new(resolved.api.build_client()?);
            let session = SessionContext::new(api, FileSessionStore::new());
            session.init();

            let ctx = Ctx {
                session,
                profile_name: resolved.profile_name,
                profile: resolved.profile,
                credentials: resolved.api.credentials,
                global: &cli.global,
            };

            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, &ctx).await
        }
    }
}
