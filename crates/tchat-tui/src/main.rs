//! tchat entry point.

use std::{
    fs::OpenOptions,
    io::{self, stdout},
    path::Path,
    sync::{Arc, Mutex},
};

use clap::Parser;
use tchat_app::{AppConfig, Runtime};
use tchat_client::{DemoBackend, HttpClient, JwtInspector, RedbIdentityStore, SystemEnv};
use tchat_core::{Auth, Messaging};
use tchat_tui::{Backend, Cli, CliCommand, CliError, Config, TerminalDriver, cli};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    let config = Config::from_cli(&args)?;
    init_logging(&config.log_file)?;

    tracing::info!(backend = ?config.backend, db = %config.db_path.display(), "tchat starting");

    let store = Arc::new(RedbIdentityStore::open(&config.db_path)?);
    let env = SystemEnv::new();

    match args.command.unwrap_or(CliCommand::Chat) {
        CliCommand::Chat => match &config.backend {
            Backend::Demo => chat(DemoBackend::new(env), store, env, config.app).await?,
            Backend::Server(url) => {
                chat(HttpClient::new(url.as_str())?, store, env, config.app).await?;
            },
        },
        CliCommand::Send { recipient, message } => {
            let client = server_client(&config)?;
            let peer = cli::recipient(&recipient)?;
            let body = cli::message_body(message, io::stdin())?;
            let identity = cli::stored_session(store.as_ref(), &JwtInspector, &env)?;
            cli::send(&client, &identity, &peer, &body, &mut stdout()).await?;
        },
        CliCommand::Read { recipient } => {
            let client = server_client(&config)?;
            let peer = cli::recipient(&recipient)?;
            let identity = cli::stored_session(store.as_ref(), &JwtInspector, &env)?;
            cli::read(&client, &identity, &peer, &mut stdout()).await?;
        },
    }

    Ok(())
}

/// Run the interactive client against `backend` until the user quits.
async fn chat<B: Auth + Messaging>(
    backend: B,
    store: Arc<RedbIdentityStore>,
    env: SystemEnv,
    config: AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let driver = TerminalDriver::new()?;
    let mut runtime =
        Runtime::new(driver, Arc::new(backend), store, Arc::new(JwtInspector), env, config);
    runtime.run().await?;
    tracing::info!("session ended");
    Ok(())
}

fn server_client(config: &Config) -> Result<HttpClient, Box<dyn std::error::Error>> {
    match &config.backend {
        Backend::Server(url) => Ok(HttpClient::new(url.as_str())?),
        Backend::Demo => Err(CliError::NoServer.into()),
    }
}

/// Log to a file: the terminal belongs to the UI.
fn init_logging(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .init();
    Ok(())
}
