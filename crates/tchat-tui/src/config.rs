//! Command line and configuration.
//!
//! Flags fall back to environment variables, so a shell profile can point the
//! client at a server once. [`Config::from_cli`] validates everything up front;
//! nothing downstream re-checks.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use tchat_app::AppConfig;
use thiserror::Error;

/// tchat terminal chat client
#[derive(Parser, Debug)]
#[command(name = "tchat")]
#[command(about = "Terminal chat client")]
#[command(version)]
pub struct Cli {
    /// Server base URL (e.g. `http://localhost:8080`)
    ///
    /// If not provided, the chat runs against an offline in-process demo
    /// server (log in as demo/demo).
    #[arg(short, long, env = "TCHAT_SERVER_URL", global = true)]
    pub server: Option<String>,

    /// Path of the local identity database
    #[arg(long, env = "TCHAT_DB_PATH", default_value = "tchat.redb", global = true)]
    pub db: PathBuf,

    /// Seconds between polls for new messages (0 disables polling)
    #[arg(long, default_value_t = 5)]
    pub poll_interval_secs: u64,

    /// Seconds after which a pending request may be cancelled with Ctrl+X
    #[arg(long, default_value_t = 15)]
    pub stale_after_secs: u64,

    /// Log file (the terminal belongs to the UI)
    #[arg(long, default_value = "tchat.log", global = true)]
    pub log_file: PathBuf,

    /// What to do. Defaults to `chat`.
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Open the interactive chat
    Chat,
    /// Send a direct message, e.g. `tchat send @bob "hi"`
    Send {
        /// Recipient username, with or without a leading `@`
        recipient: String,
        /// Message text. Read from stdin when omitted.
        message: Option<String>,
    },
    /// Print the last message exchanged with a user
    Read {
        /// Username, with or without a leading `@`
        recipient: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Server URL is not an http(s) URL with a host.
    #[error("invalid server URL {0:?}: expected http://host[:port]")]
    InvalidServerUrl(String),

    /// A zero stale threshold would mark every request stale at once.
    #[error("--stale-after-secs must be at least 1")]
    ZeroStaleAfter,

    /// A required path is empty.
    #[error("{0} path must not be empty")]
    EmptyPath(&'static str),
}

/// Where requests go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Offline in-process demo server.
    Demo,
    /// tchat HTTP server at this base URL.
    Server(String),
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Request target.
    pub backend: Backend,
    /// Identity database.
    pub db_path: PathBuf,
    /// Log destination.
    pub log_file: PathBuf,
    /// Session timing.
    pub app: AppConfig,
}

impl Config {
    /// Validate parsed command line arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let backend = match cli.server.as_deref().map(str::trim) {
            None | Some("") => Backend::Demo,
            Some(url) => Backend::Server(validate_url(url)?),
        };
        if cli.stale_after_secs == 0 {
            return Err(ConfigError::ZeroStaleAfter);
        }
        if cli.db.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("database"));
        }
        if cli.log_file.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("log file"));
        }

        Ok(Self {
            backend,
            db_path: cli.db.clone(),
            log_file: cli.log_file.clone(),
            app: AppConfig {
                poll_interval: Duration::from_secs(cli.poll_interval_secs),
                stale_after: Duration::from_secs(cli.stale_after_secs),
            },
        })
    }
}

fn validate_url(url: &str) -> Result<String, ConfigError> {
    let host = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .map(|rest| rest.split(['/', ':']).next().unwrap_or_default());
    match host {
        Some(host) if !host.is_empty() => Ok(url.trim_end_matches('/').to_owned()),
        _ => Err(ConfigError::InvalidServerUrl(url.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tchat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_run_offline_chat() {
        let cli = Cli { server: None, ..parse(&[]) };
        assert_eq!(cli.command, None);

        let config = Config::from_cli(&cli).unwrap();
        assert_eq!(config.backend, Backend::Demo);
        assert_eq!(config.app, AppConfig::default());
        assert_eq!(config.log_file, PathBuf::from("tchat.log"));
    }

    #[test]
    fn server_url_is_normalized() {
        let cli = parse(&["--server", "http://localhost:8080/"]);
        let config = Config::from_cli(&cli).unwrap();
        assert_eq!(config.backend, Backend::Server("http://localhost:8080".into()));
    }

    #[test]
    fn bad_server_urls_are_rejected() {
        for url in ["localhost:8080", "ftp://host", "http://", "https://:80"] {
            let cli = parse(&["--server", url]);
            assert_eq!(
                Config::from_cli(&cli),
                Err(ConfigError::InvalidServerUrl(url.into())),
                "accepted {url}"
            );
        }
    }

    #[test]
    fn zero_stale_threshold_is_rejected() {
        let cli = parse(&["--stale-after-secs", "0"]);
        assert_eq!(Config::from_cli(&cli), Err(ConfigError::ZeroStaleAfter));
    }

    #[test]
    fn zero_poll_interval_disables_polling() {
        let cli = Cli { server: None, ..parse(&["--poll-interval-secs", "0"]) };
        assert_eq!(Config::from_cli(&cli).unwrap().app.poll_interval, Duration::ZERO);
    }

    #[test]
    fn subcommands_parse() {
        let cli = parse(&["send", "@bob", "hello there"]);
        assert_eq!(
            cli.command,
            Some(CliCommand::Send { recipient: "@bob".into(), message: Some("hello there".into()) })
        );

        let cli = parse(&["read", "bob", "--db", "/tmp/x.redb"]);
        assert_eq!(cli.command, Some(CliCommand::Read { recipient: "bob".into() }));
        assert_eq!(cli.db, PathBuf::from("/tmp/x.redb"));
    }
}
