//! Agile Storage command-line uploader.

mod commands;
mod config;

use std::path::PathBuf;

use agilestore_client::Client;
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::MputOptions;
use crate::config::CliConfig;

#[derive(Debug, Parser)]
#[command(name = "agile-upload")]
#[command(version)]
#[command(about = "Upload files to Agile Storage", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Service base URL
    #[arg(long, global = true, env = "AGILE_ENDPOINT")]
    endpoint: Option<String>,

    /// Account name
    #[arg(short, long, global = true, env = "AGILE_USER")]
    user: Option<String>,

    /// Account password
    #[arg(long, global = true, env = "AGILE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a file in a single request
    Put {
        local: PathBuf,
        /// Remote directory
        directory: String,
        /// Remote file name (defaults to the local name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Upload a file in pieces, optionally resuming an earlier upload
    Mput {
        local: PathBuf,
        /// Remote directory
        directory: String,
        #[arg(long)]
        name: Option<String>,
        /// Multipart id of an interrupted upload
        #[arg(long, value_name = "MPID")]
        resume: Option<String>,
        /// Bytes per piece
        #[arg(long)]
        chunk_size: Option<u64>,
    },

    /// Show the state of a multipart upload
    Status { mpid: String },

    /// Discard a multipart upload
    Abort { mpid: String },

    /// Create a remote directory
    Mkdir { path: String },

    /// Delete a remote file, or a directory with -r
    Rm {
        path: String,
        #[arg(short, long)]
        recursive: bool,
    },

    /// List a remote directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },
}

impl Cli {
    /// Loads the configuration file and applies command-line overrides.
    fn resolve_config(&self) -> anyhow::Result<CliConfig> {
        let mut config = match &self.config {
            Some(path) => CliConfig::load_from(path)
                .with_context(|| format!("cannot read {}", path.display()))?,
            None => CliConfig::load()?,
        };
        if let Some(endpoint) = &self.endpoint {
            config.client.endpoint = endpoint.clone();
        }
        if let Some(user) = &self.user {
            config.client.username = user.clone();
        }
        if let Some(password) = &self.password {
            config.client.password = password.clone();
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    tracing::debug!(endpoint = %config.client.endpoint, user = %config.client.username, "configuration resolved");

    let mut client = Client::from_config(&config.client)?;
    let outcome = run(&mut client, cli.command, &config);

    if client.is_authenticated()
        && let Err(e) = client.logout()
    {
        tracing::warn!(error = %e, "logout failed");
    }
    outcome
}

fn run(client: &mut Client, command: Command, config: &CliConfig) -> anyhow::Result<()> {
    match command {
        Command::Put {
            local,
            directory,
            name,
        } => commands::put(client, &local, &directory, name.as_deref()),
        Command::Mput {
            local,
            directory,
            name,
            resume,
            chunk_size,
        } => commands::mput(
            client,
            &local,
            &directory,
            MputOptions {
                name: name.as_deref(),
                resume: resume.as_deref(),
                chunk_size: chunk_size.unwrap_or(config.chunk_size),
            },
        ),
        Command::Status { mpid } => commands::status(client, &mpid),
        Command::Abort { mpid } => commands::abort(client, &mpid),
        Command::Mkdir { path } => commands::mkdir(client, &path),
        Command::Rm { path, recursive } => commands::rm(client, &path, recursive),
        Command::Ls { path } => commands::ls(client, &path),
    }
}
