// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging, run one transfer.
// - Any error ends the process with its full cause chain on stderr.

use anyhow::Context;
use clap::Parser;
use crossterm::style::Stylize;
use std::path::PathBuf;
use tonie_upload::config::{DEFAULT_API_URL, DEFAULT_CLIENT_ID, DEFAULT_TOKEN_URL};
use tonie_upload::{CredentialStore, Endpoints, TerminalSetup, Transfer};
use tracing_subscriber::EnvFilter;

/// Upload a directory of audio files to a creative tonie.
#[derive(Parser, Debug)]
#[command(name = "tonie-upload")]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory to upload (a folder picker opens when omitted)
    dir: Option<PathBuf>,

    /// Credentials file (defaults to tonie_upload.yml in the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Vendor API base URL
    #[arg(long, env = "TONIE_API_URL", default_value = DEFAULT_API_URL, hide_default_value = true)]
    api_url: String,

    /// Token endpoint of the identity provider
    #[arg(long, env = "TONIE_TOKEN_URL", default_value = DEFAULT_TOKEN_URL, hide_default_value = true)]
    token_url: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let store = match args.config {
        Some(path) => CredentialStore::new(path),
        None => CredentialStore::default_location().context("locating config file")?,
    };
    let endpoints = Endpoints {
        api_base_url: args.api_url,
        token_url: args.token_url,
        client_id: DEFAULT_CLIENT_ID.into(),
    };

    let mut setup = TerminalSetup;
    let summary = Transfer::new(endpoints, store, &mut setup)
        .run(args.dir)
        .context("transferring directory")?;

    println!(
        "{} ({} chapters from {})",
        "Upload complete".green().bold(),
        summary.chapters.len(),
        summary.directory.display()
    );
    Ok(())
}
