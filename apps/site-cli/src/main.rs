#![forbid(unsafe_code)]

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use clinicsite_backend::{Client, MemoryBackend};
use tracing_subscriber::EnvFilter;

use config::SiteConfig;

#[derive(Parser)]
#[command(name = "clinicsite", version)]
#[command(about = "Resolve and edit the clinic site's images and settings")]
struct Cli {
    /// Run against an empty in-memory backend (preview with defaults).
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print or update the CLI configuration.
    Config {
        /// Print only the config file location.
        #[arg(long, default_value_t = false)]
        show_path: bool,
        /// Store a new backend URL in the config file.
        #[arg(long)]
        backend_url: Option<String>,
        /// Store a new anon key in the config file.
        #[arg(long)]
        anon_key: Option<String>,
    },
    #[command(flatten)]
    Site(SiteCommand),
}

/// Commands that talk to the backend.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SiteCommand {
    /// Resolve every image and setting and print them as JSON.
    Resolve,
    /// List image slots with their current URL.
    Images,
    /// List settings with their effective value.
    Settings,
    /// Upload a file as the override for an image slot.
    Upload { id: String, file: PathBuf },
    /// Remove an image override so the default is served.
    ResetImage { id: String },
    /// Save a setting.
    Set { key: String, value: String },
    /// Remove a setting override so the default applies.
    Unset { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,clinicsite=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Command::Config {
            show_path,
            backend_url,
            anon_key,
        } => {
            let path = config::config_path()?;
            if show_path {
                commands::print_path(&path, &mut stdout)?;
                return Ok(ExitCode::SUCCESS);
            }
            if backend_url.is_some() || anon_key.is_some() {
                let mut stored = SiteConfig::load_from(&path)?;
                if let Some(url) = backend_url {
                    stored.backend_url = url;
                }
                if let Some(key) = anon_key {
                    stored.anon_key = key;
                }
                stored.save_to(&path)?;
                tracing::info!(path = %path.display(), "configuration updated");
            }
            commands::print_config(&SiteConfig::load()?, &mut stdout)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Site(command) => {
            let cfg = SiteConfig::load()?;
            if cli.offline {
                tracing::info!("using in-memory backend");
                let backend = Arc::new(MemoryBackend::new());
                commands::execute(backend, &cfg, &command, &mut stdout).await
            } else {
                if !cfg.is_configured() {
                    anyhow::bail!(
                        "backend is not configured: run `clinicsite config --backend-url <URL> --anon-key <KEY>`, \
                         set CLINICSITE_BACKEND_URL and CLINICSITE_ANON_KEY, or pass --offline"
                    );
                }
                let backend = Arc::new(Client::new(cfg.client_config())?);
                commands::execute(backend, &cfg, &command, &mut stdout).await
            }
        }
    }
}
