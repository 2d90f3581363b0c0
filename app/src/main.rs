use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use ulti_adapters::default_registry;
use ulti_core::config::AppConfig;

/// Terminal client for browsing MySQL databases.
#[derive(Debug, Parser)]
#[command(name = "ulti", version)]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Host pre-filled in the connection form
    #[arg(long)]
    host: Option<String>,

    /// Port pre-filled in the connection form
    #[arg(long)]
    port: Option<u16>,

    /// User pre-filled in the connection form
    #[arg(long)]
    user: Option<String>,

    /// Log level filter, e.g. `debug` or `ulti_core=trace`
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load_from_path(path)?,
            None => AppConfig::load_default()?,
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.connection.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(user) = &self.user {
            config.connection.user.clone_from(user);
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
    }
}

/// Logs go to the configured file only; the terminal belongs to the TUI.
fn init_tracing(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = &config.logging.file else {
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()?;
    Ok(())
}

fn run_app(
    config: &AppConfig,
    run_tui: impl FnOnce(&AppConfig) -> Result<(), ulti_tui::TuiError>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        host = %config.connection.host,
        port = config.connection.port,
        "starting {}",
        ulti_tui::ui_name()
    );
    run_tui(config)?;
    info!("exiting");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    init_tracing(&config)?;

    run_app(&config, |config| {
        ulti_tui::run(config, default_registry(config))
    })
}
