//! # INSEN Client
//!
//! Connects to an INSEN peripheral, prints its firmware details and then
//! streams one controller's input as JSON lines.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release -- config/insen.toml
//! ```
//!
//! The config path is optional; without it the defaults are used
//! (`/dev/ttyUSB0`, 115200 baud, controller 0 at 60 Hz for 30 seconds).
//!
//! Expected output:
//! ```text
//! INFO insen_client: INSEN Client v0.1.0 starting...
//! INFO insen_client::client: Connected to INSEN device on /dev/ttyUSB0
//! INFO insen_client: Firmware 1.2.0 (built Jan 15 2025), 4 controller slots
//! INFO insen_client::client::poller: Started monitoring controller 0 at 60 Hz
//! {"id":0,"left_stick":{"x":12000,"y":-40},...}
//! ```

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use insen_client::client::InsenClient;
use insen_client::config::{Config, LoggingConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("Failed to load {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging)?;

    info!("INSEN Client v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut client = InsenClient::new(config.serial.clone());
    client.connect().await?;

    match client.firmware_info().await {
        Ok(fw) => info!(
            "Firmware {} (built {}), {} controller slots",
            fw.version,
            fw.build_date,
            fw.controller_count.map_or("unknown".to_string(), |n| n.to_string())
        ),
        Err(e) => warn!("Failed to read firmware info: {}", e),
    }

    match client.system_status().await {
        Ok(status) => info!(
            "Status: {} active, {} inputs, {} commands, {} bytes free",
            status.active_controllers, status.total_inputs, status.api_commands, status.free_heap
        ),
        Err(e) => warn!("Failed to read status: {}", e),
    }

    match client.controllers().await {
        Ok(controllers) => {
            for controller in controllers {
                info!("Controller {}: {}", controller.id, controller.kind);
            }
        }
        Err(e) => warn!("Failed to list controllers: {}", e),
    }

    let monitor = &config.monitor;
    let threshold = monitor.significant_threshold;
    client
        .start_monitoring(monitor.controller_id, monitor.rate_hz, move |state| {
            if !state.has_significant_input(threshold) {
                return;
            }
            match serde_json::to_string(&state) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize state: {}", e),
            }
        })
        .await?;

    info!("Monitoring for {} seconds, press Ctrl+C to exit", monitor.duration_s);

    tokio::select! {
        _ = sleep(Duration::from_secs(monitor.duration_s)) => {
            info!("Monitoring window elapsed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    client.disconnect().await;

    for state in client.registry().snapshot() {
        info!(
            "Last state of controller {}: buttons {:?}, battery {}%",
            state.id,
            state.pressed_buttons(),
            state.battery
        );
    }

    Ok(())
}

/// Initialize tracing, to stdout or to the configured log file
///
/// `RUST_LOG` directives are combined with the configured level. The
/// returned guard must stay alive so buffered file output gets flushed.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: tracing::Level = config.level.parse()?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if config.file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    }

    let (dir, file_name) = split_log_path(&config.file)?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}

/// Split a log file path into its directory (default `.`) and file name
fn split_log_path(path: &str) -> Result<(PathBuf, PathBuf)> {
    let path = Path::new(path);
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, PathBuf::from(file_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path_with_directory() {
        let (dir, file) = split_log_path("./logs/insen.log").unwrap();
        assert_eq!(dir, PathBuf::from("./logs"));
        assert_eq!(file, PathBuf::from("insen.log"));
    }

    #[test]
    fn test_split_log_path_bare_file() {
        let (dir, file) = split_log_path("insen.log").unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(file, PathBuf::from("insen.log"));
    }

    #[test]
    fn test_split_log_path_without_file_name() {
        assert!(split_log_path("/").is_err());
        assert!(split_log_path("logs/..").is_err());
    }

    #[test]
    fn test_config_levels_parse() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(level.parse::<tracing::Level>().is_ok(), "{} should parse", level);
        }
    }
}
