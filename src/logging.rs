// src/logging.rs

use color_eyre::eyre::{Result, WrapErr};
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::path::PathBuf;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    self, fmt::time::LocalTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "moonraker-rs", env!("CARGO_PKG_NAME"))
}

pub fn get_data_dir() -> PathBuf {
    if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(proj_dirs) = project_directory() {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".config")
    }
}

/// Resolves the filter directive: `RUST_LOG`, then the project env var,
/// then the configured level scoped to this crate.
fn filter_directive(configured_level: &str) -> String {
    std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.clone()))
        .unwrap_or_else(|_| format!("{}={}", env!("CARGO_CRATE_NAME"), configured_level.to_lowercase()))
}

/// Initializes file-based logging using the tracing subscriber.
///
/// The terminal belongs to the TUI, so nothing is ever written to stdout.
pub fn initialize_logging(configured_level: &str) -> Result<PathBuf> {
    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)
        .wrap_err_with(|| format!("cannot create log directory {}", directory.display()))?;
    let log_path = directory.join(LOG_FILE.clone());
    let log_file = std::fs::File::create(&log_path)
        .wrap_err_with(|| format!("cannot create log file {}", log_path.display()))?;

    let timer = LocalTime::new(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));

    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_timer(timer)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(filter_directive(configured_level)));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()
        .wrap_err("tracing subscriber already installed")?;

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names_follow_the_package() {
        assert_eq!(*PROJECT_NAME, "MOONRAKER_RS_SCANNER");
        assert_eq!(*LOG_ENV, "MOONRAKER_RS_SCANNER_LOGLEVEL");
        assert_eq!(*LOG_FILE, "moonraker-rs-scanner.log");
    }
}
