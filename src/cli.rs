// src/cli.rs

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, Result, WrapErr};
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::AppConfig;
use crate::core::commands::CommandDispatcher;
use crate::core::models::{ScanEvent, ScanTrigger};
use crate::core::reconcile::{reconcile, ScanObservations};
use crate::core::scanner::probe::NetworkProbe;
use crate::core::scanner::{spawn_scan, ScanRequest};

#[derive(Parser, Debug)]
#[command(name = "moonraker-rs-scanner", version)]
#[command(about = "Finds Moonraker 3D printers on the local network and keeps an eye on them.")]
pub struct Cli {
    /// Path of the configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive dashboard (default)
    Tui,
    /// Probe known hosts and sweep the configured subnets once
    Scan,
    /// Probe known hosts only
    Refresh,
    /// Send a control command: start, pause, cancel or emergency_stop
    Send { address: Ipv4Addr, command: String },
}

/// Runs one scan, printing events as they arrive, then reconciles and saves.
pub async fn run_headless_scan<W: Write>(
    trigger: ScanTrigger,
    config: &mut AppConfig,
    config_path: &Path,
    probe: Arc<dyn NetworkProbe>,
    out: &mut W,
) -> Result<()> {
    let request = ScanRequest {
        trigger,
        subnets: match trigger {
            ScanTrigger::ManualScan => config.effective_subnets(),
            ScanTrigger::ManualRefresh | ScanTrigger::AutoRefresh => Vec::new(),
        },
        known_hosts: config.hosts.addresses().into_iter().collect(),
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = spawn_scan(probe, config.scanner.limits(), request, tx);

    let mut observations = ScanObservations::new();
    let mut reachable = None;
    let mut last_percent = -1i64;
    while let Some(update) = rx.recv().await {
        match update.event {
            ScanEvent::HostFound(discovery) => {
                writeln!(out, "{:<15} {:<24} {}", discovery.address, discovery.hostname, discovery.state)?;
                observations.record(&discovery);
            }
            ScanEvent::Progress(percent) => {
                // One line per ten percent keeps large sweeps readable.
                let bucket = (percent / 10.0).floor() as i64;
                if bucket > last_percent {
                    last_percent = bucket;
                    writeln!(out, "progress {percent:.0}%")?;
                }
            }
            ScanEvent::Error(e) => writeln!(out, "error: {e}")?,
            ScanEvent::Finished(addresses) => reachable = Some(addresses),
        }
    }

    let phase = handle.await.wrap_err("scan task failed")?;
    let Some(reachable) = reachable else {
        bail!("scan ended in phase {phase} without results");
    };

    config.hosts = reconcile(&config.hosts, &observations, &reachable, Utc::now());
    config.save(config_path)?;
    writeln!(out, "{} reachable, {} known", reachable.len(), config.hosts.len())?;
    info!(%trigger, reachable = reachable.len(), known = config.hosts.len(), "Headless scan done.");
    Ok(())
}

/// Dispatches one control command. Fails unless the device answered 200.
pub async fn run_send<W: Write>(
    dispatcher: &CommandDispatcher,
    address: Ipv4Addr,
    command: &str,
    out: &mut W,
) -> Result<()> {
    let outcome = dispatcher
        .dispatch(address, command)
        .await
        .wrap_err_with(|| format!("cannot send `{command}` to {address}"))?;
    if !outcome.success {
        bail!(
            "{address} rejected `{command}` (status {})",
            outcome.status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
        );
    }
    writeln!(out, "{command} accepted by {address}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::build_client;
    use crate::core::models::{DeviceRecord, DeviceState};
    use crate::core::scanner::probe::MoonrakerProbe;
    use crate::core::scanner::ScannerSettings;
    use crate::core::test_support::MockDevice;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["moonraker-rs-scanner", "--config", "/tmp/c.json", "send", "10.0.0.5", "pause"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        assert_eq!(
            cli.command,
            Some(Command::Send {
                address: Ipv4Addr::new(10, 0, 0, 5),
                command: "pause".into()
            })
        );
        assert_eq!(Cli::parse_from(["moonraker-rs-scanner"]).command, None);
        assert!(Cli::try_parse_from(["moonraker-rs-scanner", "send", "not-an-ip", "pause"]).is_err());
    }

    #[tokio::test]
    async fn headless_refresh_updates_and_saves_known_devices() {
        let device = MockDevice::start("trident", "printing").await;
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.scanner = ScannerSettings {
            port: device.port,
            connect_timeout_ms: 300,
            // An address literal resolves without a DNS query.
            connectivity_host: "127.0.0.1".into(),
            ..ScannerSettings::default()
        };
        config.hosts.add_known_host(Ipv4Addr::LOCALHOST);
        let probe = Arc::new(MoonrakerProbe::new(build_client().unwrap(), &config.scanner));

        let mut out = Vec::new();
        run_headless_scan(ScanTrigger::ManualRefresh, &mut config, &path, probe, &mut out)
            .await
            .unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("trident"));
        assert!(printed.contains("progress 100%"));

        let saved = AppConfig::load(&path);
        let record: &DeviceRecord = saved.hosts.get(&Ipv4Addr::LOCALHOST).unwrap();
        assert_eq!(record.original_name, "trident");
        assert!(record.last_seen.is_some());
        assert_eq!(config.hosts.get(&Ipv4Addr::LOCALHOST).unwrap().state, DeviceState::Printing);
    }

    #[tokio::test]
    async fn send_reports_rejection_as_error() {
        let device = MockDevice::start("trident", "printing").await;
        let dispatcher = CommandDispatcher::new(build_client().unwrap(), device.port, Duration::from_secs(2));

        let mut out = Vec::new();
        run_send(&dispatcher, Ipv4Addr::LOCALHOST, "pause", &mut out).await.unwrap();
        assert!(String::from_utf8(out).unwrap().contains("accepted"));

        device.respond_to_commands_with(500);
        let err = run_send(&dispatcher, Ipv4Addr::LOCALHOST, "cancel", &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));

        assert!(run_send(&dispatcher, Ipv4Addr::LOCALHOST, "explode", &mut Vec::new()).await.is_err());
    }
}
