// src/core/scanner/probe.rs

use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;

use super::connectivity::check_connectivity;
use super::port_prober::probe_port;
use super::printer_info::PrinterInfoFetcher;
use super::ScannerSettings;
use crate::core::error::ScanError;
use crate::core::models::PrinterInfo;

/// Everything the orchestrator needs from the network.
///
/// `probe` and `printer_info` must never fail: unreachable devices are `None`
/// and broken APIs degrade to sentinel values.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
    async fn check_connectivity(&self) -> Result<(), ScanError>;

    async fn probe(&self, address: Ipv4Addr) -> Option<Ipv4Addr>;

    async fn printer_info(&self, address: Ipv4Addr) -> PrinterInfo;

    /// Info already known for `address`, without touching the network.
    fn cached_info(&self, address: Ipv4Addr) -> Option<PrinterInfo>;
}

/// The real probe: TCP connect on the API port, then HTTP queries.
#[derive(Debug)]
pub struct MoonrakerProbe {
    port: u16,
    connect_timeout: Duration,
    connectivity_host: String,
    fetcher: PrinterInfoFetcher,
}

impl MoonrakerProbe {
    pub fn new(client: reqwest::Client, settings: &ScannerSettings) -> Self {
        Self {
            port: settings.port,
            connect_timeout: settings.connect_timeout(),
            connectivity_host: settings.connectivity_host.clone(),
            fetcher: PrinterInfoFetcher::new(
                client,
                settings.port,
                settings.info_timeout(),
                settings.cache_ttl(),
                settings.cache_capacity,
            ),
        }
    }
}

#[async_trait]
impl NetworkProbe for MoonrakerProbe {
    async fn check_connectivity(&self) -> Result<(), ScanError> {
        check_connectivity(&self.connectivity_host).await
    }

    async fn probe(&self, address: Ipv4Addr) -> Option<Ipv4Addr> {
        probe_port(address, self.port, self.connect_timeout).await
    }

    async fn printer_info(&self, address: Ipv4Addr) -> PrinterInfo {
        self.fetcher.fetch(address).await
    }

    fn cached_info(&self, address: Ipv4Addr) -> Option<PrinterInfo> {
        self.fetcher.cached(address)
    }
}
