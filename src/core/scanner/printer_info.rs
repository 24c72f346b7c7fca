// src/core/scanner/printer_info.rs

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;

use crate::core::cache::TtlCache;
use crate::core::http::device_url;
use crate::core::models::{DeviceState, PrinterInfo, UNKNOWN_HOSTNAME};

pub const DEFAULT_INFO_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

const INFO_PATH: &str = "/printer/info";
const QUERY_PATH: &str = "/printer/objects/query";

/// Reads identity and print state from a device, caching the pair per address.
///
/// Network trouble never surfaces as an error: a failed identity request yields
/// the `"unknown"` hostname and a failed status query yields the `Unreachable`
/// sentinel. The two requests run independently of each other.
#[derive(Debug)]
pub struct PrinterInfoFetcher {
    client: reqwest::Client,
    port: u16,
    request_timeout: Duration,
    cache: TtlCache<Ipv4Addr, PrinterInfo>,
}

impl PrinterInfoFetcher {
    pub fn new(
        client: reqwest::Client,
        port: u16,
        request_timeout: Duration,
        cache_ttl: Duration,
        cache_capacity: usize,
    ) -> Self {
        Self {
            client,
            port,
            request_timeout,
            cache: TtlCache::new(cache_ttl, cache_capacity),
        }
    }

    /// Cache lookup only, no network I/O.
    pub fn cached(&self, address: Ipv4Addr) -> Option<PrinterInfo> {
        self.cache.get(&address)
    }

    pub async fn fetch(&self, address: Ipv4Addr) -> PrinterInfo {
        if let Some(hit) = self.cache.get(&address) {
            debug!(%address, "Printer info served from cache.");
            return hit;
        }

        let (hostname, state) = tokio::join!(self.fetch_hostname(address), self.fetch_state(address));
        let info = PrinterInfo::new(hostname, state);
        debug!(%address, hostname = %info.hostname, state = %info.state, "Printer info fetched.");
        self.cache.insert(address, info.clone());
        info
    }

    async fn fetch_hostname(&self, address: Ipv4Addr) -> String {
        let Ok(url) = device_url(address, self.port, INFO_PATH) else {
            return UNKNOWN_HOSTNAME.to_string();
        };
        let request = self.client.get(url).timeout(self.request_timeout);
        let body = self.read_json(address, request).await;
        body.as_ref()
            .and_then(|body| body.pointer("/result/hostname"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_HOSTNAME.to_string())
    }

    async fn fetch_state(&self, address: Ipv4Addr) -> DeviceState {
        let Ok(url) = device_url(address, self.port, QUERY_PATH) else {
            return DeviceState::Unreachable;
        };
        // `.json()` also sets `Content-Type: application/json`.
        let request = self
            .client
            .post(url)
            .json(&json!({ "objects": { "print_stats": null } }))
            .timeout(self.request_timeout);
        let body = self.read_json(address, request).await;
        body.as_ref()
            .and_then(|body| body.pointer("/result/status/print_stats/state"))
            .and_then(Value::as_str)
            .map(DeviceState::from)
            .unwrap_or(DeviceState::Unreachable)
    }

    /// Sends `request` and decodes the body of a 200 response; anything else is `None`.
    async fn read_json(&self, address: Ipv4Addr, request: reqwest::RequestBuilder) -> Option<Value> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(%address, error = %e, "Device request failed.");
                return None;
            }
        };
        if response.status() != StatusCode::OK {
            debug!(%address, status = %response.status(), "Device returned non-success status.");
            return None;
        }
        match response.json::<Value>().await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!(%address, error = %e, "Device returned malformed JSON.");
                None
            }
        }
    }
}
