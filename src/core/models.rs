// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::core::error::ScanError;

/// Hostname reported when a device does not answer the identity request.
pub const UNKNOWN_HOSTNAME: &str = "unknown";

// --- Operational State ---

/// The operational state of a device.
///
/// Values reported by the device API are kept as opaque strings (anything the
/// firmware invents lands in `Other`). `Offline` and `Unreachable` are sentinels
/// assigned by the scanner itself and never come from the API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceState {
    Printing,
    Paused,
    Error,
    Ready,
    Standby,
    Complete,
    Cancelled,
    /// Known device that did not answer during the last scan.
    #[default]
    Offline,
    /// Device answered on the port but its status query failed.
    Unreachable,
    Other(String),
}

impl DeviceState {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceState::Printing => "printing",
            DeviceState::Paused => "paused",
            DeviceState::Error => "error",
            DeviceState::Ready => "ready",
            DeviceState::Standby => "standby",
            DeviceState::Complete => "complete",
            DeviceState::Cancelled => "cancelled",
            DeviceState::Offline => "offline",
            DeviceState::Unreachable => "unreachable",
            DeviceState::Other(state) => state,
        }
    }

    /// True for states the scanner assigns on its own.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, DeviceState::Offline | DeviceState::Unreachable)
    }
}

impl From<&str> for DeviceState {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "printing" => DeviceState::Printing,
            "paused" => DeviceState::Paused,
            "error" => DeviceState::Error,
            "ready" => DeviceState::Ready,
            "standby" => DeviceState::Standby,
            "complete" => DeviceState::Complete,
            "cancelled" => DeviceState::Cancelled,
            "offline" => DeviceState::Offline,
            "unreachable" => DeviceState::Unreachable,
            _ => DeviceState::Other(value.to_string()),
        }
    }
}

impl From<String> for DeviceState {
    fn from(value: String) -> Self {
        DeviceState::from(value.as_str())
    }
}

impl From<DeviceState> for String {
    fn from(state: DeviceState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and state of a device as read from its HTTP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterInfo {
    pub hostname: String,
    pub state: DeviceState,
}

impl PrinterInfo {
    pub fn new(hostname: impl Into<String>, state: DeviceState) -> Self {
        Self { hostname: hostname.into(), state }
    }
}

// --- Known-Device Set ---

/// A device the operator knows about, keyed by its address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub address: Ipv4Addr,
    /// Hostname from the most recent successful probe.
    pub original_name: String,
    /// Operator override. Only explicit renames touch it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    /// Live state is not persisted: every record starts out offline.
    #[serde(skip)]
    pub state: DeviceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

impl DeviceRecord {
    pub fn new(address: Ipv4Addr, original_name: impl Into<String>) -> Self {
        Self {
            address,
            original_name: original_name.into(),
            custom_name: None,
            state: DeviceState::Offline,
            last_seen: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.custom_name.as_deref().unwrap_or(&self.original_name)
    }
}

/// The persisted mapping address -> `DeviceRecord`.
///
/// Serialized as a plain list of records; duplicates collapse onto the last one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DeviceRecord>", into = "Vec<DeviceRecord>")]
pub struct KnownDevices {
    records: BTreeMap<Ipv4Addr, DeviceRecord>,
}

impl KnownDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Ipv4Addr) -> Option<&DeviceRecord> {
        self.records.get(address)
    }

    pub fn contains(&self, address: &Ipv4Addr) -> bool {
        self.records.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn addresses(&self) -> Vec<Ipv4Addr> {
        self.records.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.values()
    }

    /// Inserts or replaces the record stored under its own address.
    pub fn upsert(&mut self, record: DeviceRecord) {
        self.records.insert(record.address, record);
    }

    /// Registers an operator-entered host. Returns false if it was already known.
    pub fn add_known_host(&mut self, address: Ipv4Addr) -> bool {
        if self.records.contains_key(&address) {
            return false;
        }
        self.records.insert(address, DeviceRecord::new(address, UNKNOWN_HOSTNAME));
        true
    }

    /// Sets the operator name of a device; an empty name clears the override.
    pub fn rename(&mut self, address: &Ipv4Addr, custom_name: &str) -> bool {
        match self.records.get_mut(address) {
            Some(record) => {
                let trimmed = custom_name.trim();
                record.custom_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
                true
            }
            None => false,
        }
    }

    /// Explicit operator deletion, the only way a record is destroyed.
    pub fn remove(&mut self, address: &Ipv4Addr) -> Option<DeviceRecord> {
        self.records.remove(address)
    }
}

impl From<Vec<DeviceRecord>> for KnownDevices {
    fn from(records: Vec<DeviceRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.address, r)).collect(),
        }
    }
}

impl From<KnownDevices> for Vec<DeviceRecord> {
    fn from(known: KnownDevices) -> Self {
        known.records.into_values().collect()
    }
}

// --- Control Commands ---

/// The fixed set of control actions a device accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PrinterCommand {
    Start,
    Pause,
    Cancel,
    #[strum(to_string = "emergency_stop", serialize = "emergency-stop")]
    EmergencyStop,
}

impl PrinterCommand {
    /// API path the command is POSTed to.
    pub fn api_path(&self) -> &'static str {
        match self {
            PrinterCommand::Start => "/printer/print/start",
            PrinterCommand::Pause => "/printer/print/pause",
            PrinterCommand::Cancel => "/printer/print/cancel",
            PrinterCommand::EmergencyStop => "/printer/emergency_stop",
        }
    }
}

/// Result of a command the device actually answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub status: Option<u16>,
}

// --- Scan Events ---

/// What started a scan. At most one scan per trigger runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ScanTrigger {
    ManualScan,
    ManualRefresh,
    AutoRefresh,
}

/// A single device seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub address: Ipv4Addr,
    pub hostname: String,
    pub state: DeviceState,
}

/// The typed event stream produced by the scan orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    HostFound(Discovery),
    /// Percentage in `[0, 100]`, non-decreasing over one scan.
    Progress(f64),
    Error(ScanError),
    /// Every address found reachable in this run. Emitted exactly once, last.
    Finished(Vec<Ipv4Addr>),
}

/// A scan event tagged with the trigger of the scan that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanUpdate {
    pub trigger: ScanTrigger,
    pub event: ScanEvent,
}
