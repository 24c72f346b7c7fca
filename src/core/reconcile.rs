// src/core/reconcile.rs

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use tracing::debug;

use crate::core::models::{DeviceRecord, DeviceState, Discovery, KnownDevices, PrinterInfo, UNKNOWN_HOSTNAME};

/// What one scan saw, accumulated from its `HostFound` events.
#[derive(Debug, Default)]
pub struct ScanObservations {
    seen: HashMap<Ipv4Addr, PrinterInfo>,
}

impl ScanObservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, discovery: &Discovery) {
        self.seen.insert(
            discovery.address,
            PrinterInfo::new(discovery.hostname.clone(), discovery.state.clone()),
        );
    }

    pub fn get(&self, address: &Ipv4Addr) -> Option<&PrinterInfo> {
        self.seen.get(address)
    }
}

/// Merges a finished scan into the Known-Device Set.
///
/// Builds a fresh set and leaves `previous` untouched, so callers swap it in
/// whole. Reachable devices get their hostname, state and `last_seen`
/// refreshed; `custom_name` is never touched. Known devices that did not
/// answer are carried forward as `Offline` and are never dropped.
pub fn reconcile(
    previous: &KnownDevices,
    observations: &ScanObservations,
    reachable: &[Ipv4Addr],
    seen_at: DateTime<Utc>,
) -> KnownDevices {
    let reachable_set: HashSet<Ipv4Addr> = reachable.iter().copied().collect();
    let mut merged = KnownDevices::new();

    for record in previous.iter().filter(|r| !reachable_set.contains(&r.address)) {
        let mut carried = record.clone();
        carried.state = DeviceState::Offline;
        merged.upsert(carried);
    }

    let mut added = 0usize;
    for &address in &reachable_set {
        let mut record = match previous.get(&address) {
            Some(existing) => existing.clone(),
            None => {
                added += 1;
                DeviceRecord::new(address, UNKNOWN_HOSTNAME)
            }
        };
        if let Some(info) = observations.get(&address) {
            // A failed identity request must not wipe a name we already had.
            if info.hostname != UNKNOWN_HOSTNAME {
                record.original_name = info.hostname.clone();
            }
            record.state = info.state.clone();
        }
        record.last_seen = Some(seen_at);
        merged.upsert(record);
    }

    debug!(
        previous = previous.len(),
        reachable = reachable_set.len(),
        added,
        total = merged.len(),
        "Known devices reconciled."
    );
    merged
}
