// src/core/mod.rs

// The scanning core. Nothing in here touches the terminal; the front-ends in
// `app` and `cli` consume it through `scanner::spawn_scan` and the event channel.

/// Small TTL cache used to avoid re-querying devices seen moments ago.
pub mod cache;

/// Control commands (start, pause, cancel, emergency stop) sent to a device.
pub mod commands;

pub mod error;

/// Shared HTTP client and device URL helpers.
pub mod http;

/// Device records, states, commands and the scan event vocabulary.
pub mod models;

pub mod notifications;

/// Merges a finished scan into the Known-Device Set.
pub mod reconcile;

/// Address expansion, probing and the scan orchestrator.
pub mod scanner;

#[cfg(test)]
pub(crate) mod test_support;
