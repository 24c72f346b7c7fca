// src/core/error.rs

use std::net::Ipv4Addr;
use thiserror::Error;

/// A subnet specification that does not parse as an IPv4 network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid subnet `{subnet}`: {reason}")]
pub struct InvalidSubnetError {
    pub subnet: String,
    pub reason: String,
}

/// Errors that cross the scan boundary as `ScanEvent::Error`.
///
/// Everything else a probe can run into (timeouts, refused connections,
/// malformed responses) is absorbed into sentinel values and never shows up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// Reported once per bad subnet; the scan carries on with the rest.
    #[error(transparent)]
    InvalidSubnet(#[from] InvalidSubnetError),
    /// Fatal: the scan aborts before any probing.
    #[error("no network connectivity: {0}")]
    Connectivity(String),
}

/// Failures of an operator-initiated control command.
#[derive(Debug, Error)]
pub enum CommandDispatchError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("cannot build API URL for {address}: {source}")]
    InvalidUrl {
        address: Ipv4Addr,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to send `{command}` to {address}: {source}")]
    Transport {
        address: Ipv4Addr,
        command: String,
        #[source]
        source: reqwest::Error,
    },
}
