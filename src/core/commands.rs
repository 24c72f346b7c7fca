// src/core/commands.rs

use reqwest::StatusCode;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::error::CommandDispatchError;
use crate::core::http::device_url;
use crate::core::models::{CommandOutcome, PrinterCommand};

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends control commands to devices.
///
/// Unlike the prober and the info fetcher, transport failures are not absorbed
/// here: the operator asked for the action and has to learn that it did not
/// reach the device.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    client: reqwest::Client,
    port: u16,
    timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(client: reqwest::Client, port: u16, timeout: Duration) -> Self {
        Self { client, port, timeout }
    }

    /// Parses `command` and dispatches it. Unknown names fail before any I/O.
    pub async fn dispatch(&self, address: Ipv4Addr, command: &str) -> Result<CommandOutcome, CommandDispatchError> {
        let command = PrinterCommand::from_str(command.trim()).map_err(|_| {
            warn!(%address, command, "Rejected unknown command.");
            CommandDispatchError::UnknownCommand(command.to_string())
        })?;
        self.send(address, command).await
    }

    /// POSTs `command` to the device; success means HTTP 200.
    pub async fn send(&self, address: Ipv4Addr, command: PrinterCommand) -> Result<CommandOutcome, CommandDispatchError> {
        let url = device_url(address, self.port, command.api_path())
            .map_err(|source| CommandDispatchError::InvalidUrl { address, source })?;

        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| {
                error!(%address, %command, error = %source, "Command dispatch failed.");
                CommandDispatchError::Transport {
                    address,
                    command: command.to_string(),
                    source,
                }
            })?;

        let status = response.status();
        let outcome = CommandOutcome {
            success: status == StatusCode::OK,
            status: Some(status.as_u16()),
        };
        if outcome.success {
            info!(%address, %command, "Command accepted.");
        } else {
            warn!(%address, %command, status = %status, "Command rejected by device.");
        }
        Ok(outcome)
    }
}
