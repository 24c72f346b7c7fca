// src/core/scanner/connectivity.rs

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::core::error::ScanError;

/// Well-known name resolved to decide whether there is any network path at all.
pub const DEFAULT_CONNECTIVITY_HOST: &str = "google.com";

const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves `host` through the system resolver (or the built-in defaults when
/// the system configuration cannot be read).
pub async fn check_connectivity(host: &str) -> Result<(), ScanError> {
    let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
        warn!(error = %e, "System resolver config unavailable, using defaults.");
        TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
    });

    match timeout(RESOLVE_TIMEOUT, resolver.lookup_ip(host)).await {
        Ok(Ok(lookup)) if lookup.iter().next().is_some() => {
            debug!(host, "Network connectivity check passed.");
            Ok(())
        }
        Ok(Ok(_)) => {
            error!(host, "Connectivity check resolved no addresses.");
            Err(ScanError::Connectivity(format!("{host} resolved to no addresses")))
        }
        Ok(Err(e)) => {
            error!(host, error = %e, "Network connectivity check failed.");
            Err(ScanError::Connectivity(e.to_string()))
        }
        Err(_elapsed) => {
            error!(host, "Network connectivity check timed out.");
            Err(ScanError::Connectivity(format!("resolving {host} timed out")))
        }
    }
}
