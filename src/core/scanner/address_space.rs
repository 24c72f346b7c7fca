// src/core/scanner/address_space.rs

use ipnetwork::Ipv4Network;
use std::net::{Ipv4Addr, UdpSocket};
use tracing::{debug, warn};

use crate::core::error::InvalidSubnetError;

/// Used when the local address cannot be determined.
pub const FALLBACK_SUBNET: &str = "192.168.1.0/24";

/// Parses a subnet specification into its containing IPv4 network.
///
/// Host bits are tolerated ("10.0.0.5/24" becomes 10.0.0.0/24) and a bare
/// address is treated as a /32.
pub fn validate_subnet(spec: &str) -> Result<Ipv4Network, InvalidSubnetError> {
    let trimmed = spec.trim();
    let parsed: Ipv4Network = trimmed.parse().map_err(|e: ipnetwork::IpNetworkError| {
        InvalidSubnetError {
            subnet: spec.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ipv4Network::new(parsed.network(), parsed.prefix()).map_err(|e| InvalidSubnetError {
        subnet: spec.to_string(),
        reason: e.to_string(),
    })
}

/// The usable host range of a network, as `(first, last)` inclusive.
///
/// Network and broadcast addresses are excluded, except for /31 (both
/// addresses are usable) and /32 (the single address).
fn host_bounds(network: &Ipv4Network) -> (u32, u32) {
    let first = u32::from(network.network());
    let last = u32::from(network.broadcast());
    if network.prefix() >= 31 {
        (first, last)
    } else {
        (first + 1, last - 1)
    }
}

/// Number of usable host addresses, computed without enumerating them.
pub fn host_count(network: &Ipv4Network) -> u64 {
    let (first, last) = host_bounds(network);
    u64::from(last - first) + 1
}

/// Lazily yields every usable host address of `network`.
pub fn hosts(network: &Ipv4Network) -> impl Iterator<Item = Ipv4Addr> + Send + 'static + use<> {
    let (first, last) = host_bounds(network);
    (first..=last).map(Ipv4Addr::from)
}

/// Parses `spec` and returns the lazy sequence of its host addresses.
pub fn expand_subnet(
    spec: &str,
) -> Result<impl Iterator<Item = Ipv4Addr> + Send + 'static + use<>, InvalidSubnetError> {
    let network = validate_subnet(spec)?;
    debug!(subnet = %network, hosts = host_count(&network), "Expanded subnet.");
    Ok(hosts(&network))
}

/// Best guess at the /24 this machine lives on.
///
/// Connecting a UDP socket sends nothing; it only makes the OS pick the
/// outbound interface, whose address is then read back.
pub fn detect_local_subnet() -> String {
    let local_ip = UdpSocket::bind(("0.0.0.0", 0))
        .and_then(|socket| {
            socket.connect(("10.255.255.255", 1))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip());

    match local_ip {
        Ok(std::net::IpAddr::V4(ip)) if !ip.is_unspecified() => {
            match Ipv4Network::new(ip, 24).and_then(|n| Ipv4Network::new(n.network(), 24)) {
                Ok(network) => {
                    debug!(subnet = %network, "Local subnet detected.");
                    network.to_string()
                }
                Err(e) => {
                    warn!(error = %e, "Could not derive local subnet, using fallback.");
                    FALLBACK_SUBNET.to_string()
                }
            }
        }
        Ok(other) => {
            warn!(address = %other, "Local address is not usable IPv4, using fallback subnet.");
            FALLBACK_SUBNET.to_string()
        }
        Err(e) => {
            warn!(error = %e, "Failed to detect local subnet, using fallback.");
            FALLBACK_SUBNET.to_string()
        }
    }
}
