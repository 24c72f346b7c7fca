// src/core/scanner/port_prober.rs

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Default management port of the device API.
pub const DEFAULT_PORT: u16 = 7125;
/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Tests TCP reachability of `address:port`.
///
/// Returns the address when the connect succeeds within `connect_timeout`.
/// Every failure (timeout, refusal, unreachable network) reads as "not
/// reachable". The stream is dropped before returning, which closes it.
pub async fn probe_port(address: Ipv4Addr, port: u16, connect_timeout: Duration) -> Option<Ipv4Addr> {
    connect_within(address, port, connect_timeout, TcpStream::connect).await
}

async fn connect_within<F, Fut>(address: Ipv4Addr, port: u16, connect_timeout: Duration, connect: F) -> Option<Ipv4Addr>
where
    F: FnOnce(SocketAddr) -> Fut,
    Fut: Future<Output = io::Result<TcpStream>>,
{
    let socket_addr = SocketAddr::from((address, port));
    match timeout(connect_timeout, connect(socket_addr)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            debug!(%address, port, "Port open.");
            Some(address)
        }
        Ok(Err(e)) => {
            debug!(%address, port, error = %e, "Connect failed.");
            None
        }
        Err(_elapsed) => {
            debug!(%address, port, "Connect timed out.");
            None
        }
    }
}
