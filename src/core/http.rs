// src/core/http.rs

use std::net::Ipv4Addr;
use url::Url;

/// Shared HTTP client for every device request. Timeouts are set per request.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("MoonrakerRS/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// `http://<address>:<port><path>` for a device API endpoint.
pub fn device_url(address: Ipv4Addr, port: u16, path: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!("http://{address}:{port}/"))?.join(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_api_urls() {
        let url = device_url(Ipv4Addr::new(10, 0, 0, 9), 7125, "/printer/info").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.9:7125/printer/info");
    }
}
