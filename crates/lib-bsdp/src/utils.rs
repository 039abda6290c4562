use std::net::{IpAddr, Ipv4Addr};

use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use thiserror::Error;
use tokio::net;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Failed to query network interfaces: {0}")]
    Interface(String),

    #[error("Interface {0} has no IPv4 address")]
    NoIpv4Addr(String),

    #[error("Host {0} did not resolve to an IPv4 address")]
    Unresolvable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Look up the IPv4 address assigned to the named network interface.
pub fn interface_ipv4(name: &str) -> Result<Ipv4Addr, LookupError> {
    let interfaces =
        NetworkInterface::show().map_err(|err| LookupError::Interface(format!("{err:?}")))?;

    interfaces
        .into_iter()
        .filter(|interface| interface.name == name)
        .find_map(|interface| match interface.addr {
            Some(addr) => match addr.ip() {
                IpAddr::V4(ip) => Some(ip),
                IpAddr::V6(_) => None,
            },
            None => None,
        })
        .ok_or_else(|| LookupError::NoIpv4Addr(name.to_string()))
}

/// Resolve a hostname to a literal IPv4 address. Hosts that already are
/// literal addresses are returned as-is without touching the resolver.
///
/// Old EFI boot clients do not perform DNS lookups, so every hostname that
/// ends up in a reply must be resolved once, up front.
pub async fn resolve_host_ipv4(host: &str) -> Result<Ipv4Addr, LookupError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }

    let addrs = net::lookup_host((host, 0u16)).await?;
    for addr in addrs {
        if let IpAddr::V4(ip) = addr.ip() {
            return Ok(ip);
        }
    }

    Err(LookupError::Unresolvable(host.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn literal_ip_skips_resolver() {
        let ip = resolve_host_ipv4("192.0.2.17").await.unwrap();
        assert_eq!(ip, Ipv4Addr::new(192, 0, 2, 17));
    }
}
