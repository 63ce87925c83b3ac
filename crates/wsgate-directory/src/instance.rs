//! Gateway instance identity.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identity of a gateway process. Fixed for the lifetime of the process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Unique instance name; ownership checks compare this field.
    pub name: String,
    /// Advertised IP address.
    pub ip: String,
    /// Advertised HTTP port.
    pub port: u16,
}

impl Instance {
    /// Create an instance identity.
    pub fn new(name: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            port,
        }
    }

    /// Resolve this process's identity.
    ///
    /// Uses `ip` when given, otherwise the private IPv4 address of the
    /// outbound interface. Uses `name` when given, otherwise `ip:port`.
    pub fn resolve(name: Option<&str>, ip: Option<&str>, port: u16) -> std::io::Result<Self> {
        let ip = match ip {
            Some(ip) => ip.to_string(),
            None => private_ipv4()?.to_string(),
        };
        let name = name.map_or_else(|| format!("{ip}:{port}"), ToString::to_string);
        Ok(Self { name, ip, port })
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.ip, self.port)
    }
}

/// Find the private, non-loopback IPv4 address of the outbound interface.
///
/// Connecting a UDP socket only selects a route; no packet is sent.
pub fn private_ipv4() -> std::io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((Ipv4Addr::new(10, 255, 255, 255), 1))?;
    match socket.local_addr()?.ip() {
        IpAddr::V4(ip) if is_usable_private(ip) => {
            debug!(%ip, "resolved private ip");
            Ok(ip)
        }
        other => Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("could not find a valid private IP address (got {other})"),
        )),
    }
}

fn is_usable_private(ip: Ipv4Addr) -> bool {
    ip.is_private() && !ip.is_loopback()
}
