//! Command delivery.
//! Picks local UDP when the hub address is known, the cloud relay otherwise.
//!
//! Local delivery is fire-and-forget: at most once, with no acknowledgement.
//! Callers needing confirmation must poll the device status afterwards.

use crate::cloud::CloudClient;
use crate::error::Result;
use crate::protocol::{Command, HUB_PORT};
use log::{debug, info};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;

/// Delivery path for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Direct UDP datagram to the hub
    Local(SocketAddr),
    /// Relayed through the cloud `command.php` endpoint
    Cloud,
}

impl Route {
    pub fn select(local_ip: Option<IpAddr>, port: u16) -> Self {
        match local_ip {
            Some(ip) => Route::Local(SocketAddr::new(ip, port)),
            None => Route::Cloud,
        }
    }

    /// Route for the standard hub port.
    pub fn for_hub(local_ip: Option<IpAddr>) -> Self {
        Self::select(local_ip, HUB_PORT)
    }
}

/// Sends one datagram and closes the socket. No response is awaited.
pub async fn send_local(addr: SocketAddr, packet: &[u8]) -> Result<()> {
    let bind: SocketAddr = match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let socket = UdpSocket::bind(bind).await?;
    let sent = socket.send_to(packet, addr).await?;
    debug!("Sent {} bytes to {}", sent, addr);
    Ok(())
}

/// Delivers a command over the given route. A single attempt, no retries.
pub async fn deliver(route: Route, command: &Command, cloud: &CloudClient) -> Result<()> {
    match route {
        Route::Local(addr) => {
            info!("Using UDP to send command to {}", addr);
            send_local(addr, &command.to_bytes()?).await
        }
        Route::Cloud => {
            info!("Using cloud relay to send command for entity {}", command.entity_id);
            cloud.add_command(&command.to_hex()?).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_local_when_ip_known() {
        let ip: IpAddr = "192.168.1.20".parse().unwrap();
        assert_eq!(
            Route::for_hub(Some(ip)),
            Route::Local("192.168.1.20:2012".parse().unwrap())
        );
        assert_eq!(Route::for_hub(None), Route::Cloud);
    }

    #[tokio::test]
    async fn local_send_reaches_listener() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        send_local(addr, b"hello hub").await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = listener.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"hello hub");
    }
}
