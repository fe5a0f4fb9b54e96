//! Local hub discovery.
//! Broadcasts the hub discovery datagram and records the first responder's address.

use crate::error::Result;
use crate::protocol::HUB_PORT;
use log::{debug, info, warn};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tokio::time::{Duration, Instant, sleep, timeout_at};

/// Discovery datagram understood by the hub.
pub const DISCOVERY_PROBE: [u8; 43] = [
    0x01, 0x00, 0x03, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xca, 0x00, 0x00, 0x00, 0x01, 0x04,
    0x00, 0x04, 0x47, 0x95, 0x00, 0x04, 0x01, 0x04, 0x00, 0x04, 0x00, 0x04, 0x00, 0x04, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x30, 0x00,
];

pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Outcome of a discovery run. `None` means no hub answered in time.
pub type DiscoveryResult = Option<IpAddr>;

/// Progress of a single discovery run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Idle,
    Probing,
    Found(IpAddr),
    TimedOut,
}

impl ProbeState {
    pub fn is_finished(&self) -> bool {
        matches!(self, ProbeState::Found(_) | ProbeState::TimedOut)
    }

    pub fn address(&self) -> DiscoveryResult {
        match self {
            ProbeState::Found(ip) => Some(*ip),
            _ => None,
        }
    }
}

/// Scanner locates the hub on the local network with one UDP broadcast.
#[derive(Debug, Clone)]
pub struct Scanner {
    /// How long to wait for a response
    pub timeout: Duration,
    /// Local address to bind to
    pub bind_addr: SocketAddr,
    /// Destination of the probe (broadcast by default)
    pub target: IpAddr,
    /// Destination port
    pub port: u16,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            target: IpAddr::V4(Ipv4Addr::BROADCAST),
            port: HUB_PORT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_target(mut self, target: IpAddr) -> Self {
        self.target = target;
        self
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Create a broadcast-enabled, non-blocking UDP socket.
    fn create_socket(&self) -> Result<UdpSocket> {
        let socket = Socket::new(
            Domain::for_address(self.bind_addr),
            Type::DGRAM,
            Some(Protocol::UDP),
        )?;

        if let Err(e) = socket.set_broadcast(true) {
            warn!("Failed to set broadcast on discovery socket: {}", e);
        }

        socket.bind(&SockAddr::from(self.bind_addr))?;
        socket.set_nonblocking(true)?;

        let std_socket: std::net::UdpSocket = socket.into();
        Ok(UdpSocket::from_std(std_socket)?)
    }

    /// Finds the hub's local IP address.
    ///
    /// Sends the probe once and returns the source address of the first datagram
    /// received before the timeout. A timeout is not an error: it yields `Ok(None)`.
    pub async fn discover(&self) -> Result<DiscoveryResult> {
        Ok(self.probe().await?.address())
    }

    /// Runs one probe to completion and reports the final state.
    pub async fn probe(&self) -> Result<ProbeState> {
        let mut state = ProbeState::Idle;
        debug!("Discovery state: {:?}", state);

        let socket = self.create_socket()?;
        let destination = SocketAddr::new(self.target, self.port);
        let deadline = Instant::now() + self.timeout;

        info!(
            "Searching for hub via {} (timeout {:?})...",
            destination, self.timeout
        );
        socket.send_to(&DISCOVERY_PROBE, destination).await?;
        state = ProbeState::Probing;
        debug!("Discovery state: {:?}", state);

        let mut buf = [0u8; 1024];
        while !state.is_finished() {
            state = match timeout_at(deadline, socket.recv_from(&mut buf)).await {
                Ok(Ok((len, addr))) => {
                    debug!("Received {} bytes from {}", len, addr);
                    ProbeState::Found(addr.ip())
                }
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::WouldBlock => state,
                Ok(Err(e)) => {
                    debug!("Ignoring receive error during discovery: {}", e);
                    sleep(RECV_ERROR_BACKOFF).await;
                    state
                }
                Err(_) => ProbeState::TimedOut,
            };
        }

        match state {
            ProbeState::Found(ip) => info!("Found hub at {}", ip),
            _ => info!("No hub answered within {:?}", self.timeout),
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_matches_hub_discovery_literal() {
        assert_eq!(
            hex::encode(DISCOVERY_PROBE),
            "010003ffffffffffffca000000010400044795000401040004000400040000000000000000020000003000"
        );
    }

    #[test]
    fn defaults() {
        let scanner = Scanner::new();
        assert_eq!(scanner.timeout, Duration::from_secs(10));
        assert_eq!(scanner.port, 2012);
        assert_eq!(scanner.target, IpAddr::V4(Ipv4Addr::new(255, 255, 255, 255)));
    }

    #[test]
    fn state_address() {
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        assert_eq!(ProbeState::Found(ip).address(), Some(ip));
        assert_eq!(ProbeState::TimedOut.address(), None);
        assert!(!ProbeState::Probing.is_finished());
    }
}
