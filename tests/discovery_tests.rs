//! Discovery probe tests over loopback UDP.

mod common;

use common::*;
use ics2000::scanner::{DISCOVERY_PROBE, ProbeState, Scanner};
use ics2000::{HubBuilder, Route};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::oneshot;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Answers the first `answers` datagrams it receives and reports the first one.
async fn spawn_responder(answers: usize) -> (SocketAddr, oneshot::Receiver<Vec<u8>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut tx = Some(tx);
        let mut buf = [0u8; 256];
        for _ in 0..answers {
            let (len, from) = socket.recv_from(&mut buf).await.unwrap();
            socket.send_to(b"ICS-2000", from).await.unwrap();
            if let Some(tx) = tx.take() {
                let _ = tx.send(buf[..len].to_vec());
            }
        }
    });
    (addr, rx)
}

#[tokio::test]
async fn responder_is_found_before_timeout() {
    let (addr, probe_rx) = spawn_responder(1).await;
    let scanner = Scanner::new()
        .with_target(LOCALHOST)
        .with_port(addr.port())
        .with_timeout(Duration::from_secs(5));

    let started = Instant::now();
    let found = scanner.discover().await.unwrap();

    assert_eq!(found, Some(LOCALHOST));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(probe_rx.await.unwrap(), DISCOVERY_PROBE.to_vec());
}

#[tokio::test]
async fn silence_times_out_without_error() {
    // Bound but never answers.
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let timeout = Duration::from_millis(300);
    let scanner = Scanner::new()
        .with_target(LOCALHOST)
        .with_port(silent.local_addr().unwrap().port())
        .with_timeout(timeout);

    let started = Instant::now();
    let state = scanner.probe().await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(state, ProbeState::TimedOut);
    assert!(elapsed >= Duration::from_millis(250), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "hung for {elapsed:?}");
}

#[tokio::test]
async fn hub_uses_discovered_address() {
    let cloud = MockCloud::start(default_handler).await;
    let (addr, _probe_rx) = spawn_responder(2).await;

    let mut hub = HubBuilder::new(MAC, EMAIL, PASSWORD_HASH)
        .base_url(&cloud.base_url)
        .scanner(
            Scanner::new()
                .with_target(LOCALHOST)
                .with_port(addr.port())
                .with_timeout(Duration::from_secs(5)),
        )
        .connect()
        .await
        .unwrap();

    assert_eq!(hub.local_ip(), Some(LOCALHOST));
    assert!(matches!(hub.route(), Route::Local(a) if a.ip() == LOCALHOST));

    hub.set_local_ip(None);
    assert_eq!(hub.route(), Route::Cloud);

    assert_eq!(hub.rediscover().await, Some(LOCALHOST));
    assert!(matches!(hub.route(), Route::Local(_)));
}

#[tokio::test]
async fn disabled_discovery_never_probes() {
    let cloud = MockCloud::start(default_handler).await;
    let (addr, probe_rx) = spawn_responder(1).await;

    let hub = HubBuilder::new(MAC, EMAIL, PASSWORD_HASH)
        .base_url(&cloud.base_url)
        .discovery(false)
        .scanner(Scanner::new().with_target(LOCALHOST).with_port(addr.port()))
        .connect()
        .await
        .unwrap();

    assert_eq!(hub.local_ip(), None);
    assert!(
        tokio::time::timeout(Duration::from_millis(200), probe_rx)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn discovery_timeout_falls_back_to_cloud() {
    let cloud = MockCloud::start(default_handler).await;
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let hub = HubBuilder::new(MAC, EMAIL, PASSWORD_HASH)
        .base_url(&cloud.base_url)
        .scanner(
            Scanner::new()
                .with_target(LOCALHOST)
                .with_port(silent.local_addr().unwrap().port())
                .with_timeout(Duration::from_millis(200)),
        )
        .connect()
        .await
        .unwrap();

    assert_eq!(hub.local_ip(), None);
    assert_eq!(hub.route(), Route::Cloud);
    hub.turn_on(3).await.unwrap();
    assert_eq!(cloud.count("command.php"), 1);
}

#[tokio::test]
async fn scanner_socket_error_falls_back_to_cloud() {
    let cloud = MockCloud::start(default_handler).await;
    // IPv4 socket cannot reach an IPv6 target
    let scanner = Scanner::new()
        .with_target(IpAddr::V6(Ipv6Addr::LOCALHOST))
        .with_bind_addr(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .with_timeout(Duration::from_millis(200));
    assert!(scanner.discover().await.is_err());

    let mut hub = HubBuilder::new(MAC, EMAIL, PASSWORD_HASH)
        .base_url(&cloud.base_url)
        .scanner(scanner)
        .connect()
        .await
        .unwrap();

    assert_eq!(hub.route(), Route::Cloud);
    assert_eq!(hub.rediscover().await, None);
    hub.turn_off(3).await.unwrap();
    assert_eq!(cloud.count("command.php"), 1);
}
