use routewatch::Runtime;
use routewatch::collectors::CaptureError;
use routewatch::config::AppConfig;
use routewatch::models::{DeviceDescriptor, TrapType};
use routewatch::snmp::memory::MemoryNetwork;
use routewatch::storage::SqliteStore;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;

/// Integration tests for the trap listener
/// Notifications are sent over loopback UDP to a listener bound on an ephemeral port

/// SNMPv2c trap, community "public": sysUpTime.0 = 4200,
/// snmpTrapOID.0 = linkDown, ifIndex.3 = 3
const LINK_DOWN_V2C: &str = "305202010104067075626c6963a745020107020100020100303a300e06082b06010201010300430210683017060a2b06010603010104010006092b0601060301010503300f060a2b060102010202010103020103";

/// SNMPv1 trap from enterprise 1.3.6.1.4.1.9, agent 127.0.0.1,
/// generic-trap linkUp, ifIndex.3 = 3
const LINK_UP_V1: &str = "303702010004067075626c6963a42a06062b060104010940047f0000010201030201004301643011300f060a2b060102010202010103020103";

/// SNMPv2c trap with an enterprise-specific snmpTrapOID.0 (1.3.6.1.4.1.9.0.1)
const ENTERPRISE_V2C: &str = "305102010104067075626c6963a7440201070201000201003039300e06082b06010201010300430210683016060a2b06010603010104010006082b06010401090001300f060a2b060102010202010103020103";

fn runtime() -> Runtime {
    let mut config = AppConfig::default();
    config.listener.bind_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.listener.port = 0;
    config.devices = vec![DeviceDescriptor::new("127.0.0.1", "lo-router")];
    Runtime::with_parts(
        config,
        Arc::new(MemoryNetwork::new()),
        Arc::new(SqliteStore::in_memory().unwrap()),
    )
}

async fn send(sender: &UdpSocket, message: &str, addr: std::net::SocketAddr) {
    let datagram = hex::decode(message).unwrap();
    sender.send_to(&datagram, addr).await.unwrap();
}

async fn wait_for_events(runtime: &Runtime, interface: &str, count: usize) -> Vec<routewatch::models::TrapEvent> {
    for _ in 0..100 {
        let events = runtime.traps().events("127.0.0.1", interface).unwrap();
        if events.len() >= count {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for {count} trap event(s) on {interface}");
}

#[tokio::test]
async fn test_end_to_end_delivery_and_classification() {
    let runtime = runtime();
    let addr = runtime.start_listener().await.unwrap();
    runtime.traps().start_capture("lo-router", "Gi0/1").unwrap();

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    // One at a time so arrival order is the send order
    send(&sender, LINK_DOWN_V2C, addr).await;
    wait_for_events(&runtime, "Gi0/1", 1).await;
    send(&sender, LINK_UP_V1, addr).await;
    wait_for_events(&runtime, "Gi0/1", 2).await;
    send(&sender, ENTERPRISE_V2C, addr).await;

    let events = wait_for_events(&runtime, "Gi0/1", 3).await;
    let types: Vec<TrapType> = events.iter().map(|e| e.trap_type).collect();
    assert_eq!(types, vec![TrapType::LinkDown, TrapType::LinkUp, TrapType::Unknown]);
    assert_eq!(
        events[0].vars.get("1.3.6.1.2.1.2.2.1.1.3").map(String::as_str),
        Some("3")
    );

    let status = runtime.traps().status("127.0.0.1", "Gi0/1").unwrap();
    assert!(status.capture_active);
    assert!(status.has_data);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_malformed_datagram_does_not_stop_listener() {
    let runtime = runtime();
    let addr = runtime.start_listener().await.unwrap();
    runtime.traps().start_capture("127.0.0.1", "Gi0/2").unwrap();

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.send_to(&[0x30, 0x82, 0xFF], addr).await.unwrap();
    sender.send_to(b"not an snmp message", addr).await.unwrap();
    send(&sender, LINK_DOWN_V2C, addr).await;

    let events = wait_for_events(&runtime, "Gi0/2", 1).await;
    assert_eq!(events[0].trap_type, TrapType::LinkDown);

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_listener_binds_once() {
    let runtime = runtime();
    runtime.start_listener().await.unwrap();
    assert!(matches!(
        runtime.start_listener().await,
        Err(CaptureError::AlreadyRunning)
    ));
    assert!(runtime.listener_addr().await.is_some());
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_starts_bind_a_single_listener() {
    let runtime = runtime();
    let (first, second) = tokio::join!(runtime.start_listener(), runtime.start_listener());

    let bound: Vec<_> = [&first, &second].into_iter().filter(|r| r.is_ok()).collect();
    assert_eq!(bound.len(), 1);
    assert!(
        matches!(first, Err(CaptureError::AlreadyRunning))
            || matches!(second, Err(CaptureError::AlreadyRunning))
    );
    assert_eq!(
        runtime.listener_addr().await,
        first.as_ref().or(second.as_ref()).ok().copied()
    );
    runtime.shutdown().await;
}

#[tokio::test]
async fn test_capture_requests() {
    let runtime = runtime();
    let traps = runtime.traps();

    traps.start_capture("127.0.0.1", "Gi0/1").unwrap();
    assert!(matches!(
        traps.start_capture("127.0.0.1", "Gi0/1"),
        Err(CaptureError::AlreadyActive(_))
    ));
    traps.stop_capture("127.0.0.1", "Gi0/1").unwrap();
    assert!(matches!(
        traps.stop_capture("127.0.0.1", "Gi0/1"),
        Err(CaptureError::NotActive(_))
    ));
    assert!(matches!(
        traps.start_capture("10.9.9.9", "Gi0/1"),
        Err(CaptureError::DeviceNotFound(_))
    ));

    let status = traps.status("127.0.0.1", "Gi0/1").unwrap();
    assert!(!status.capture_active);
    assert!(!status.has_data);
}
