use routewatch::analyzers::{DiscoveryError, TopologyDiscovery};
use routewatch::inventory::Inventory;
use routewatch::models::{DeviceDescriptor, TopologySnapshot};
use routewatch::snmp::memory::{MemoryAgent, MemoryNetwork};
use routewatch::snmp::{Value, mib};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Integration tests for CDP topology discovery
/// Each device is an in-memory agent whose CDP cache lists (name, address) pairs

fn cdp_agent(name: &str, neighbors: &[(&str, &str)]) -> MemoryAgent {
    let agent = MemoryAgent::new(name);
    for (row, (neighbor, address)) in neighbors.iter().enumerate() {
        let row = row as u32 + 1;
        let octets = address
            .parse::<Ipv4Addr>()
            .expect("test addresses are IPv4")
            .octets()
            .to_vec();
        agent.set(
            mib::instance(mib::CDP_CACHE_DEVICE_ID, row),
            Value::OctetString(neighbor.as_bytes().to_vec().into()),
        );
        agent.set(
            mib::instance(mib::CDP_CACHE_ADDRESS, row),
            Value::OctetString(octets.into()),
        );
    }
    agent
}

fn discovery(network: &MemoryNetwork, seed: DeviceDescriptor) -> TopologyDiscovery {
    let inventory = Arc::new(Inventory::new(vec![seed]));
    TopologyDiscovery::new(inventory, Arc::new(network.clone()))
}

fn edges(snapshot: &TopologySnapshot) -> Vec<(String, String)> {
    snapshot
        .iter()
        .map(|edge| {
            let (a, b) = edge.endpoints();
            (a.to_string(), b.to_string())
        })
        .collect()
}

fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect()
}

#[tokio::test]
async fn test_triangle_cycle_terminates_with_three_edges() {
    let network = MemoryNetwork::new();
    network.add("10.0.0.1", cdp_agent("A", &[("B", "10.0.0.2"), ("C", "10.0.0.3")]));
    network.add("10.0.0.2", cdp_agent("B", &[("A", "10.0.0.1"), ("C", "10.0.0.3")]));
    network.add("10.0.0.3", cdp_agent("C", &[("B", "10.0.0.2"), ("A", "10.0.0.1")]));

    let snapshot = discovery(&network, DeviceDescriptor::new("10.0.0.1", "A"))
        .discover("A")
        .await
        .expect("discovery should succeed");

    assert_eq!(edges(&snapshot), pairs(&[("A", "B"), ("A", "C"), ("B", "C")]));
}

#[tokio::test]
async fn test_unreachable_neighbor_is_excluded() {
    let network = MemoryNetwork::new();
    network.add("10.0.0.1", cdp_agent("A", &[("B", "10.0.0.2"), ("D", "10.0.0.4")]));
    network.add("10.0.0.2", cdp_agent("B", &[("A", "10.0.0.1"), ("D", "10.0.0.4")]));
    // 10.0.0.4 never answers

    let snapshot = discovery(&network, DeviceDescriptor::new("10.0.0.1", "A"))
        .discover("10.0.0.1")
        .await
        .unwrap();

    assert_eq!(edges(&snapshot), pairs(&[("A", "B")]));
    assert!(snapshot.iter().all(|edge| !edge.touches("D")));
}

#[tokio::test]
async fn test_each_address_queried_once() {
    let network = MemoryNetwork::new();
    let a = network.add("10.0.0.1", cdp_agent("A", &[("B", "10.0.0.2")]));
    let b = network.add("10.0.0.2", cdp_agent("B", &[("A", "10.0.0.1")]));

    discovery(&network, DeviceDescriptor::new("10.0.0.1", "A"))
        .discover("A")
        .await
        .unwrap();

    // Two walks per visit: one entry each plus the terminating request
    assert_eq!(a.request_count(), 4);
    assert_eq!(b.request_count(), 4);
}

#[tokio::test]
async fn test_seed_without_neighbors_yields_empty_snapshot() {
    let network = MemoryNetwork::new();
    network.add("10.0.0.1", cdp_agent("A", &[]));

    let snapshot = discovery(&network, DeviceDescriptor::new("10.0.0.1", "A"))
        .discover("A")
        .await
        .unwrap();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn test_self_loop_dropped() {
    let network = MemoryNetwork::new();
    network.add("10.0.0.1", cdp_agent("A", &[("A", "10.0.0.1"), ("B", "10.0.0.2")]));
    network.add("10.0.0.2", cdp_agent("B", &[]));

    let snapshot = discovery(&network, DeviceDescriptor::new("10.0.0.1", "A"))
        .discover("A")
        .await
        .unwrap();
    assert_eq!(edges(&snapshot), pairs(&[("A", "B")]));
}

#[tokio::test]
async fn test_seed_outcomes() {
    let network = MemoryNetwork::new();
    let discovery = discovery(&network, DeviceDescriptor::new("10.0.0.1", "A"));

    assert!(matches!(
        discovery.discover("Z").await,
        Err(DiscoveryError::SeedNotFound(_))
    ));
    assert!(matches!(
        discovery.discover("A").await,
        Err(DiscoveryError::SeedUnreachable { .. })
    ));
}
