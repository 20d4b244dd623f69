// TopologyDiscovery: reconstructs the physical adjacency graph from CDP neighbor tables
// Traverses depth-first from a seed device without recursion
// Keeps only edges whose two endpoints answered their own neighbor query

use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

use crate::collectors::DeviceInfoCollector;
use crate::inventory::Inventory;
use crate::models::{DeviceDescriptor, NeighborRecord, TopologyEdge, TopologySnapshot};
use crate::snmp::{Connector, SnmpError};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Seed device not found: {0}")]
    SeedNotFound(String),

    #[error("Seed device {seed} is unreachable: {source}")]
    SeedUnreachable {
        seed: String,
        #[source]
        source: SnmpError,
    },
}

/// Result of querying one device's neighbor table
#[derive(Debug)]
pub enum VisitOutcome {
    Reached(Vec<NeighborRecord>),
    Unreachable(SnmpError),
}

/// A device met during traversal
#[derive(Debug)]
struct Node {
    descriptor: DeviceDescriptor,
    outcome: Option<VisitOutcome>,
}

/// Depth-first topology discovery over live devices
///
/// Neighbors are contacted with the seed's community and port. Each address
/// is queried at most once; devices reachable under several addresses are
/// visited once per address.
///
/// # Example
///
/// ```rust,ignore
/// let discovery = TopologyDiscovery::new(inventory, connector);
/// let snapshot = discovery.discover("R4.redes.local").await?;
/// for edge in snapshot.iter() {
///     println!("{:?}", edge.endpoints());
/// }
/// ```
pub struct TopologyDiscovery {
    inventory: Arc<Inventory>,
    connector: Arc<dyn Connector>,
}

impl TopologyDiscovery {
    pub fn new(inventory: Arc<Inventory>, connector: Arc<dyn Connector>) -> Self {
        Self {
            inventory,
            connector,
        }
    }

    /// Discovers the topology reachable from the inventory device named by `seed`
    pub async fn discover(&self, seed: &str) -> Result<TopologySnapshot, DiscoveryError> {
        let seed = self
            .inventory
            .find(seed)
            .cloned()
            .ok_or_else(|| DiscoveryError::SeedNotFound(seed.to_string()))?;
        self.discover_from(seed).await
    }

    /// Discovers the topology reachable from an explicit seed descriptor
    pub async fn discover_from(
        &self,
        seed: DeviceDescriptor,
    ) -> Result<TopologySnapshot, DiscoveryError> {
        info!(
            "Starting topology discovery (seed={}, address={})",
            seed.display_name, seed.address
        );
        let community = seed.community.clone();
        let port = seed.port;

        // Arena of nodes, indexed by address
        let mut nodes: Vec<Node> = vec![Node {
            descriptor: seed,
            outcome: None,
        }];
        let mut by_address: HashMap<String, usize> = HashMap::new();
        by_address.insert(nodes[0].descriptor.address.clone(), 0);

        let mut visited: HashSet<String> = HashSet::new();
        let mut discovered: HashSet<String> = HashSet::new();
        let mut candidates: Vec<TopologyEdge> = Vec::new();
        let mut worklist: Vec<usize> = vec![0];

        while let Some(current) = worklist.pop() {
            if !visited.insert(nodes[current].descriptor.address.clone()) {
                continue;
            }

            let neighbors = match self.visit(&nodes[current].descriptor).await {
                VisitOutcome::Reached(neighbors) => neighbors,
                VisitOutcome::Unreachable(source) if current == 0 => {
                    return Err(DiscoveryError::SeedUnreachable {
                        seed: nodes[0].descriptor.display_name.clone(),
                        source,
                    });
                }
                outcome => {
                    nodes[current].outcome = Some(outcome);
                    continue;
                }
            };

            let name = nodes[current].descriptor.display_name.clone();
            discovered.insert(name.clone());

            for neighbor in &neighbors {
                candidates.push(TopologyEdge::new(&name, &neighbor.display_name));
            }

            // Reverse push so neighbors are visited in table order
            let mut next = Vec::new();
            for neighbor in &neighbors {
                if neighbor.address.is_empty() || visited.contains(&neighbor.address) {
                    continue;
                }
                let index = *by_address.entry(neighbor.address.clone()).or_insert_with(|| {
                    nodes.push(Node {
                        descriptor: DeviceDescriptor::new(
                            neighbor.address.clone(),
                            neighbor.display_name.clone(),
                        )
                        .with_community(community.clone())
                        .with_port(port),
                        outcome: None,
                    });
                    nodes.len() - 1
                });
                next.push(index);
            }
            worklist.extend(next.into_iter().rev());

            nodes[current].outcome = Some(VisitOutcome::Reached(neighbors));
        }

        let unreachable = nodes
            .iter()
            .filter(|node| matches!(node.outcome, Some(VisitOutcome::Unreachable(_))))
            .count();
        let snapshot: TopologySnapshot = candidates
            .into_iter()
            .filter(|edge| {
                let (a, b) = edge.endpoints();
                discovered.contains(a) && discovered.contains(b)
            })
            .collect();

        info!(
            "Topology discovery finished (visited={}, discovered={}, unreachable={}, edges={})",
            visited.len(),
            discovered.len(),
            unreachable,
            snapshot.len()
        );
        Ok(snapshot)
    }

    async fn visit(&self, device: &DeviceDescriptor) -> VisitOutcome {
        let collector = DeviceInfoCollector::new(self.connector.connect(device));
        match collector.neighbors_checked().await {
            Ok(neighbors) => {
                debug!(
                    "Visited {} at {} (neighbors={})",
                    device.display_name,
                    device.address,
                    neighbors.len()
                );
                VisitOutcome::Reached(neighbors)
            }
            Err(e) => {
                warn!(
                    "Could not access {} at {}: {}",
                    device.display_name, device.address, e
                );
                VisitOutcome::Unreachable(e)
            }
        }
    }
}
