//! The road network: nodes, links and their allowed transport modes.
use crate::id::define_id_type;
use crate::input::read_vec_from_csv;
use crate::utils::try_insert;
use anyhow::{Context, Result, ensure};
use geo::Coord;
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::path::Path;

/// Names of the built-in transport modes of the baseline scenario.
pub mod modes {
    /// Private car traffic.
    pub const CAR: &str = "car";
    /// Scheduled public transit.
    pub const PT: &str = "pt";
    /// Walking.
    pub const WALK: &str = "walk";
    /// Cycling.
    pub const BIKE: &str = "bike";
}

define_id_type!(NodeId);
define_id_type!(LinkId);

/// A node of the road network, positioned in the scenario's coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The unique identifier of this node
    pub id: NodeId,
    /// Position in the scenario CRS (metres)
    pub coord: Coord<f64>,
}

/// A directed edge of the road network.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// The unique identifier of this link
    pub id: LinkId,
    /// The node this link starts at
    pub from: NodeId,
    /// The node this link ends at
    pub to: NodeId,
    /// Length in metres
    pub length: f64,
    /// The transport modes allowed on this link
    pub allowed_modes: IndexSet<String>,
}

/// The road network of the scenario.
///
/// Both maps preserve file order, so iteration is deterministic across runs with equal inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network {
    /// All nodes, keyed by ID
    pub nodes: IndexMap<NodeId, Node>,
    /// All links, keyed by ID
    pub links: IndexMap<LinkId, Link>,
}

/// Represents a row of the nodes CSV file
#[derive(Debug, Deserialize)]
struct NodeRow {
    id: String,
    x: f64,
    y: f64,
}

/// Represents a row of the links CSV file
#[derive(Debug, Deserialize)]
struct LinkRow {
    id: String,
    from: String,
    to: String,
    length: f64,
    /// Comma-separated list of allowed modes, e.g. `"car,bike"`
    modes: String,
}

impl Network {
    /// Read a network from nodes and links CSV files.
    ///
    /// # Arguments
    ///
    /// * `nodes_file_path` - Path to the nodes CSV file
    /// * `links_file_path` - Path to the links CSV file
    pub fn from_csv(nodes_file_path: &Path, links_file_path: &Path) -> Result<Network> {
        let mut network = Network::default();

        for row in read_vec_from_csv::<NodeRow>(nodes_file_path)? {
            let node = Node {
                id: NodeId::new(&row.id),
                coord: Coord { x: row.x, y: row.y },
            };
            try_insert(&mut network.nodes, node.id.clone(), node)
                .with_context(|| format!("Duplicate node in {}", nodes_file_path.display()))?;
        }

        for row in read_vec_from_csv::<LinkRow>(links_file_path)? {
            let link = Link {
                id: LinkId::new(&row.id),
                from: NodeId::new(&row.from),
                to: NodeId::new(&row.to),
                length: row.length,
                allowed_modes: row
                    .modes
                    .split(',')
                    .filter(|mode| !mode.is_empty())
                    .map(str::to_string)
                    .collect(),
            };
            ensure!(
                link.length >= 0.0,
                "Link {} has negative length {}",
                link.id,
                link.length
            );
            ensure!(
                !link.allowed_modes.is_empty(),
                "Link {} has no allowed modes",
                link.id
            );
            for node_id in [&link.from, &link.to] {
                ensure!(
                    network.nodes.contains_key(node_id),
                    "Link {} references unknown node {}",
                    link.id,
                    node_id
                );
            }
            try_insert(&mut network.links, link.id.clone(), link)
                .with_context(|| format!("Duplicate link in {}", links_file_path.display()))?;
        }

        Ok(network)
    }

    /// The coordinates of a link's endpoints.
    ///
    /// Panics if the link references nodes not present in the network; `from_csv` guarantees
    /// they are.
    pub fn link_endpoints(&self, link: &Link) -> (Coord<f64>, Coord<f64>) {
        (self.nodes[&link.from].coord, self.nodes[&link.to].coord)
    }
}
