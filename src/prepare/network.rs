//! Granting a DRT mode to network links inside the service area.
use crate::network::{LinkId, Network, NodeId, modes};
use crate::service_area::ServiceArea;
use anyhow::{Result, bail};
use log::info;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{Graph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

/// Link counts observed while augmenting the network for one DRT mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AugmentCounts {
    /// Links examined
    pub total: usize,
    /// Car links touching the service area (DRT mode added)
    pub inside: usize,
    /// Car links entirely outside the service area
    pub outside: usize,
    /// Links that lost the DRT mode again in the connectivity repair
    pub disconnected: usize,
}

/// Allow `drt_mode` on every car link with at least one endpoint inside the service area, then
/// repair connectivity of the resulting DRT subnetwork.
///
/// Precondition: every link allows car or pt (or both). A link allowing neither makes the
/// network unusable for this scenario and aborts preparation.
///
/// The network is mutated in place; a copy of a city-scale network is prohibitive. Callers must
/// not run this concurrently with readers of the network.
pub fn add_drt_mode(
    network: &mut Network,
    drt_mode: &str,
    service_area: &ServiceArea,
) -> Result<AugmentCounts> {
    info!("Adjusting network for mode {drt_mode}...");

    let mut counts = AugmentCounts::default();
    let nodes = &network.nodes;
    for link in network.links.values_mut() {
        if counts.total % 10_000 == 0 {
            info!("link #{}", counts.total);
        }
        counts.total += 1;

        if link.allowed_modes.contains(modes::CAR) {
            let from = nodes[&link.from].coord;
            let to = nodes[&link.to].coord;
            if service_area.contains(from) || service_area.contains(to) {
                link.allowed_modes.insert(drt_mode.to_string());
                counts.inside += 1;
            } else {
                counts.outside += 1;
            }
        } else if link.allowed_modes.contains(modes::PT) {
            // skip pt links
        } else {
            bail!(
                "Link {} allows neither car nor pt; refusing to prepare a corrupt network",
                link.id
            );
        }
    }

    info!("Total links: {}", counts.total);
    info!("Total links inside service area: {}", counts.inside);
    info!("Total links outside service area: {}", counts.outside);

    counts.disconnected = reduce_to_largest_component(network, drt_mode);
    info!(
        "Removed {drt_mode} from {} links not connected to the main service area",
        counts.disconnected
    );

    Ok(counts)
}

/// Restrict `mode` to the largest strongly connected component of the links carrying it.
///
/// Connectivity is computed on the link adjacency (link A feeds link B iff A ends at the node B
/// starts from), so that after the repair a vehicle on any surviving link can reach every other
/// surviving link. Links outside the chosen component keep all their other modes.
///
/// Ties between equal-sized components go to the component containing the earliest link in
/// network iteration order, which makes repeated runs on equal inputs identical.
fn reduce_to_largest_component(network: &mut Network, mode: &str) -> usize {
    let mode_links: Vec<(LinkId, NodeId, NodeId)> = network
        .links
        .values()
        .filter(|link| link.allowed_modes.contains(mode))
        .map(|link| (link.id.clone(), link.from.clone(), link.to.clone()))
        .collect();
    if mode_links.is_empty() {
        return 0;
    }

    // One graph node per link; adjacency follows driveable continuations.
    let mut graph = Graph::<(), ()>::new();
    let indices: Vec<NodeIndex> = mode_links.iter().map(|_| graph.add_node(())).collect();
    let mut outgoing_at_node: HashMap<&NodeId, Vec<usize>> = HashMap::new();
    for (i, (_, from, _)) in mode_links.iter().enumerate() {
        outgoing_at_node.entry(from).or_default().push(i);
    }
    for (i, (_, _, to)) in mode_links.iter().enumerate() {
        if let Some(successors) = outgoing_at_node.get(to) {
            for &j in successors {
                graph.add_edge(indices[i], indices[j], ());
            }
        }
    }

    let components = kosaraju_scc(&graph);
    let keep = components
        .iter()
        .max_by_key(|component| {
            let earliest = component.iter().map(|idx| idx.index()).min().unwrap();
            (component.len(), Reverse(earliest))
        })
        .unwrap();
    let keep: HashSet<usize> = keep.iter().map(|idx| idx.index()).collect();

    let mut removed = 0;
    for (i, (link_id, _, _)) in mode_links.iter().enumerate() {
        if keep.contains(&i) {
            continue;
        }
        if let Some(link) = network.links.get_mut(link_id) {
            link.allowed_modes.shift_remove(mode);
            removed += 1;
        }
    }

    removed
}
