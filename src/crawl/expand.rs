// src/crawl/expand.rs
// =============================================================================
// The expansion step: turn a panorama's neighbor list into store rows.
//
// Each neighbor is checked against the boundary on the way in, so most new
// rows arrive with a definite within_boundary. Neighbors whose containment
// can't be decided are stored as unknown and get checked again when the
// frontier hands them out.
// =============================================================================

use crate::geometry::BoundaryGate;
use crate::lookup::NeighborRecord;
use crate::store::{BoundaryStatus, DiscoveredNode, NodeStore};

// Parameters:
//   store: where new neighbors are inserted
//   gate: classifies each neighbor before insertion
//   source_id: the node being expanded (marked expanded if it is inside)
//   neighbors: the source's neighbor list from the lookup
//
// Returns: how many previously unknown nodes were created
pub fn expand_node(
    store: &mut NodeStore,
    gate: &BoundaryGate,
    source_id: &str,
    neighbors: &[NeighborRecord],
) -> rusqlite::Result<usize> {
    let discovered: Vec<DiscoveredNode> = neighbors
        .iter()
        .filter(|n| n.id != source_id)
        .map(|n| DiscoveredNode {
            id: n.id.clone(),
            lat: n.lat,
            lon: n.lon,
            within_boundary: BoundaryStatus::from(gate.contains(n.lat, n.lon)),
        })
        .collect();

    store.expand(source_id, &discovered)
}
