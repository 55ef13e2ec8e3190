/*!
The road network

Cells are the nodes of an undirected petgraph graph, roads its edges. Every
road carries one of six categories, and the weight of a category is a model
parameter, so edges store the category and weights are looked up when needed.
 */

use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

use crate::graph::Cell;
use crate::parameters::{Parameters, RoadCategory};

pub type RoadNetwork = petgraph::Graph<Cell, RoadCategory, petgraph::Undirected, usize>;
pub type NodeId = petgraph::graph::NodeIndex<usize>;

/**
The weight of the road connection from `source` to each of its direct
neighbours. Where several roads connect the same two cells, the best one
counts. Cells without a direct road are not listed; their weight is `wmin`.
 */
pub fn road_weights_around(
    network: &RoadNetwork,
    source: NodeId,
    p: &Parameters,
) -> FxHashMap<NodeId, f64> {
    let mut weights: FxHashMap<NodeId, f64> = FxHashMap::default();
    for edge in network.edges(source) {
        let neighbour = if edge.source() == source {
            edge.target()
        } else {
            edge.source()
        };
        if neighbour == source {
            continue;
        }
        let w = p.road_weight(*edge.weight());
        let best = weights.entry(neighbour).or_insert(w);
        if *best < w {
            *best = w;
        }
    }
    weights
}

/// The sum of the weights of all roads touching a cell.
pub fn weights_sum(network: &RoadNetwork, node: NodeId, p: &Parameters) -> f64 {
    network.edges(node).map(|e| p.road_weight(*e.weight())).sum()
}
