use std::sync::Arc;

use crate::graph::{BbnNode, Clique, NodeId, Ug};

/// Greedy elimination. Optimal triangulation is NP-hard; this picks, at each step, the node
/// needing the fewest fill-in edges, breaking ties by clique weight and then by id.
pub struct Triangulator;

/// The elimination candidate formed by a node and its current neighbors.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeClique {
    pub node: NodeId,
    pub neighbors: Vec<NodeId>,
    pub weight: u64,
    pub edges: Vec<(NodeId, NodeId)>,
}

impl NodeClique {
    fn ranking(&self) -> (usize, u64, NodeId) {
        (self.edges.len(), self.weight, self.node)
    }

    fn get_bbn_nodes(&self, ug: &Ug) -> Vec<Arc<BbnNode>> {
        std::iter::once(self.node)
            .chain(self.neighbors.iter().copied())
            .filter_map(|id| ug.get_node(id).cloned())
            .collect()
    }
}

impl Triangulator {
    /// Triangulates `ug` in place and returns its maximal cliques in elimination order.
    pub fn triangulate(ug: &mut Ug) -> Vec<Clique> {
        let mut work = ug.clone();
        let mut cliques: Vec<Clique> = Vec::new();

        while let Some(candidate) = select_node(&work) {
            let clique = Clique::new(candidate.get_bbn_nodes(&work));
            if !is_subset(&cliques, &clique) {
                tracing::debug!("Eliminating {} yields clique {}", candidate.node, clique);
                cliques.push(clique);
            }

            for (a, b) in candidate.edges.iter() {
                work.add_edge(*a, *b);
                ug.add_edge(*a, *b);
            }
            work.remove_node(candidate.node);
        }

        tracing::debug!(
            "Triangulation found {} cliques, {} edges after fill-in",
            cliques.len(),
            ug.edge_count()
        );
        cliques
    }
}

/// The next node to eliminate, minimizing (fill-in, weight, id).
pub fn select_node(ug: &Ug) -> Option<NodeClique> {
    ug.get_nodes()
        .map(|node| {
            let id = node.id();
            NodeClique {
                node: id,
                neighbors: ug.get_neighbors(id),
                weight: get_weight(id, ug),
                edges: get_edges_to_add(id, ug),
            }
        })
        .min_by_key(NodeClique::ranking)
}

/// Size of the joint state space of `id` and its neighbors.
pub fn get_weight(id: NodeId, ug: &Ug) -> u64 {
    std::iter::once(id)
        .chain(ug.get_neighbors(id))
        .filter_map(|n| ug.get_node(n))
        .fold(1u64, |acc, n| acc.saturating_mul(n.weight()))
}

/// Edges missing between neighbors of `id`, as ascending `(low, high)` pairs.
pub fn get_edges_to_add(id: NodeId, ug: &Ug) -> Vec<(NodeId, NodeId)> {
    let neighbors = ug.get_neighbors(id);
    let mut edges = Vec::new();
    for (i, a) in neighbors.iter().enumerate() {
        for b in neighbors[i + 1..].iter() {
            if !ug.edge_exists(*a, *b) {
                edges.push((*a, *b));
            }
        }
    }
    edges
}

/// True when `clique` is contained in one of `cliques`.
pub fn is_subset(cliques: &[Clique], clique: &Clique) -> bool {
    cliques.iter().any(|c| c.is_superset(clique))
}
