use petgraph::graphmap::UnGraphMap;
use std::{collections::BTreeMap, sync::Arc};

use super::{node::BbnNode, NodeId};

/// Undirected graph over BBN nodes, used for the moral graph and its triangulation.
///
/// Edges are simple: self loops and parallel edges are ignored.
#[derive(Debug, Clone, Default)]
pub struct Ug {
    graph: UnGraphMap<NodeId, ()>,
    nodes: BTreeMap<NodeId, Arc<BbnNode>>,
    parents: BTreeMap<NodeId, Vec<NodeId>>,
}

impl Ug {
    pub fn new() -> Self {
        Ug::default()
    }

    pub fn add_node(&mut self, node: Arc<BbnNode>) -> &mut Self {
        self.graph.add_node(node.id());
        self.nodes.insert(node.id(), node);
        self
    }

    /// Adds the edge `a -- b`. Returns false for self loops, existing edges and unknown nodes.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b || !self.nodes.contains_key(&a) || !self.nodes.contains_key(&b) {
            return false;
        }
        if self.graph.contains_edge(a, b) {
            return false;
        }
        self.graph.add_edge(a, b, ());
        true
    }

    pub fn remove_node(&mut self, id: NodeId) -> Option<Arc<BbnNode>> {
        self.graph.remove_node(id);
        self.nodes.remove(&id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Arc<BbnNode>> {
        self.nodes.get(&id)
    }

    /// Nodes in ascending id order.
    pub fn get_nodes(&self) -> impl Iterator<Item = &Arc<BbnNode>> + '_ {
        self.nodes.values()
    }

    /// Neighbor ids of `id`, ascending.
    pub fn get_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        if !self.graph.contains_node(id) {
            return Vec::new();
        }
        let mut neighbors = self.graph.neighbors(id).collect::<Vec<NodeId>>();
        neighbors.sort();
        neighbors
    }

    pub fn edge_exists(&self, a: NodeId, b: NodeId) -> bool {
        self.graph.contains_edge(a, b)
    }

    /// All edges as `(low, high)` id pairs, sorted.
    pub fn get_edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges = self
            .graph
            .all_edges()
            .map(|(a, b, _)| (a.min(b), a.max(b)))
            .collect::<Vec<(NodeId, NodeId)>>();
        edges.sort();
        edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records the ordered parent ids of `id` (moralization metadata).
    pub fn set_parents(&mut self, id: NodeId, parents: Vec<NodeId>) {
        self.parents.insert(id, parents);
    }

    pub fn get_parents(&self, id: NodeId) -> &[NodeId] {
        self.parents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent_info(&self) -> &BTreeMap<NodeId, Vec<NodeId>> {
        &self.parents
    }
}
