//! The Bayesian belief network: a DAG of [`BbnNode`]s.

use petgraph::{
    algo::connected_components,
    graph::{Graph, NodeIndex},
    Directed, Direction,
};
use std::{collections::BTreeMap, sync::Arc};

use super::{node::BbnNode, policy::EdgePolicy, variable::Variable, NodeId};
use crate::error::{PptcError, Result};

/// A BBN. Nodes live in a petgraph arena; edges are checked by an [`EdgePolicy::Acyclic`]
/// policy on insertion, so the graph is acyclic by construction.
///
/// Each child's parents are recorded in ascending id order, which is the order CPT rows are
/// flattened in.
#[derive(Debug, Clone)]
pub struct Bbn {
    graph: Graph<Arc<BbnNode>, (), Directed>,
    index: BTreeMap<NodeId, NodeIndex>,
    parents: BTreeMap<NodeId, Vec<NodeId>>,
    policy: EdgePolicy,
}

impl Default for Bbn {
    fn default() -> Self {
        Bbn {
            graph: Graph::new(),
            index: BTreeMap::new(),
            parents: BTreeMap::new(),
            policy: EdgePolicy::Acyclic,
        }
    }
}

impl Bbn {
    pub fn new() -> Self {
        Bbn::default()
    }

    /// Adds `node`, replacing any node with the same id (edges are kept).
    pub fn add_node(&mut self, node: BbnNode) -> &mut Self {
        let id = node.id();
        match self.index.get(&id) {
            Some(idx) => self.graph[*idx] = Arc::new(node),
            None => {
                let idx = self.graph.add_node(Arc::new(node));
                self.index.insert(id, idx);
            }
        }
        self
    }

    /// Adds the directed edge `parent -> child`.
    ///
    /// Returns `Ok(false)` when the edge is rejected: a self loop, an edge already present in
    /// either direction, or an edge that would close a cycle.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId) -> Result<bool> {
        let parent_idx = self.node_index(parent)?;
        let child_idx = self.node_index(child)?;

        if !self.policy.admits(&self.graph, parent_idx, child_idx) {
            tracing::warn!("Rejected edge {parent} -> {child}");
            return Ok(false);
        }

        self.graph.add_edge(parent_idx, child_idx, ());
        let parents = self.parents.entry(child).or_default();
        if let Err(pos) = parents.binary_search(&parent) {
            parents.insert(pos, parent);
        }
        Ok(true)
    }

    /// Like [`Bbn::add_edge`] but a rejected edge is a [`PptcError::Structure`] error.
    pub fn add_edge_checked(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.add_edge(parent, child)? {
            Ok(())
        } else {
            Err(PptcError::Structure(format!(
                "edge {parent} -> {child} is a self loop, a duplicate, or closes a cycle"
            )))
        }
    }

    fn node_index(&self, id: NodeId) -> Result<NodeIndex> {
        self.index
            .get(&id)
            .copied()
            .ok_or_else(|| PptcError::unknown_node(id))
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Arc<BbnNode>> {
        self.index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Nodes in ascending id order.
    pub fn get_nodes(&self) -> impl Iterator<Item = &Arc<BbnNode>> + '_ {
        self.index.values().map(move |idx| &self.graph[*idx])
    }

    pub fn get_node_by_name(&self, name: &str) -> Option<&Arc<BbnNode>> {
        self.get_nodes().find(|n| n.name() == name)
    }

    /// Parent ids of `id`, ascending.
    pub fn get_parents(&self, id: NodeId) -> &[NodeId] {
        self.parents.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Child ids of `id`, ascending.
    pub fn get_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(idx) = self.index.get(&id) else {
            return Vec::new();
        };
        let mut children = self
            .graph
            .neighbors_directed(*idx, Direction::Outgoing)
            .map(|child| self.graph[child].id())
            .collect::<Vec<NodeId>>();
        children.sort();
        children
    }

    /// True when the directed edge `parent -> child` exists.
    pub fn edge_exists(&self, parent: NodeId, child: NodeId) -> bool {
        match (self.index.get(&parent), self.index.get(&child)) {
            (Some(p), Some(c)) => self.graph.find_edge(*p, *c).is_some(),
            _ => false,
        }
    }

    /// All `(parent, child)` pairs, sorted.
    pub fn get_edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges = self
            .graph
            .raw_edges()
            .iter()
            .map(|e| (self.graph[e.source()].id(), self.graph[e.target()].id()))
            .collect::<Vec<(NodeId, NodeId)>>();
        edges.sort();
        edges
    }

    /// Ordered parent ids for every node, including parentless ones.
    pub fn parent_info(&self) -> BTreeMap<NodeId, Vec<NodeId>> {
        self.index
            .keys()
            .map(|id| (*id, self.get_parents(*id).to_vec()))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of weakly connected components.
    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// The eight-node reference network from Huang and Darwiche, "Inference in Belief Networks: A
/// Procedural Guide". All variables are binary over `on`/`off`.
pub fn huang_graph() -> Result<Bbn> {
    let on_off = |id: NodeId, name: &str, probs: Vec<f64>| {
        BbnNode::new(Variable::new(id, name, ["on", "off"]), probs)
    };

    let mut bbn = Bbn::new();
    bbn.add_node(on_off(0, "a", vec![0.5, 0.5]))
        .add_node(on_off(1, "b", vec![0.5, 0.5, 0.4, 0.6]))
        .add_node(on_off(2, "c", vec![0.7, 0.3, 0.2, 0.8]))
        .add_node(on_off(3, "d", vec![0.9, 0.1, 0.5, 0.5]))
        .add_node(on_off(4, "e", vec![0.3, 0.7, 0.6, 0.4]))
        .add_node(on_off(
            5,
            "f",
            vec![0.01, 0.99, 0.01, 0.99, 0.01, 0.99, 0.99, 0.01],
        ))
        .add_node(on_off(6, "g", vec![0.8, 0.2, 0.1, 0.9]))
        .add_node(on_off(
            7,
            "h",
            vec![0.05, 0.95, 0.95, 0.05, 0.95, 0.05, 0.95, 0.05],
        ));

    for (parent, child) in [
        (0, 1),
        (0, 2),
        (1, 3),
        (2, 4),
        (3, 5),
        (4, 5),
        (2, 6),
        (4, 7),
        (6, 7),
    ] {
        bbn.add_edge_checked(parent, child)?;
    }
    Ok(bbn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn binary(id: NodeId, name: &str) -> BbnNode {
        BbnNode::new(Variable::new(id, name, ["t", "f"]), vec![0.5, 0.5])
    }

    #[test]
    fn test_edges_are_checked() {
        let mut bbn = Bbn::new();
        bbn.add_node(binary(0, "a"))
            .add_node(binary(1, "b"))
            .add_node(binary(2, "c"));

        assert_eq!(bbn.add_edge(0, 1), Ok(true));
        assert_eq!(bbn.add_edge(1, 2), Ok(true));
        // duplicate, reverse duplicate, self loop, cycle
        assert_eq!(bbn.add_edge(0, 1), Ok(false));
        assert_eq!(bbn.add_edge(1, 0), Ok(false));
        assert_eq!(bbn.add_edge(2, 2), Ok(false));
        assert_eq!(bbn.add_edge(2, 0), Ok(false));
        assert!(matches!(
            bbn.add_edge_checked(2, 0),
            Err(PptcError::Structure(_))
        ));
        assert!(matches!(
            bbn.add_edge(0, 9),
            Err(PptcError::UnknownVariable(_))
        ));

        assert_eq!(bbn.edge_count(), 2);
        assert!(bbn.edge_exists(0, 1));
        assert!(!bbn.edge_exists(1, 0));
        assert_eq!(bbn.get_edges(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_parents_are_ascending_regardless_of_insertion_order() {
        let mut bbn = Bbn::new();
        bbn.add_node(binary(0, "a"))
            .add_node(binary(1, "b"))
            .add_node(binary(2, "c"))
            .add_node(binary(3, "d"));
        bbn.add_edge_checked(2, 3).unwrap();
        bbn.add_edge_checked(0, 3).unwrap();
        bbn.add_edge_checked(1, 3).unwrap();

        assert_eq!(bbn.get_parents(3), &[0, 1, 2]);
        assert_eq!(bbn.get_parents(0), &[] as &[NodeId]);
        assert_eq!(bbn.get_children(0), vec![3]);
        assert_eq!(bbn.parent_info().get(&3), Some(&vec![0, 1, 2]));
    }

    #[test]
    fn test_huang_graph() {
        let bbn = huang_graph().unwrap();
        assert_eq!(bbn.node_count(), 8);
        assert_eq!(bbn.edge_count(), 9);
        assert_eq!(bbn.get_parents(5), &[3, 4]);
        assert_eq!(bbn.get_parents(7), &[4, 6]);
        assert_eq!(bbn.get_children(2), vec![4, 6]);
        assert_eq!(bbn.component_count(), 1);
        assert_eq!(bbn.get_node_by_name("f").map(|n| n.id()), Some(5));
    }

    #[test]
    fn test_replacing_a_node_keeps_edges() {
        let mut bbn = Bbn::new();
        bbn.add_node(binary(0, "a")).add_node(binary(1, "b"));
        bbn.add_edge_checked(0, 1).unwrap();
        bbn.add_node(BbnNode::new(
            Variable::new(0, "a", ["t", "f"]),
            vec![0.9, 0.1],
        ));
        assert_eq!(bbn.node_count(), 2);
        assert!(bbn.edge_exists(0, 1));
        assert_eq!(bbn.get_node(0).map(|n| n.probs.clone()), Some(vec![0.9, 0.1]));
    }
}
