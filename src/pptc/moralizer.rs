use crate::graph::{Bbn, Ug};

/// Turns the BBN into its moral graph.
pub struct Moralizer;

impl Moralizer {
    /// Drops edge directions and marries every pair of co-parents. Each node's ordered parents
    /// travel along as metadata.
    pub fn moralize(bbn: &Bbn) -> Ug {
        let mut ug = Ug::new();
        for node in bbn.get_nodes() {
            ug.add_node(node.clone());
        }
        for (parent, child) in bbn.get_edges() {
            ug.add_edge(parent, child);
        }

        for node in bbn.get_nodes() {
            let parents = bbn.get_parents(node.id());
            for (i, a) in parents.iter().enumerate() {
                for b in parents[i + 1..].iter() {
                    ug.add_edge(*a, *b);
                }
            }
            ug.set_parents(node.id(), parents.to_vec());
        }

        tracing::debug!(
            "Moralized {} nodes: {} directed edges became {} undirected",
            ug.node_count(),
            bbn.edge_count(),
            ug.edge_count()
        );
        ug
    }
}
