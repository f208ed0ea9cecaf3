use petgraph::graph::NodeIndex;

use crate::{
    error::{PptcError, Result},
    graph::{potential::multiply, BbnNode, JoinTree},
};

/// Seeds clique potentials: all ones, times every owned node factor, times the active evidence.
pub struct Initializer;

impl Initializer {
    pub fn initialize(join_tree: &mut JoinTree) -> Result<()> {
        join_tree.reset_potentials();

        let nodes = join_tree
            .get_bbn_nodes()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        for node in nodes.iter() {
            let clique = get_clique(join_tree, node)?;
            let factor = join_tree.node_potential(node.id()).cloned().ok_or_else(|| {
                PptcError::Structure(format!("no factor was built for {}", node.name()))
            })?;
            if let Some(potential) = join_tree.get_potential_mut(clique) {
                multiply(potential, &factor);
            }
        }

        for node in nodes.iter() {
            let clique = get_clique(join_tree, node)?;
            for value in node.variable.values.iter() {
                let evidence = join_tree.get_evidence(node, value);
                if let Some(potential) = join_tree.get_potential_mut(clique) {
                    multiply(potential, &evidence);
                }
            }
        }

        tracing::debug!(
            "Initialized {} clique potentials",
            join_tree.clique_count()
        );
        Ok(())
    }
}

/// The clique owning `node`, resolved once and cached on the join tree.
pub fn get_clique(join_tree: &mut JoinTree, node: &BbnNode) -> Result<NodeIndex> {
    join_tree.resolve_owner(node.id())
}
