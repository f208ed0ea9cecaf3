use std::{collections::BTreeMap, sync::Arc};

use crate::{
    config::EngineConfig,
    error::Result,
    graph::{potential::get_potential, BbnNode, Bbn, JoinTree, NodeId, Potential},
};

/// Builds the factor `P(node | parents)` of every BBN node.
pub struct PotentialInitializer;

impl PotentialInitializer {
    pub fn init(bbn: &Bbn, config: &EngineConfig) -> Result<BTreeMap<NodeId, Potential>> {
        bbn.get_nodes()
            .map(|node| {
                let parents = bbn
                    .get_parents(node.id())
                    .iter()
                    .filter_map(|pa| bbn.get_node(*pa).cloned())
                    .collect::<Vec<Arc<BbnNode>>>();
                let potential = factor(node, &parents, config)?;
                Ok((node.id(), potential))
            })
            .collect()
    }

    /// Rebuilds the factors from the join tree's own nodes and parent lists and stores them on
    /// the tree.
    pub fn reinit(join_tree: &mut JoinTree) -> Result<()> {
        let config = join_tree.config().clone();
        let potentials = join_tree
            .get_bbn_node_and_parents()
            .into_iter()
            .map(|(node, parents)| Ok((node.id(), factor(&node, &parents, &config)?)))
            .collect::<Result<BTreeMap<NodeId, Potential>>>()?;
        join_tree.set_node_potentials(potentials);
        Ok(())
    }
}

fn factor(node: &Arc<BbnNode>, parents: &[Arc<BbnNode>], config: &EngineConfig) -> Result<Potential> {
    let potential = get_potential(node, parents)?;
    check_rows(node, config.cpt_tolerance);
    Ok(potential)
}

/// Warns about CPT rows that are not distributions.
fn check_rows(node: &BbnNode, tolerance: f64) {
    let width = node.variable.cardinality();
    if width == 0 {
        return;
    }
    for (row, probs) in node.probs.chunks(width).enumerate() {
        let total = probs.iter().sum::<f64>();
        if (total - 1.0).abs() > tolerance {
            tracing::warn!(
                "CPT row {row} of {} sums to {total:.6}, not 1",
                node.name()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::PptcError,
        graph::{huang_graph, Variable},
    };
    use test_log::test;

    #[test]
    fn test_factors_follow_parent_order() {
        let bbn = huang_graph().unwrap();
        let factors = PotentialInitializer::init(&bbn, &EngineConfig::default()).unwrap();
        assert_eq!(factors.len(), 8);

        // f has parents d and e; e varies before f
        let f = &factors[&5];
        assert_eq!(f.len(), 8);
        assert_eq!(f.entries[2].entries[&3], "on");
        assert_eq!(f.entries[2].entries[&4], "off");
        assert_eq!(f.entries[2].entries[&5], "on");
        assert_eq!(f.entries[2].value, 0.01);
        assert_eq!(f.entries[6].value, 0.99);
    }

    #[test]
    fn test_bad_cpt_length_fails_fast() {
        let mut bbn = Bbn::new();
        bbn.add_node(BbnNode::new(Variable::new(0, "a", ["t", "f"]), vec![0.5, 0.5]))
            .add_node(BbnNode::new(Variable::new(1, "b", ["t", "f"]), vec![0.5, 0.5]));
        bbn.add_edge_checked(0, 1).unwrap();

        let result = PotentialInitializer::init(&bbn, &EngineConfig::default());
        assert_eq!(
            result,
            Err(PptcError::DimensionMismatch {
                node: "b".to_string(),
                expected: 4,
                actual: 2
            })
        );
    }

    #[test]
    fn test_unnormalized_rows_are_tolerated() {
        let mut bbn = Bbn::new();
        bbn.add_node(BbnNode::new(Variable::new(0, "a", ["t", "f"]), vec![2.0, 3.0]));
        let factors = PotentialInitializer::init(&bbn, &EngineConfig::default()).unwrap();
        assert_eq!(factors[&0].values(), vec![2.0, 3.0]);
    }
}
