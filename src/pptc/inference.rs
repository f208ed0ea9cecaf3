//! Orchestration of the pipeline and of the evidence-change callbacks.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    config::EngineConfig,
    error::{PptcError, Result},
    graph::{Bbn, JoinTree, JoinTreeListener, NodeId},
    pptc::{Initializer, Moralizer, PotentialInitializer, Propagator, Transformer, Triangulator},
};

/// Compiles BBNs into join trees and keeps them propagated.
///
/// Every tree the controller returns has the controller installed as its listener, so
/// evidence entered through [`JoinTree::update_evidences`] is propagated immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceController;

impl InferenceController {
    pub fn apply(bbn: &Bbn) -> Result<JoinTree> {
        InferenceController::apply_with_config(bbn, EngineConfig::default())
    }

    /// Runs the full pipeline on `bbn`.
    #[tracing::instrument(skip_all)]
    pub fn apply_with_config(bbn: &Bbn, config: EngineConfig) -> Result<JoinTree> {
        tracing::debug!(
            "Compiling a network of {} nodes and {} edges",
            bbn.node_count(),
            bbn.edge_count()
        );
        let node_potentials = PotentialInitializer::init(bbn, &config)?;
        let mut ug = Moralizer::moralize(bbn);
        let cliques = Triangulator::triangulate(&mut ug);
        let mut join_tree = Transformer::transform(&cliques);
        check_structure(bbn, &join_tree)?;

        join_tree.set_config(config);
        join_tree.set_parent_info(ug.parent_info().clone());
        join_tree.set_node_potentials(node_potentials);
        Initializer::initialize(&mut join_tree)?;
        Propagator::propagate(&mut join_tree)?;

        join_tree.set_listener(Arc::new(InferenceController));
        Ok(join_tree)
    }

    /// Forks `join_tree` with new CPTs for the given nodes, reusing its triangulation. The fork
    /// starts without evidence.
    #[tracing::instrument(skip_all)]
    pub fn reapply(join_tree: &JoinTree, cpts: &BTreeMap<NodeId, Vec<f64>>) -> Result<JoinTree> {
        let mut fork = join_tree.clone();
        fork.clear_listener();
        fork.clear_evidences();
        fork.update_bbn_cpts(cpts)?;
        InferenceController::rebuild(fork)
    }

    /// Restores the potentials of a deserialized join tree.
    #[tracing::instrument(skip_all)]
    pub fn apply_from_serde(mut join_tree: JoinTree) -> Result<JoinTree> {
        join_tree.clear_listener();
        InferenceController::rebuild(join_tree)
    }

    fn rebuild(mut join_tree: JoinTree) -> Result<JoinTree> {
        PotentialInitializer::reinit(&mut join_tree)?;
        Initializer::initialize(&mut join_tree)?;
        Propagator::propagate(&mut join_tree)?;
        join_tree.set_listener(Arc::new(InferenceController));
        Ok(join_tree)
    }
}

impl JoinTreeListener for InferenceController {
    fn evidence_retracted(&self, join_tree: &mut JoinTree) -> Result<()> {
        Initializer::initialize(join_tree)?;
        Propagator::propagate(join_tree)
    }

    fn evidence_updated(&self, join_tree: &mut JoinTree) -> Result<()> {
        Propagator::propagate(join_tree)
    }
}

/// A connected network must compile to a single tree: one tree edge fewer than cliques per
/// component.
fn check_structure(bbn: &Bbn, join_tree: &JoinTree) -> Result<()> {
    let components = bbn.component_count();
    let expected = join_tree.clique_count().saturating_sub(components);
    if join_tree.edge_count() != expected || join_tree.component_roots().len() != components {
        return Err(PptcError::Structure(format!(
            "join tree over {} cliques has {} edges, expected {expected} for {components} component(s)",
            join_tree.clique_count(),
            join_tree.edge_count()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{huang_graph, BbnNode, EvidenceBuilder, EvidenceType, Variable};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_log::test;

    #[derive(Default)]
    struct Counting {
        retracted: AtomicUsize,
        updated: AtomicUsize,
    }

    impl JoinTreeListener for Counting {
        fn evidence_retracted(&self, _: &mut JoinTree) -> Result<()> {
            self.retracted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn evidence_updated(&self, _: &mut JoinTree) -> Result<()> {
            self.updated.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_listener_sees_classified_changes() {
        let mut join_tree = InferenceController::apply(&huang_graph().unwrap()).unwrap();
        let counting = Arc::new(Counting::default());
        join_tree.set_listener(counting.clone());

        let a = join_tree.get_bbn_node_by_name("a").unwrap().clone();
        let observe = |value: &str| {
            EvidenceBuilder::new()
                .with_node(&a)
                .with_type(EvidenceType::Observation)
                .with_evidence(value, 1.0)
                .build()
                .unwrap()
        };

        join_tree.update_evidences(vec![observe("on")]).unwrap();
        join_tree.update_evidences(vec![observe("on")]).unwrap();
        join_tree.update_evidences(vec![observe("off")]).unwrap();
        join_tree.unobserve_all().unwrap();

        assert_eq!(counting.updated.load(Ordering::SeqCst), 1);
        assert_eq!(counting.retracted.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_network() {
        let join_tree = InferenceController::apply(&Bbn::new()).unwrap();
        assert_eq!(join_tree.clique_count(), 0);
        assert!(join_tree.get_posteriors().unwrap().is_empty());
    }

    #[test]
    fn test_single_node() {
        let mut bbn = Bbn::new();
        bbn.add_node(BbnNode::new(
            Variable::new(0, "coin", ["heads", "tails"]),
            vec![0.3, 0.7],
        ));
        let join_tree = InferenceController::apply(&bbn).unwrap();
        let posteriors = join_tree.get_posteriors().unwrap();
        assert!((posteriors["coin"]["heads"] - 0.3).abs() < 1e-12);
        assert!((posteriors["coin"]["tails"] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_reapply_rejects_unknown_nodes() {
        let join_tree = InferenceController::apply(&huang_graph().unwrap()).unwrap();
        let result = InferenceController::reapply(&join_tree, &BTreeMap::from([(42, vec![1.0])]));
        assert!(matches!(result, Err(PptcError::UnknownVariable(_))));

        let result = InferenceController::reapply(&join_tree, &BTreeMap::from([(0, vec![1.0])]));
        assert!(matches!(result, Err(PptcError::DimensionMismatch { .. })));
    }
}
