use crate::{
    error::Result,
    graph::JoinTree,
    pptc::{EvidenceCollector, EvidenceDistributor},
};

/// Makes every clique potential consistent with its neighbors.
pub struct Propagator;

impl Propagator {
    /// Runs collect then distribute in every connected component, rooted at the component's
    /// lowest-key clique.
    pub fn propagate(join_tree: &mut JoinTree) -> Result<()> {
        let roots = join_tree.component_roots();
        for root in roots.iter() {
            join_tree.unmark_cliques();
            EvidenceCollector::new(*root).start(join_tree)?;

            join_tree.unmark_cliques();
            EvidenceDistributor::new(*root).start(join_tree)?;
        }
        join_tree.unmark_cliques();

        tracing::debug!("Propagated evidence through {} component(s)", roots.len());
        Ok(())
    }
}
