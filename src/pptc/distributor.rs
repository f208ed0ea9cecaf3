use petgraph::graph::NodeIndex;
use std::collections::VecDeque;

use crate::{
    error::Result,
    graph::{potential::pass_single_message, JoinTree},
};

/// The outward pass: breadth first from the root, each clique pushes its now consistent
/// potential to its unvisited neighbors.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceDistributor {
    start: NodeIndex,
}

impl EvidenceDistributor {
    pub fn new(start: NodeIndex) -> Self {
        EvidenceDistributor { start }
    }

    pub fn start(&self, join_tree: &mut JoinTree) -> Result<()> {
        join_tree.mark(self.start);
        let mut queue = VecDeque::from([self.start]);

        while let Some(x) = queue.pop_front() {
            for (sep_set, y) in join_tree.neighboring_cliques(x) {
                if join_tree.is_marked(y) {
                    continue;
                }
                join_tree.mark(y);
                pass_single_message(join_tree, x, sep_set, y)?;
                queue.push_back(y);
            }
        }
        Ok(())
    }
}
