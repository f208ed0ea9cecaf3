use petgraph::graph::NodeIndex;

use crate::{
    error::Result,
    graph::{potential::pass_single_message, JoinTree},
};

/// The inward pass: every clique sends a message to its parent once all of its children have
/// reported, ending at the root.
#[derive(Debug, Clone, Copy)]
pub struct EvidenceCollector {
    start: NodeIndex,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    clique: NodeIndex,
    // (separation set, parent clique)
    parent: Option<(NodeIndex, NodeIndex)>,
    expanded: bool,
}

impl EvidenceCollector {
    pub fn new(start: NodeIndex) -> Self {
        EvidenceCollector { start }
    }

    /// Iterative post-order walk from the start clique over unmarked cliques.
    pub fn start(&self, join_tree: &mut JoinTree) -> Result<()> {
        join_tree.mark(self.start);
        let mut stack = vec![Frame {
            clique: self.start,
            parent: None,
            expanded: false,
        }];

        while let Some(frame) = stack.pop() {
            if frame.expanded {
                if let Some((sep_set, parent)) = frame.parent {
                    pass_single_message(join_tree, frame.clique, sep_set, parent)?;
                }
                continue;
            }

            stack.push(Frame {
                expanded: true,
                ..frame
            });
            for (sep_set, child) in join_tree.neighboring_cliques(frame.clique).into_iter().rev() {
                if join_tree.is_marked(child) {
                    continue;
                }
                join_tree.mark(child);
                stack.push(Frame {
                    clique: child,
                    parent: Some((sep_set, frame.clique)),
                    expanded: false,
                });
            }
        }
        Ok(())
    }
}
