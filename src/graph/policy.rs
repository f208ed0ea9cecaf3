use petgraph::{
    algo::has_path_connecting,
    graph::{Graph, NodeIndex},
    EdgeType,
};
use serde::{Deserialize, Serialize};

/// Decides whether a graph accepts a new edge. Chosen when the graph is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgePolicy {
    /// Directed graphs: no self loops, no edge already present in either direction, and no
    /// edge `a -> b` while `b` reaches `a`.
    Acyclic,
    /// Undirected graphs: only edges joining two distinct, not yet connected components.
    Forest,
}

impl EdgePolicy {
    pub fn admits<N, E, Ty: EdgeType>(
        &self,
        graph: &Graph<N, E, Ty>,
        a: NodeIndex,
        b: NodeIndex,
    ) -> bool {
        if a == b {
            return false;
        }
        match self {
            EdgePolicy::Acyclic => {
                graph.find_edge(a, b).is_none()
                    && graph.find_edge(b, a).is_none()
                    && !has_path_connecting(graph, b, a, None)
            }
            EdgePolicy::Forest => !has_path_connecting(graph, a, b, None),
        }
    }
}
