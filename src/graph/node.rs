//! Nodes of the three graphs the pipeline works with: BBN nodes in the DAG and the moral graph,
//! cliques and separation sets in the join tree.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, sync::Arc};

use super::{variable::Variable, NodeId};

/// A BBN node: a variable plus its flattened CPT.
///
/// `probs` is laid out parent-instantiation-outer, own-value-inner, with parents taken in
/// ascending id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BbnNode {
    pub variable: Variable,
    pub probs: Vec<f64>,
}

impl BbnNode {
    pub fn new(variable: Variable, probs: Vec<f64>) -> Self {
        BbnNode { variable, probs }
    }

    pub fn id(&self) -> NodeId {
        self.variable.id
    }

    pub fn name(&self) -> &str {
        &self.variable.name
    }

    /// The weight of a node is the size of its domain.
    pub fn weight(&self) -> u64 {
        self.variable.values.len() as u64
    }
}

impl fmt::Display for BbnNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variable)
    }
}

/// Canonical identity of a clique: its sorted node ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CliqueKey(Vec<NodeId>);

impl CliqueKey {
    pub fn new<I: IntoIterator<Item = NodeId>>(ids: I) -> Self {
        let ids: BTreeSet<NodeId> = ids.into_iter().collect();
        CliqueKey(ids.into_iter().collect())
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.0
    }
}

impl fmt::Display for CliqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", join_ids(&self.0))
    }
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join("-")
}

fn names(nodes: &[Arc<BbnNode>]) -> Vec<&str> {
    let mut names = nodes.iter().map(|n| n.name()).collect::<Vec<&str>>();
    names.sort();
    names
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clique {
    key: CliqueKey,
    nodes: Vec<Arc<BbnNode>>,
}

impl Clique {
    /// Builds a clique over `nodes`. Members are kept sorted by id; duplicates are dropped.
    pub fn new(mut nodes: Vec<Arc<BbnNode>>) -> Self {
        nodes.sort_by_key(|n| n.id());
        nodes.dedup_by_key(|n| n.id());
        let key = CliqueKey(nodes.iter().map(|n| n.id()).collect());
        Clique { key, nodes }
    }

    pub fn key(&self) -> &CliqueKey {
        &self.key
    }

    pub fn nodes(&self) -> &[Arc<BbnNode>] {
        &self.nodes
    }

    pub fn node_ids(&self) -> &[NodeId] {
        self.key.ids()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.key.0.binary_search(&id).is_ok()
    }

    pub fn is_superset(&self, that: &Clique) -> bool {
        that.node_ids().iter().all(|id| self.contains(*id))
    }

    /// Product of the member domain sizes, i.e. the size of the clique's state space.
    pub fn weight(&self) -> u64 {
        self.nodes
            .iter()
            .fold(1u64, |acc, n| acc.saturating_mul(n.weight()))
    }

    /// Sorted variable names joined by `-`.
    pub fn get_sid(&self) -> String {
        names(&self.nodes).join("-")
    }

    /// Ids shared with `that`, ascending.
    pub fn intersection(&self, that: &Clique) -> Vec<NodeId> {
        self.node_ids()
            .iter()
            .copied()
            .filter(|id| that.contains(*id))
            .collect()
    }

    pub fn get_sep_set(&self, that: &Clique) -> SepSet {
        SepSet::new(self.clone(), that.clone())
    }

    /// Replaces member nodes by the node with the same id from `lookup`, if any.
    pub(crate) fn rebind<F: Fn(NodeId) -> Option<Arc<BbnNode>>>(&mut self, lookup: &F) {
        for node in self.nodes.iter_mut() {
            if let Some(replacement) = lookup(node.id()) {
                *node = replacement;
            }
        }
    }
}

impl fmt::Display for Clique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", names(&self.nodes).join(","))
    }
}

/// Identity of a separation set: left clique, shared ids, right clique.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SepSetKey {
    pub left: CliqueKey,
    pub shared: Vec<NodeId>,
    pub right: CliqueKey,
}

impl fmt::Display for SepSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = self
            .left
            .ids()
            .iter()
            .chain(self.shared.iter())
            .chain(self.right.ids().iter())
            .copied()
            .collect::<Vec<NodeId>>();
        write!(f, "{}", join_ids(&ids))
    }
}

/// The intersection of two cliques. Labels a join tree edge.
#[derive(Debug, Clone, PartialEq)]
pub struct SepSet {
    key: SepSetKey,
    left: Clique,
    right: Clique,
    nodes: Vec<Arc<BbnNode>>,
}

impl SepSet {
    pub fn new(left: Clique, right: Clique) -> Self {
        let shared = left.intersection(&right);
        let nodes = left
            .nodes()
            .iter()
            .filter(|n| right.contains(n.id()))
            .cloned()
            .collect();
        let key = SepSetKey {
            left: left.key().clone(),
            shared,
            right: right.key().clone(),
        };
        SepSet {
            key,
            left,
            right,
            nodes,
        }
    }

    pub fn key(&self) -> &SepSetKey {
        &self.key
    }

    pub fn left(&self) -> &Clique {
        &self.left
    }

    pub fn right(&self) -> &Clique {
        &self.right
    }

    pub fn nodes(&self) -> &[Arc<BbnNode>] {
        &self.nodes
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.key.shared
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of shared nodes.
    pub fn mass(&self) -> usize {
        self.nodes.len()
    }

    /// Sum of the weights of the two adjoining cliques.
    pub fn cost(&self) -> u64 {
        self.left.weight().saturating_add(self.right.weight())
    }

    pub(crate) fn rebind<F: Fn(NodeId) -> Option<Arc<BbnNode>>>(&mut self, lookup: &F) {
        self.left.rebind(lookup);
        self.right.rebind(lookup);
        for node in self.nodes.iter_mut() {
            if let Some(replacement) = lookup(node.id()) {
                *node = replacement;
            }
        }
    }
}

impl fmt::Display for SepSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self
            .nodes
            .iter()
            .map(|n| n.name())
            .collect::<Vec<&str>>()
            .join(",");
        write!(f, "|{} -- {} -- {}|", self.left, shared, self.right)
    }
}

/// A join tree vertex.
#[derive(Debug, Clone, PartialEq)]
pub enum JtNode {
    Clique(Clique),
    SepSet(SepSet),
}

impl JtNode {
    pub fn nodes(&self) -> &[Arc<BbnNode>] {
        match self {
            JtNode::Clique(clique) => clique.nodes(),
            JtNode::SepSet(sep_set) => sep_set.nodes(),
        }
    }

    pub fn as_clique(&self) -> Option<&Clique> {
        match self {
            JtNode::Clique(clique) => Some(clique),
            JtNode::SepSet(_) => None,
        }
    }

    pub fn as_sep_set(&self) -> Option<&SepSet> {
        match self {
            JtNode::Clique(_) => None,
            JtNode::SepSet(sep_set) => Some(sep_set),
        }
    }

    pub fn is_clique(&self) -> bool {
        matches!(self, JtNode::Clique(_))
    }

    /// The serialized id: `0-1-2` for cliques, `left-shared-right` for separation sets.
    pub fn id_string(&self) -> String {
        match self {
            JtNode::Clique(clique) => clique.key().to_string(),
            JtNode::SepSet(sep_set) => sep_set.key().to_string(),
        }
    }
}

impl fmt::Display for JtNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JtNode::Clique(clique) => write!(f, "{clique}"),
            JtNode::SepSet(sep_set) => write!(f, "{sep_set}"),
        }
    }
}
