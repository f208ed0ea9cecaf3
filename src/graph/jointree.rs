//! The join (junction) tree: cliques and separation sets plus all runtime inference state.
//!
//! Structure lives in a petgraph arena whose vertices are [`JtNode`]s; every separation set is
//! a vertex adjacent to exactly its two cliques. Potentials, evidence and the clique each BBN
//! node is assigned to are keyed by arena index or node id.
//!
//! Cloning a `JoinTree` forks it: potentials and evidence are copied, variables and CPTs are
//! shared.

use petgraph::{
    graph::{Graph, NodeIndex},
    unionfind::UnionFind,
    visit::EdgeRef,
    Undirected,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::Arc,
};

use super::{
    evidence::{is_observed, ChangeType, Evidence, EvidenceType},
    node::{BbnNode, Clique, CliqueKey, JtNode, SepSet, SepSetKey},
    policy::EdgePolicy,
    potential::{
        get_likelihood_potential, get_potential_from_nodes, marginalize_for, multiply, normalize,
        Potential,
    },
    NodeId,
};
use crate::{
    config::EngineConfig,
    error::{PptcError, Result},
};

/// Receives evidence-change notifications. Invoked synchronously from
/// [`JoinTree::update_evidences`].
pub trait JoinTreeListener: Send + Sync {
    fn evidence_retracted(&self, join_tree: &mut JoinTree) -> Result<()>;
    fn evidence_updated(&self, join_tree: &mut JoinTree) -> Result<()>;
}

#[derive(Clone)]
pub struct JoinTree {
    graph: Graph<JtNode, (), Undirected>,
    policy: EdgePolicy,
    cliques: BTreeMap<CliqueKey, NodeIndex>,
    sep_sets: BTreeMap<SepSetKey, NodeIndex>,
    bbn_nodes: BTreeMap<NodeId, Arc<BbnNode>>,
    parent_info: BTreeMap<NodeId, Vec<NodeId>>,
    node_potentials: BTreeMap<NodeId, Potential>,
    potentials: BTreeMap<NodeIndex, Potential>,
    evidences: BTreeMap<NodeId, BTreeMap<String, Potential>>,
    owners: BTreeMap<NodeId, NodeIndex>,
    marked: BTreeSet<NodeIndex>,
    listener: Option<Arc<dyn JoinTreeListener>>,
    config: EngineConfig,
}

impl Default for JoinTree {
    fn default() -> Self {
        JoinTree::with_config(EngineConfig::default())
    }
}

impl fmt::Debug for JoinTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinTree")
            .field("cliques", &self.cliques.keys().collect::<Vec<_>>())
            .field("sep_sets", &self.sep_sets.keys().collect::<Vec<_>>())
            .field("parent_info", &self.parent_info)
            .field("potentials", &self.potentials.len())
            .field("evidences", &self.evidences.len())
            .field("listener", &self.listener.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl JoinTree {
    pub fn new() -> Self {
        JoinTree::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        JoinTree {
            graph: Graph::new_undirected(),
            policy: EdgePolicy::Forest,
            cliques: BTreeMap::new(),
            sep_sets: BTreeMap::new(),
            bbn_nodes: BTreeMap::new(),
            parent_info: BTreeMap::new(),
            node_potentials: BTreeMap::new(),
            potentials: BTreeMap::new(),
            evidences: BTreeMap::new(),
            owners: BTreeMap::new(),
            marked: BTreeSet::new(),
            listener: None,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// Adds `clique` as a vertex if no clique with the same key exists yet.
    pub fn add_clique(&mut self, clique: Clique) -> NodeIndex {
        if let Some(idx) = self.cliques.get(clique.key()) {
            return *idx;
        }
        for node in clique.nodes() {
            self.bbn_nodes
                .entry(node.id())
                .or_insert_with(|| node.clone());
        }
        let key = clique.key().clone();
        let idx = self.graph.add_node(JtNode::Clique(clique));
        self.cliques.insert(key, idx);
        idx
    }

    /// Adds the edge labelled by `sep_set`, adding its cliques if needed.
    ///
    /// Returns false when the two cliques are identical or already connected; the tree stays a
    /// forest.
    pub fn add_edge(&mut self, sep_set: SepSet) -> bool {
        if self.sep_sets.contains_key(sep_set.key()) {
            return false;
        }
        let left = self.add_clique(sep_set.left().clone());
        let right = self.add_clique(sep_set.right().clone());
        if !self.policy.admits(&self.graph, left, right) {
            return false;
        }

        let key = sep_set.key().clone();
        let idx = self.graph.add_node(JtNode::SepSet(sep_set));
        self.graph.add_edge(left, idx, ());
        self.graph.add_edge(idx, right, ());
        self.sep_sets.insert(key, idx);
        true
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&JtNode> {
        self.graph.node_weight(idx)
    }

    pub fn clique(&self, idx: NodeIndex) -> Option<&Clique> {
        self.node(idx).and_then(JtNode::as_clique)
    }

    pub fn sep_set(&self, idx: NodeIndex) -> Option<&SepSet> {
        self.node(idx).and_then(JtNode::as_sep_set)
    }

    pub fn clique_index(&self, key: &CliqueKey) -> Option<NodeIndex> {
        self.cliques.get(key).copied()
    }

    pub fn sep_set_index(&self, key: &SepSetKey) -> Option<NodeIndex> {
        self.sep_sets.get(key).copied()
    }

    /// Clique indices ordered by clique key.
    pub fn clique_indices(&self) -> Vec<NodeIndex> {
        self.cliques.values().copied().collect()
    }

    /// Separation set indices ordered by key.
    pub fn sep_set_indices(&self) -> Vec<NodeIndex> {
        self.sep_sets.values().copied().collect()
    }

    pub fn get_cliques(&self) -> Vec<&Clique> {
        self.cliques
            .values()
            .filter_map(|idx| self.clique(*idx))
            .collect()
    }

    pub fn get_sep_sets(&self) -> Vec<&SepSet> {
        self.sep_sets
            .values()
            .filter_map(|idx| self.sep_set(*idx))
            .collect()
    }

    pub fn clique_count(&self) -> usize {
        self.cliques.len()
    }

    /// Number of tree edges, i.e. separation sets.
    pub fn edge_count(&self) -> usize {
        self.sep_sets.len()
    }

    /// Each separation set broken into its two underlying edges: `(left clique, sep set)` and
    /// `(sep set, right clique)`.
    pub fn get_flattened_edges(&self) -> Vec<(&JtNode, &JtNode)> {
        self.sep_sets
            .values()
            .flat_map(|sep_idx| {
                let sep_node = &self.graph[*sep_idx];
                let ends = sep_node
                    .as_sep_set()
                    .map(|s| {
                        [s.left().key(), s.right().key()]
                            .into_iter()
                            .filter_map(|k| self.cliques.get(k))
                            .map(|idx| &self.graph[*idx])
                            .collect::<Vec<&JtNode>>()
                    })
                    .unwrap_or_default();
                match ends.as_slice() {
                    [left, right] => vec![(*left, sep_node), (sep_node, *right)],
                    _ => Vec::new(),
                }
            })
            .collect()
    }

    /// Cliques adjacent to `clique` as `(separation set, clique)` pairs, ordered by clique key.
    pub fn neighboring_cliques(&self, clique: NodeIndex) -> Vec<(NodeIndex, NodeIndex)> {
        let mut pairs = self
            .graph
            .edges(clique)
            .map(|e| if e.source() == clique { e.target() } else { e.source() })
            .flat_map(|sep| {
                self.graph
                    .edges(sep)
                    .map(move |e| if e.source() == sep { e.target() } else { e.source() })
                    .filter(move |c| *c != clique)
                    .map(move |c| (sep, c))
            })
            .collect::<Vec<(NodeIndex, NodeIndex)>>();
        pairs.sort_by(|(_, a), (_, b)| self.clique_key(*a).cmp(&self.clique_key(*b)));
        pairs
    }

    fn clique_key(&self, idx: NodeIndex) -> Option<&CliqueKey> {
        self.clique(idx).map(Clique::key)
    }

    /// The lowest-key clique of every connected component, in key order.
    pub fn component_roots(&self) -> Vec<NodeIndex> {
        let mut components = UnionFind::<usize>::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            components.union(edge.source().index(), edge.target().index());
        }

        let mut seen = BTreeSet::new();
        self.cliques
            .values()
            .copied()
            .filter(|idx| seen.insert(components.find(idx.index())))
            .collect()
    }

    pub fn mark(&mut self, clique: NodeIndex) {
        self.marked.insert(clique);
    }

    pub fn is_marked(&self, clique: NodeIndex) -> bool {
        self.marked.contains(&clique)
    }

    pub fn unmark_cliques(&mut self) {
        self.marked.clear();
    }

    /// BBN nodes in ascending id order.
    pub fn get_bbn_nodes(&self) -> Vec<&Arc<BbnNode>> {
        self.bbn_nodes.values().collect()
    }

    pub fn get_bbn_node(&self, id: NodeId) -> Option<&Arc<BbnNode>> {
        self.bbn_nodes.get(&id)
    }

    pub fn get_bbn_node_by_name(&self, name: &str) -> Option<&Arc<BbnNode>> {
        self.bbn_nodes.values().find(|n| n.name() == name)
    }

    pub fn parent_info(&self) -> &BTreeMap<NodeId, Vec<NodeId>> {
        &self.parent_info
    }

    pub fn set_parent_info(&mut self, parent_info: BTreeMap<NodeId, Vec<NodeId>>) {
        self.parent_info = parent_info;
        self.owners.clear();
    }

    pub fn get_parent_ids(&self, id: NodeId) -> &[NodeId] {
        self.parent_info
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every BBN node with its ordered parents.
    pub fn get_bbn_node_and_parents(&self) -> Vec<(Arc<BbnNode>, Vec<Arc<BbnNode>>)> {
        self.bbn_nodes
            .values()
            .map(|node| {
                let parents = self
                    .get_parent_ids(node.id())
                    .iter()
                    .filter_map(|pa| self.bbn_nodes.get(pa).cloned())
                    .collect();
                (node.clone(), parents)
            })
            .collect()
    }

    /// Replaces the CPTs of the given nodes. Their factors must be rebuilt afterwards.
    pub fn update_bbn_cpts(&mut self, cpts: &BTreeMap<NodeId, Vec<f64>>) -> Result<()> {
        let mut replacements = BTreeMap::new();
        for (id, probs) in cpts {
            let node = self
                .bbn_nodes
                .get(id)
                .ok_or_else(|| PptcError::unknown_node(*id))?;
            let updated = Arc::new(BbnNode::new(node.variable.clone(), probs.clone()));
            replacements.insert(*id, updated);
        }

        let lookup = |id: NodeId| replacements.get(&id).cloned();
        for weight in self.graph.node_weights_mut() {
            match weight {
                JtNode::Clique(clique) => clique.rebind(&lookup),
                JtNode::SepSet(sep_set) => sep_set.rebind(&lookup),
            }
        }
        for (id, node) in replacements {
            self.node_potentials.remove(&id);
            self.bbn_nodes.insert(id, node);
        }
        Ok(())
    }

    pub fn node_potential(&self, id: NodeId) -> Option<&Potential> {
        self.node_potentials.get(&id)
    }

    pub fn set_node_potentials(&mut self, potentials: BTreeMap<NodeId, Potential>) {
        self.node_potentials = potentials;
    }

    /// Cliques containing `id` and all of its parents, ordered by key.
    pub fn find_cliques_with_node_and_parents(&self, id: NodeId) -> Vec<NodeIndex> {
        let mut ids = self.get_parent_ids(id).to_vec();
        ids.push(id);
        self.cliques
            .values()
            .copied()
            .filter(|idx| {
                self.clique(*idx)
                    .map(|c| ids.iter().all(|i| c.contains(*i)))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// The clique owning `id`'s factor: the lowest-key clique holding the node and its parents.
    pub fn owning_clique(&self, id: NodeId) -> Result<NodeIndex> {
        if let Some(idx) = self.owners.get(&id) {
            return Ok(*idx);
        }
        self.find_cliques_with_node_and_parents(id)
            .first()
            .copied()
            .ok_or_else(|| {
                PptcError::Structure(format!(
                    "no clique contains node {id} together with its parents"
                ))
            })
    }

    /// Resolves and caches the owning clique of `id`.
    pub fn resolve_owner(&mut self, id: NodeId) -> Result<NodeIndex> {
        let idx = self.owning_clique(id)?;
        self.owners.insert(id, idx);
        Ok(idx)
    }

    pub fn add_potential(&mut self, idx: NodeIndex, potential: Potential) -> &mut Self {
        self.potentials.insert(idx, potential);
        self
    }

    pub fn get_potential(&self, idx: NodeIndex) -> Option<&Potential> {
        self.potentials.get(&idx)
    }

    pub fn get_potential_mut(&mut self, idx: NodeIndex) -> Option<&mut Potential> {
        self.potentials.get_mut(&idx)
    }

    pub fn has_potentials(&self) -> bool {
        !self.potentials.is_empty()
    }

    pub fn clear_potentials(&mut self) {
        self.potentials.clear();
    }

    /// The posterior of `node`: its owning clique marginalized to the node and normalized.
    pub fn get_bbn_potential(&self, node: &BbnNode) -> Result<Potential> {
        let node = self
            .bbn_nodes
            .get(&node.id())
            .ok_or_else(|| PptcError::unknown_node(node.id()))?;
        let clique = self.owning_clique(node.id())?;
        let mut potential = marginalize_for(self, clique, &[node.clone()])?;
        normalize(&mut potential);
        Ok(potential)
    }

    /// Posteriors of every node: name → value → probability.
    pub fn get_posteriors(&self) -> Result<BTreeMap<String, BTreeMap<String, f64>>> {
        self.bbn_nodes
            .values()
            .map(|node| {
                let potential = self.get_bbn_potential(node)?;
                let marginal: BTreeMap<String, f64> = potential
                    .entries
                    .into_iter()
                    .filter_map(|e| e.entries.get(&node.id()).cloned().map(|v| (v, e.value)))
                    .collect();
                Ok((node.name().to_string(), marginal))
            })
            .collect()
    }

    /// The likelihood potential currently asserted for `node = value` (1.0 until evidence is
    /// entered).
    pub fn get_evidence(&self, node: &BbnNode, value: &str) -> Potential {
        self.evidences
            .get(&node.id())
            .and_then(|m| m.get(value))
            .cloned()
            .unwrap_or_else(|| get_likelihood_potential(node.id(), value, 1.0))
    }

    /// Stored likelihoods of `node` in domain order.
    pub fn get_likelihoods(&self, node: &BbnNode) -> Vec<f64> {
        let stored = self.evidences.get(&node.id());
        node.variable
            .values
            .iter()
            .map(|v| {
                stored
                    .and_then(|m| m.get(v))
                    .and_then(|p| p.entries.first())
                    .map(|e| e.value)
                    .unwrap_or(1.0)
            })
            .collect()
    }

    pub fn clear_evidences(&mut self) {
        self.evidences.clear();
    }

    /// The most expensive change the (validated) `evidences` would cause.
    pub fn get_change_type(&self, evidences: &[Evidence]) -> ChangeType {
        evidences
            .iter()
            .map(|e| e.compare(&self.get_likelihoods(&e.node)))
            .max()
            .unwrap_or(ChangeType::None)
    }

    pub fn get_unobserved_evidence(&self, node: &Arc<BbnNode>) -> Evidence {
        let mut evidence = Evidence::new(node.clone(), EvidenceType::Unobserve);
        for value in node.variable.values.iter() {
            evidence.add_value(value.clone(), 1.0);
        }
        evidence
    }

    pub fn unobserve(&mut self, nodes: &[Arc<BbnNode>]) -> Result<&mut Self> {
        let evidences = nodes
            .iter()
            .map(|n| self.get_unobserved_evidence(n))
            .collect();
        self.update_evidences(evidences)
    }

    pub fn unobserve_all(&mut self) -> Result<&mut Self> {
        let nodes = self.bbn_nodes.values().cloned().collect::<Vec<_>>();
        self.unobserve(&nodes)
    }

    /// Validates and asserts `evidences`, then notifies the listener of the resulting change.
    ///
    /// When several evidences name the same node the last one wins.
    pub fn update_evidences(&mut self, evidences: Vec<Evidence>) -> Result<&mut Self> {
        let mut by_node = BTreeMap::new();
        for evidence in evidences {
            let mut evidence = self.bind(evidence)?;
            evidence.validate(self.config.virtual_evidence)?;
            by_node.insert(evidence.node.id(), evidence);
        }
        let evidences = by_node.into_values().collect::<Vec<Evidence>>();

        let change = self.get_change_type(&evidences);
        tracing::debug!(
            "Evidence update on {} node(s) classified as {:?}",
            evidences.len(),
            change
        );

        if change == ChangeType::Update && self.has_potentials() {
            for evidence in evidences.iter() {
                self.absorb(evidence)?;
            }
        }

        for evidence in evidences.iter() {
            let id = evidence.node.id();
            let stored = self.evidences.entry(id).or_default();
            for (value, likelihood) in evidence.values.iter() {
                stored.insert(value.clone(), get_likelihood_potential(id, value, *likelihood));
            }
        }

        self.notify_listener(change)?;
        Ok(self)
    }

    /// Rebinds `evidence` to this tree's copy of its node. A node with a known id but a
    /// different variable is rejected.
    fn bind(&self, mut evidence: Evidence) -> Result<Evidence> {
        let node = self.bbn_nodes.get(&evidence.node.id()).ok_or_else(|| {
            PptcError::UnknownVariable(format!(
                "{} is not part of this join tree",
                evidence.node.name()
            ))
        })?;
        if node.variable != evidence.node.variable {
            return Err(PptcError::UnknownVariable(format!(
                "evidence variable {} does not match {} in this join tree",
                evidence.node.variable, node.variable
            )));
        }
        evidence.node = node.clone();
        Ok(evidence)
    }

    /// Multiplies the change from the stored likelihoods to `evidence` into the owning clique.
    fn absorb(&mut self, evidence: &Evidence) -> Result<()> {
        let node = evidence.node.clone();
        let old = self.get_likelihoods(&node);
        let new = evidence.likelihoods();
        let owner = self.resolve_owner(node.id())?;

        let mut ratio = Potential::new();
        for ((value, o), n) in node.variable.values.iter().zip(old).zip(new) {
            let factor = if o == 0.0 || n == 0.0 { 0.0 } else { n / o };
            ratio.entries.extend(get_likelihood_potential(node.id(), value, factor).entries);
        }
        if let Some(potential) = self.get_potential_mut(owner) {
            multiply(potential, &ratio);
        }
        Ok(())
    }

    /// Asserts a single observation.
    ///
    /// Re-asserting the value the node is already observed at is a no-op: the observation
    /// stays in place and nothing is recomputed. It does not toggle the node back to
    /// unobserved; use [`JoinTree::unobserve`] for that.
    pub fn set_observation(&mut self, evidence: Evidence) -> Result<&mut Self> {
        let mut evidence = self.bind(evidence)?;
        evidence.validate(self.config.virtual_evidence)?;
        let previous = self.get_likelihoods(&evidence.node);
        if is_observed(&previous) && previous == evidence.likelihoods() {
            tracing::debug!(
                "{} is already observed at {:?}",
                evidence.node.name(),
                evidence.observed_value()
            );
            return Ok(self);
        }
        self.update_evidences(vec![evidence])
    }

    pub fn set_listener(&mut self, listener: Arc<dyn JoinTreeListener>) {
        self.listener = Some(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    fn notify_listener(&mut self, change: ChangeType) -> Result<()> {
        let Some(listener) = self.listener.clone() else {
            return Ok(());
        };
        match change {
            ChangeType::Retraction => listener.evidence_retracted(self),
            ChangeType::Update => listener.evidence_updated(self),
            ChangeType::None => Ok(()),
        }
    }

    /// Seeds every clique and separation set with an all-ones table over its scope.
    pub(crate) fn reset_potentials(&mut self) {
        let seeds = self
            .graph
            .node_indices()
            .map(|idx| (idx, get_potential_from_nodes(self.graph[idx].nodes())))
            .collect::<Vec<_>>();
        self.potentials = seeds.into_iter().collect();
    }
}
