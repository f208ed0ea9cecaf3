//! Potential tables and the algebra the propagation protocol is built on.
//!
//! A [`Potential`] is the full expansion of the joint domain of an ordered list of variables:
//! entries are generated with the last variable varying fastest, so a node's CPT lines up with
//! `get_potential_from_nodes(parents ++ [node])` row for row.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, sync::Arc};

use super::{jointree::JoinTree, node::BbnNode, NodeId};
use crate::error::{PptcError, Result};

/// One instantiation of a set of variables and its mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialEntry {
    pub entries: BTreeMap<NodeId, String>,
    pub value: f64,
}

impl Default for PotentialEntry {
    fn default() -> Self {
        PotentialEntry {
            entries: BTreeMap::new(),
            value: 1.0,
        }
    }
}

impl PotentialEntry {
    pub fn new() -> Self {
        PotentialEntry::default()
    }

    pub fn add<S: Into<String>>(&mut self, id: NodeId, value: S) -> &mut Self {
        self.entries.insert(id, value.into());
        self
    }

    /// True when every `(id, value)` pair of `that` also appears in this entry.
    pub fn matches(&self, that: &PotentialEntry) -> bool {
        that.entries
            .iter()
            .all(|(id, value)| self.entries.get(id) == Some(value))
    }
}

impl fmt::Display for PotentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self
            .entries
            .iter()
            .map(|(id, value)| format!("{id}={value}"))
            .collect::<Vec<String>>()
            .join(",");
        write!(f, "{key}|{:.5}", self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Potential {
    pub entries: Vec<PotentialEntry>,
}

impl Potential {
    pub fn new() -> Self {
        Potential::default()
    }

    pub fn add_entry(&mut self, entry: PotentialEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    pub fn get_matching_entries<'a>(
        &'a self,
        entry: &'a PotentialEntry,
    ) -> impl Iterator<Item = &'a PotentialEntry> + 'a {
        self.entries.iter().filter(move |e| e.matches(entry))
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.value).sum()
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Potential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .entries
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<String>>();
        write!(f, "{}", lines.join("\n"))
    }
}

/// A single-entry potential assigning `likelihood` to `id = value`.
pub fn get_likelihood_potential(id: NodeId, value: &str, likelihood: f64) -> Potential {
    let mut entry = PotentialEntry::new();
    entry.add(id, value);
    entry.value = likelihood;
    let mut potential = Potential::new();
    potential.add_entry(entry);
    potential
}

/// Cartesian product of the nodes' domains, every entry set to 1.0.
pub fn get_potential_from_nodes(nodes: &[Arc<BbnNode>]) -> Potential {
    let mut potential = Potential::new();
    if nodes.iter().any(|n| n.variable.values.is_empty()) {
        return potential;
    }

    let mut counters = vec![0usize; nodes.len()];
    loop {
        let mut entry = PotentialEntry::new();
        for (node, value_idx) in nodes.iter().zip(counters.iter()) {
            entry.add(node.id(), node.variable.values[*value_idx].clone());
        }
        potential.add_entry(entry);

        // odometer increment, last position fastest
        let mut pos = nodes.len();
        loop {
            if pos == 0 {
                return potential;
            }
            pos -= 1;
            counters[pos] += 1;
            if counters[pos] < nodes[pos].variable.values.len() {
                break;
            }
            counters[pos] = 0;
        }
    }
}

/// The factor of `node` given its ordered `parents`: a table over `parents ++ [node]` holding
/// the node's CPT.
pub fn get_potential(node: &Arc<BbnNode>, parents: &[Arc<BbnNode>]) -> Result<Potential> {
    let mut nodes = parents.to_vec();
    nodes.push(node.clone());

    let expected = nodes
        .iter()
        .map(|n| n.variable.values.len())
        .product::<usize>();
    if expected != node.probs.len() {
        return Err(PptcError::DimensionMismatch {
            node: node.name().to_string(),
            expected,
            actual: node.probs.len(),
        });
    }

    let mut potential = get_potential_from_nodes(&nodes);
    for (entry, prob) in potential.entries.iter_mut().zip(node.probs.iter()) {
        entry.value = *prob;
    }
    Ok(potential)
}

/// Multiplies every entry of `smaller` into the entries of `bigger` it matches. The scope of
/// `smaller` must be contained in the scope of `bigger`.
pub fn multiply(bigger: &mut Potential, smaller: &Potential) {
    for entry in smaller.entries.iter() {
        for e in bigger.entries.iter_mut().filter(|e| e.matches(entry)) {
            e.value *= entry.value;
        }
    }
}

/// Entrywise ratio by position. Both potentials must share the same entry order. A zero in
/// either operand yields zero.
pub fn divide(numerator: &Potential, denominator: &Potential) -> Result<Potential> {
    if numerator.len() != denominator.len() {
        return Err(PptcError::DimensionMismatch {
            node: "separation set".to_string(),
            expected: denominator.len(),
            actual: numerator.len(),
        });
    }

    let entries = numerator
        .entries
        .iter()
        .zip(denominator.entries.iter())
        .map(|(n, d)| {
            let mut entry = n.clone();
            entry.value = if n.value == 0.0 || d.value == 0.0 {
                0.0
            } else {
                n.value / d.value
            };
            entry
        })
        .collect();
    Ok(Potential { entries })
}

/// Sums the potential of `clique` down to `nodes`.
pub fn marginalize_for(
    join_tree: &JoinTree,
    clique: NodeIndex,
    nodes: &[Arc<BbnNode>],
) -> Result<Potential> {
    let clique_potential = join_tree.get_potential(clique).ok_or_else(|| {
        PptcError::Structure(format!("no potential for join tree node {}", clique.index()))
    })?;

    let mut potential = get_potential_from_nodes(nodes);
    for entry in potential.entries.iter_mut() {
        entry.value = clique_potential
            .get_matching_entries(entry)
            .map(|e| e.value)
            .sum();
    }
    Ok(potential)
}

/// Scales `potential` to sum to one. A potential summing to zero is left untouched.
pub fn normalize(potential: &mut Potential) {
    let total = potential.total();
    if total == 0.0 {
        return;
    }
    for entry in potential.entries.iter_mut() {
        entry.value /= total;
    }
}

/// Sends one message from clique `x` through separation set `s` into clique `y`.
///
/// The separation set takes the marginal of `x`; `y` absorbs the ratio of the new separation
/// potential to the old one.
pub fn pass_single_message(
    join_tree: &mut JoinTree,
    x: NodeIndex,
    s: NodeIndex,
    y: NodeIndex,
) -> Result<()> {
    let sep_nodes = join_tree
        .node(s)
        .map(|n| n.nodes().to_vec())
        .ok_or_else(|| PptcError::Structure(format!("no separation set at {}", s.index())))?;

    let new_sep_potential = marginalize_for(join_tree, x, &sep_nodes)?;
    let old_sep_potential = join_tree.get_potential(s).ok_or_else(|| {
        PptcError::Structure(format!("no potential for separation set {}", s.index()))
    })?;
    let ratio = divide(&new_sep_potential, old_sep_potential)?;
    join_tree.add_potential(s, new_sep_potential);

    let y_potential = join_tree.get_potential_mut(y).ok_or_else(|| {
        PptcError::Structure(format!("no potential for join tree node {}", y.index()))
    })?;
    multiply(y_potential, &ratio);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::variable::Variable;
    use test_log::test;

    fn node(id: NodeId, name: &str, values: &[&str], probs: Vec<f64>) -> Arc<BbnNode> {
        Arc::new(BbnNode::new(
            Variable::new(id, name, values.iter().copied()),
            probs,
        ))
    }

    #[test]
    fn test_cartesian_product_order() {
        let a = node(0, "a", &["on", "off"], vec![]);
        let b = node(1, "b", &["x", "y", "z"], vec![]);
        let potential = get_potential_from_nodes(&[a, b]);
        assert_eq!(potential.len(), 6);
        let labels = potential
            .entries
            .iter()
            .map(|e| format!("{}{}", e.entries[&0], e.entries[&1]))
            .collect::<Vec<String>>();
        assert_eq!(labels, vec!["onx", "ony", "onz", "offx", "offy", "offz"]);
        assert!(potential.entries.iter().all(|e| e.value == 1.0));
    }

    #[test]
    fn test_empty_scope_is_the_unit_potential() {
        let potential = get_potential_from_nodes(&[]);
        assert_eq!(potential.len(), 1);
        assert_eq!(potential.total(), 1.0);
    }

    #[test]
    fn test_get_potential_overlays_cpt() {
        let a = node(0, "a", &["on", "off"], vec![0.5, 0.5]);
        let b = node(1, "b", &["on", "off"], vec![0.5, 0.5, 0.4, 0.6]);
        let potential = get_potential(&b, &[a.clone()]).unwrap();
        assert_eq!(potential.values(), vec![0.5, 0.5, 0.4, 0.6]);
        assert_eq!(potential.entries[2].entries[&0], "off");
        assert_eq!(potential.entries[2].entries[&1], "on");

        let bad = node(2, "c", &["on", "off"], vec![0.1, 0.9, 0.3]);
        assert_eq!(
            get_potential(&bad, &[a]),
            Err(PptcError::DimensionMismatch {
                node: "c".to_string(),
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_multiply_by_subset_scope() {
        let a = node(0, "a", &["on", "off"], vec![]);
        let b = node(1, "b", &["on", "off"], vec![]);
        let mut big = get_potential_from_nodes(&[a.clone(), b]);
        let mut small = get_potential_from_nodes(&[a]);
        small.entries[0].value = 0.25;
        small.entries[1].value = 4.0;
        multiply(&mut big, &small);
        assert_eq!(big.values(), vec![0.25, 0.25, 4.0, 4.0]);

        multiply(&mut big, &get_likelihood_potential(1, "off", 0.0));
        assert_eq!(big.values(), vec![0.25, 0.0, 4.0, 0.0]);
    }

    #[test]
    fn test_divide_guards_zero() {
        let a = node(0, "a", &["x", "y", "z"], vec![]);
        let mut numerator = get_potential_from_nodes(&[a.clone()]);
        let mut denominator = get_potential_from_nodes(&[a]);
        for (e, v) in numerator.entries.iter_mut().zip([0.6, 0.0, 0.3]) {
            e.value = v;
        }
        for (e, v) in denominator.entries.iter_mut().zip([0.3, 0.5, 0.0]) {
            e.value = v;
        }
        let ratio = divide(&numerator, &denominator).unwrap();
        assert_eq!(ratio.values(), vec![2.0, 0.0, 0.0]);

        let short = Potential::new();
        assert!(matches!(
            divide(&numerator, &short),
            Err(PptcError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_normalize() {
        let a = node(0, "a", &["x", "y"], vec![]);
        let mut potential = get_potential_from_nodes(&[a.clone()]);
        potential.entries[0].value = 3.0;
        normalize(&mut potential);
        assert_eq!(potential.values(), vec![0.75, 0.25]);

        let mut zero = get_potential_from_nodes(&[a]);
        zero.entries.iter_mut().for_each(|e| e.value = 0.0);
        normalize(&mut zero);
        assert_eq!(zero.values(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_entry_matching() {
        let mut full = PotentialEntry::new();
        full.add(0, "on").add(1, "off");
        let mut partial = PotentialEntry::new();
        partial.add(1, "off");
        assert!(full.matches(&partial));
        assert!(!partial.matches(&full));
        partial.add(2, "on");
        assert!(!full.matches(&partial));
        assert_eq!(full.to_string(), "0=on,1=off|1.00000");
    }
}
