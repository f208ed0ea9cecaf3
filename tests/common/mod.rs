//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use pptc_core::graph::{Bbn, BbnNode, NodeId, Variable};
use std::{collections::BTreeMap, sync::Arc};

pub type Posteriors = BTreeMap<String, BTreeMap<String, f64>>;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times; subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Posteriors by enumerating the full joint distribution.
///
/// `likelihoods` holds per-node likelihood vectors in domain order; nodes without an entry are
/// unobserved.
#[allow(dead_code)]
pub fn enumerate(bbn: &Bbn, likelihoods: &BTreeMap<NodeId, Vec<f64>>) -> Posteriors {
    let nodes = bbn.get_nodes().cloned().collect::<Vec<Arc<BbnNode>>>();
    let position = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id(), i))
        .collect::<BTreeMap<NodeId, usize>>();

    let mut sums = nodes
        .iter()
        .map(|n| vec![0.0; n.variable.cardinality()])
        .collect::<Vec<Vec<f64>>>();
    let mut assignment = vec![0usize; nodes.len()];
    let mut total = 0.0;

    loop {
        let mut p = 1.0;
        for (i, node) in nodes.iter().enumerate() {
            let mut row = 0;
            for parent in bbn.get_parents(node.id()) {
                let j = position[parent];
                row = row * nodes[j].variable.cardinality() + assignment[j];
            }
            p *= node.probs[row * node.variable.cardinality() + assignment[i]];
            if let Some(l) = likelihoods.get(&node.id()) {
                p *= l[assignment[i]];
            }
        }
        total += p;
        for (i, value) in assignment.iter().enumerate() {
            sums[i][*value] += p;
        }

        // odometer, last node fastest
        let mut pos = nodes.len();
        loop {
            if pos == 0 {
                return posteriors(&nodes, &sums, total);
            }
            pos -= 1;
            assignment[pos] += 1;
            if assignment[pos] < nodes[pos].variable.cardinality() {
                break;
            }
            assignment[pos] = 0;
        }
    }
}

fn posteriors(nodes: &[Arc<BbnNode>], sums: &[Vec<f64>], total: f64) -> Posteriors {
    nodes
        .iter()
        .zip(sums.iter())
        .map(|(node, sums)| {
            let marginal = node
                .variable
                .values
                .iter()
                .zip(sums.iter())
                .map(|(v, s)| (v.clone(), if total == 0.0 { 0.0 } else { s / total }))
                .collect::<BTreeMap<String, f64>>();
            (node.name().to_string(), marginal)
        })
        .collect()
}

/// Adds a two-node chain `p<base> -> c<base + 1>` over on/off.
#[allow(dead_code)]
pub fn add_chain(bbn: &mut Bbn, base: NodeId, prior: f64, on_given_on: f64, on_given_off: f64) {
    let parent = BbnNode::new(
        Variable::new(base, format!("p{base}"), ["on", "off"]),
        vec![prior, 1.0 - prior],
    );
    let child = BbnNode::new(
        Variable::new(base + 1, format!("c{}", base + 1), ["on", "off"]),
        vec![on_given_on, 1.0 - on_given_on, on_given_off, 1.0 - on_given_off],
    );
    bbn.add_node(parent).add_node(child);
    bbn.add_edge_checked(base, base + 1).unwrap();
}

#[allow(dead_code)]
pub fn assert_same_posteriors(a: &Posteriors, b: &Posteriors, tolerance: f64) {
    assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
    for (name, marginal) in a {
        for (value, p) in marginal {
            let q = b[name][value];
            assert!(
                (p - q).abs() < tolerance,
                "P({name}={value}) differs: {p} vs {q}"
            );
        }
    }
}
