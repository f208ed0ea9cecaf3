//! Shared test utilities for join tree testing

use std::collections::BTreeMap;

use crate::{
    graph::{huang_graph, EvidenceBuilder, EvidenceType, JoinTree},
    pptc::InferenceController,
};

/// Name -> value -> probability, as returned by `JoinTree::get_posteriors`.
pub type Posteriors = BTreeMap<String, BTreeMap<String, f64>>;

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// The compiled Huang reference network.
pub fn huang_join_tree() -> JoinTree {
    init_logging();
    let bbn = huang_graph().expect("reference network builds");
    InferenceController::apply(&bbn).expect("reference network compiles")
}

/// Asserts evidence of `kind` with the given likelihoods on the node called `name`.
pub fn assert_evidence(join_tree: &mut JoinTree, name: &str, kind: EvidenceType, values: &[(&str, f64)]) {
    let node = join_tree
        .get_bbn_node_by_name(name)
        .cloned()
        .unwrap_or_else(|| panic!("no node named {name}"));
    let mut builder = EvidenceBuilder::new().with_node(&node).with_type(kind);
    for (value, likelihood) in values {
        builder = builder.with_evidence(*value, *likelihood);
    }
    let evidence = builder.build().unwrap();
    join_tree.update_evidences(vec![evidence]).unwrap();
}

/// Observes `name = value`.
pub fn observe(join_tree: &mut JoinTree, name: &str, value: &str) {
    assert_evidence(join_tree, name, EvidenceType::Observation, &[(value, 1.0)]);
}

/// P(name = on) for every node of an on/off network.
pub fn on_probabilities(join_tree: &JoinTree) -> BTreeMap<String, f64> {
    join_tree
        .get_posteriors()
        .unwrap()
        .into_iter()
        .map(|(name, marginal)| (name, marginal["on"]))
        .collect()
}

pub fn assert_close(actual: &BTreeMap<String, f64>, expected: &[(&str, f64)], tolerance: f64) {
    for (name, p) in expected {
        let got = actual[*name];
        assert!(
            (got - p).abs() < tolerance,
            "P({name}=on) is {got}, expected {p}"
        );
    }
}

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
