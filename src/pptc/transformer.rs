use std::cmp::Reverse;

use crate::graph::{Clique, JoinTree, SepSet};

/// Assembles cliques into a join tree: a maximum spanning forest over the separation sets.
pub struct Transformer;

impl Transformer {
    pub fn transform(cliques: &[Clique]) -> JoinTree {
        let mut join_tree = JoinTree::new();
        for clique in cliques {
            join_tree.add_clique(clique.clone());
        }

        let target = cliques.len().saturating_sub(1);
        for sep_set in get_sep_sets(cliques) {
            if join_tree.edge_count() == target {
                break;
            }
            let label = sep_set.to_string();
            if join_tree.add_edge(sep_set) {
                tracing::debug!("Accepted separation set {label}");
            }
        }

        tracing::debug!(
            "Join tree has {} cliques and {} separation sets",
            join_tree.clique_count(),
            join_tree.edge_count()
        );
        join_tree
    }
}

/// All non-empty pairwise separation sets, best first: largest mass, then lowest cost, then
/// lowest key.
pub fn get_sep_sets(cliques: &[Clique]) -> Vec<SepSet> {
    let mut sep_sets = Vec::new();
    for (i, left) in cliques.iter().enumerate() {
        for right in cliques[i + 1..].iter() {
            let sep_set = left.get_sep_set(right);
            if !sep_set.is_empty() {
                sep_sets.push(sep_set);
            }
        }
    }
    sep_sets.sort_by(|a, b| {
        (Reverse(a.mass()), a.cost(), a.key()).cmp(&(Reverse(b.mass()), b.cost(), b.key()))
    });
    sep_sets
}
