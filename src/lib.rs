//! # pptc-core
//!
//! Exact inference for discrete Bayesian belief networks by Probability Propagation in Trees of
//! Clusters (PPTC).
//!
//! ## Overview
//!
//! A Bayesian belief network (BBN) is compiled once into a join tree; after that, marginal
//! posteriors are answered from the tree and kept up to date as evidence comes and goes.
//!
//! ```text
//! Bbn ──moralize──► Ug ──triangulate──► cliques ──transform──► JoinTree
//!                                                                  │
//!                        evidence ──► initialize / propagate ◄─────┘
//! ```
//!
//! ## Architecture
//!
//! - **[`graph`]**: the data model: variables, the BBN, cliques and separation sets, potential
//!   tables and their algebra, evidence, and the runtime [`graph::JoinTree`]
//! - **[`pptc`]**: the pipeline stages and the [`pptc::InferenceController`] driving them
//! - **[`config`]**: [`config::EngineConfig`], loadable from TOML
//! - **[`error`]**: [`PptcError`] and the crate [`Result`] alias
//!
//! ## Quick Start
//!
//! ```rust
//! use pptc_core::{
//!     graph::{huang_graph, EvidenceBuilder, EvidenceType},
//!     pptc::InferenceController,
//! };
//!
//! # fn main() -> pptc_core::Result<()> {
//! let bbn = huang_graph()?;
//! let mut join_tree = InferenceController::apply(&bbn)?;
//!
//! let a = join_tree.get_bbn_node_by_name("a").cloned().unwrap();
//! let evidence = EvidenceBuilder::new()
//!     .with_node(&a)
//!     .with_type(EvidenceType::Observation)
//!     .with_evidence("on", 1.0)
//!     .build()?;
//! join_tree.set_observation(evidence)?;
//!
//! let posteriors = join_tree.get_posteriors()?;
//! assert!((posteriors["f"]["on"] - 0.18934).abs() < 1e-3);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Evidence changes
//!
//! Every evidence update is classified before anything is recomputed:
//!
//! - **None**: the stored likelihoods are unchanged; nothing happens.
//! - **Update**: no value that was ruled out becomes possible again. The change is multiplied
//!   into the owning cliques and the tree is propagated.
//! - **Retraction**: a value that was ruled out becomes possible. Ratio updates cannot undo a
//!   zero, so clique potentials are rebuilt from the CPTs before propagating.
//!
//! ### Forks
//!
//! `JoinTree` is `Clone`. A clone owns its potentials and evidence and shares variables and
//! CPTs with the original, so what-if scenarios can run side by side.
//!
//! [`pptc::InferenceController::reapply`] forks a compiled tree with new CPTs, skipping
//! triangulation; [`pptc::InferenceController::apply_from_serde`] restores a tree read back
//! with [`graph::JoinTree::from_json`].

pub mod config;
pub mod error;
pub mod graph;
pub mod pptc;
#[cfg(test)]
mod tests;

pub use error::*;
