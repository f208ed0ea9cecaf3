//! The PPTC pipeline: compiling a [`Bbn`](crate::graph::Bbn) into a join tree and keeping it
//! consistent with the asserted evidence.
//!
//! # Module Organization
//!
//! - [`potential_initializer`]: per-node factors from CPTs
//! - [`moralizer`]: DAG to moral graph
//! - [`triangulator`]: greedy elimination, maximal cliques
//! - [`transformer`]: cliques to join tree
//! - [`initializer`]: seeding clique potentials with factors and evidence
//! - [`collector`], [`distributor`], [`propagator`]: two-pass message passing
//! - [`inference`]: the controller tying the stages together
//!
//! Stage order for a fresh network:
//!
//! ```text
//! Bbn -> PotentialInitializer -> Moralizer -> Triangulator -> Transformer
//!     -> Initializer -> Propagator -> JoinTree
//! ```

pub mod collector;
pub mod distributor;
pub mod inference;
pub mod initializer;
pub mod moralizer;
pub mod potential_initializer;
pub mod propagator;
pub mod transformer;
pub mod triangulator;

pub use collector::EvidenceCollector;
pub use distributor::EvidenceDistributor;
pub use inference::InferenceController;
pub use initializer::Initializer;
pub use moralizer::Moralizer;
pub use potential_initializer::PotentialInitializer;
pub use propagator::Propagator;
pub use transformer::Transformer;
pub use triangulator::Triangulator;
