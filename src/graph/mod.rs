//! Graph module: the data model shared by every stage of the pipeline.
//!
//! # Module Organization
//!
//! - [`variable`]: discrete variables and their ordered domains
//! - [`node`]: BBN nodes, cliques and separation sets
//! - [`policy`]: edge-acceptance strategies
//! - [`dag`]: the Bayesian belief network itself
//! - [`undirected`]: moral and triangulated graphs
//! - [`potential`]: potential tables and their algebra
//! - [`evidence`]: evidence, its validation and change classification
//! - [`jointree`]: the runtime junction tree
//! - [`record`]: the serialized shape of a junction tree

pub mod dag;
pub mod evidence;
pub mod jointree;
pub mod node;
pub mod policy;
pub mod potential;
pub mod record;
pub mod undirected;
pub mod variable;

/// Identifier of a BBN node (and of its variable).
pub type NodeId = usize;

pub use dag::{huang_graph, Bbn};
pub use evidence::{ChangeType, Evidence, EvidenceBuilder, EvidenceType};
pub use jointree::{JoinTree, JoinTreeListener};
pub use node::{BbnNode, Clique, CliqueKey, JtNode, SepSet, SepSetKey};
pub use policy::EdgePolicy;
pub use potential::{Potential, PotentialEntry};
pub use record::{BbnNodeRecord, JoinTreeRecord, JtNodeRecord, JtRecord};
pub use undirected::Ug;
pub use variable::Variable;
