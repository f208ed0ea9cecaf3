//! Serialized shape of a join tree.
//!
//! ```json
//! {
//!   "bbn_nodes": {"0": {"variable": {"id": 0, "name": "a", "values": ["on", "off"]}, "probs": [0.5, 0.5]}},
//!   "jt": {
//!     "nodes": {
//!       "0-1": {"type": "clique", "node_ids": [0, 1]},
//!       "0-1-1-1-2": {"type": "sepset", "left": "0-1", "right": "1-2"}
//!     },
//!     "edges": ["0-1-1-1-2"],
//!     "parent_info": {"0": [], "1": [0]}
//!   }
//! }
//! ```
//!
//! A record carries structure and parameters only. Potentials are rebuilt by
//! `InferenceController::apply_from_serde`, and the engine configuration is passed back in
//! through `from_dict_with_config`.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

use super::{
    jointree::JoinTree,
    node::{BbnNode, Clique, JtNode},
    variable::Variable,
    NodeId,
};
use crate::{
    config::EngineConfig,
    error::{PptcError, Result},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BbnNodeRecord {
    pub variable: Variable,
    pub probs: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JtNodeRecord {
    Clique { node_ids: Vec<NodeId> },
    Sepset { left: String, right: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JtRecord {
    pub nodes: BTreeMap<String, JtNodeRecord>,
    pub edges: Vec<String>,
    pub parent_info: BTreeMap<NodeId, Vec<NodeId>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinTreeRecord {
    pub bbn_nodes: BTreeMap<NodeId, BbnNodeRecord>,
    pub jt: JtRecord,
}

impl JoinTree {
    pub fn to_dict(&self) -> JoinTreeRecord {
        let bbn_nodes = self
            .get_bbn_nodes()
            .into_iter()
            .map(|n| {
                let record = BbnNodeRecord {
                    variable: n.variable.clone(),
                    probs: n.probs.clone(),
                };
                (n.id(), record)
            })
            .collect();

        let nodes = self
            .clique_indices()
            .into_iter()
            .chain(self.sep_set_indices())
            .filter_map(|idx| self.node(idx))
            .map(|n| (n.id_string(), n.to_record()))
            .collect();
        let edges = self
            .get_sep_sets()
            .into_iter()
            .map(|s| s.key().to_string())
            .collect();

        JoinTreeRecord {
            bbn_nodes,
            jt: JtRecord {
                nodes,
                edges,
                parent_info: self.parent_info().clone(),
            },
        }
    }

    /// Rebuilds the structure described by `record` with the default [`EngineConfig`].
    pub fn from_dict(record: &JoinTreeRecord) -> Result<JoinTree> {
        JoinTree::from_dict_with_config(record, EngineConfig::default())
    }

    /// Rebuilds the structure described by `record`. Every clique is restored, including
    /// isolated ones; an edge that does not fit the forest is a [`PptcError::Structure`] error.
    pub fn from_dict_with_config(record: &JoinTreeRecord, config: EngineConfig) -> Result<JoinTree> {
        let bbn_nodes = record
            .bbn_nodes
            .iter()
            .map(|(id, r)| {
                if r.variable.id != *id {
                    return Err(PptcError::Serialization(format!(
                        "node record {id} holds variable {}",
                        r.variable.id
                    )));
                }
                let node = BbnNode::new(r.variable.clone(), r.probs.clone());
                Ok((*id, Arc::new(node)))
            })
            .collect::<Result<BTreeMap<NodeId, Arc<BbnNode>>>>()?;

        let mut cliques = BTreeMap::new();
        for (id, node) in record.jt.nodes.iter() {
            if let JtNodeRecord::Clique { node_ids } = node {
                let members = node_ids
                    .iter()
                    .map(|n| {
                        bbn_nodes
                            .get(n)
                            .cloned()
                            .ok_or_else(|| PptcError::unknown_node(*n))
                    })
                    .collect::<Result<Vec<Arc<BbnNode>>>>()?;
                cliques.insert(id.clone(), Clique::new(members));
            }
        }

        let mut join_tree = JoinTree::with_config(config);
        for clique in cliques.values() {
            join_tree.add_clique(clique.clone());
        }

        let find_clique = |id: &str| {
            cliques.get(id).cloned().ok_or_else(|| {
                PptcError::Serialization(format!("separation set refers to unknown clique {id}"))
            })
        };
        for edge in record.jt.edges.iter() {
            let Some(JtNodeRecord::Sepset { left, right }) = record.jt.nodes.get(edge) else {
                return Err(PptcError::Serialization(format!(
                    "edge {edge} is not a separation set"
                )));
            };
            let sep_set = find_clique(left.as_str())?.get_sep_set(&find_clique(right.as_str())?);
            if !join_tree.add_edge(sep_set) {
                return Err(PptcError::Structure(format!(
                    "edge {edge} would close a cycle in the join tree"
                )));
            }
        }

        join_tree.set_parent_info(record.jt.parent_info.clone());
        Ok(join_tree)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_dict())?)
    }

    pub fn from_json(json: &str) -> Result<JoinTree> {
        JoinTree::from_json_with_config(json, EngineConfig::default())
    }

    pub fn from_json_with_config(json: &str, config: EngineConfig) -> Result<JoinTree> {
        let record: JoinTreeRecord = serde_json::from_str(json)?;
        JoinTree::from_dict_with_config(&record, config)
    }
}

impl JtNode {
    pub fn to_record(&self) -> JtNodeRecord {
        match self {
            JtNode::Clique(clique) => JtNodeRecord::Clique {
                node_ids: clique.node_ids().to_vec(),
            },
            JtNode::SepSet(sep_set) => JtNodeRecord::Sepset {
                left: sep_set.left().key().to_string(),
                right: sep_set.right().key().to_string(),
            },
        }
    }
}
