//! Evidence: likelihood information asserted about a single BBN node.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

use super::node::BbnNode;
use crate::{
    config::VirtualEvidenceMode,
    error::{PptcError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EvidenceType {
    /// Relative likelihoods, brought into `[0, 1]` per [`VirtualEvidenceMode`].
    Virtual,
    /// Hard exclusion of a subset of values: nonzero likelihoods become 1.
    Finding,
    /// A single certain value: the most likely value becomes 1, every other value 0. An
    /// observation without any positive likelihood is rejected.
    #[default]
    Observation,
    /// Retraction to the neutral state: every value becomes 1.
    Unobserve,
}

/// How much of the join tree must be recomputed after an evidence change. Ordered by cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeType {
    None,
    Update,
    Retraction,
}

impl ChangeType {
    /// Classifies the move from the stored likelihood vector `old` to `new` (both in domain
    /// order).
    ///
    /// A value going from zero to nonzero cannot be undone by ratio updates and needs a full
    /// reinitialization.
    pub fn classify(old: &[f64], new: &[f64]) -> ChangeType {
        if old == new {
            ChangeType::None
        } else if old
            .iter()
            .zip(new.iter())
            .any(|(o, n)| *o == 0.0 && *n != 0.0)
        {
            ChangeType::Retraction
        } else {
            ChangeType::Update
        }
    }
}

/// All likelihoods are exactly 1: the node carries no information.
pub fn is_unobserved(likelihoods: &[f64]) -> bool {
    likelihoods.iter().all(|l| *l == 1.0)
}

/// Exactly one likelihood is 1 and all others are 0.
pub fn is_observed(likelihoods: &[f64]) -> bool {
    likelihoods.iter().filter(|l| **l == 1.0).count() == 1
        && likelihoods.iter().all(|l| *l == 1.0 || *l == 0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub node: Arc<BbnNode>,
    pub kind: EvidenceType,
    pub values: BTreeMap<String, f64>,
}

impl Evidence {
    pub fn new(node: Arc<BbnNode>, kind: EvidenceType) -> Self {
        Evidence {
            node,
            kind,
            values: BTreeMap::new(),
        }
    }

    pub fn add_value<S: Into<String>>(&mut self, value: S, likelihood: f64) -> &mut Self {
        self.values.insert(value.into(), likelihood);
        self
    }

    /// Likelihoods in domain order; missing values read as 0.
    pub fn likelihoods(&self) -> Vec<f64> {
        self.node
            .variable
            .values
            .iter()
            .map(|v| self.values.get(v).copied().unwrap_or(0.0))
            .collect()
    }

    /// The observed value, if this evidence pins the node to a single value.
    pub fn observed_value(&self) -> Option<&str> {
        let likelihoods = self.likelihoods();
        if !is_observed(&likelihoods) {
            return None;
        }
        self.node
            .variable
            .values
            .iter()
            .zip(likelihoods.iter())
            .find(|(_, l)| **l == 1.0)
            .map(|(v, _)| v.as_str())
    }

    /// Normalizes the likelihoods according to the evidence type. Values outside the node's
    /// domain are rejected; values not mentioned are filled in with 0.
    pub fn validate(&mut self, mode: VirtualEvidenceMode) -> Result<()> {
        if let Some(unknown) = self
            .values
            .keys()
            .find(|v| self.node.variable.index_of(v).is_none())
        {
            return Err(PptcError::UnknownValue {
                node: self.node.name().to_string(),
                value: unknown.clone(),
            });
        }

        let mut likelihoods = self.likelihoods();
        match self.kind {
            EvidenceType::Virtual => match mode {
                VirtualEvidenceMode::Clamp => {
                    likelihoods.iter_mut().for_each(|l| *l = clamp_unit(*l));
                }
                VirtualEvidenceMode::Renormalize => {
                    likelihoods.iter_mut().for_each(|l| *l = l.max(0.0));
                    let max = likelihoods.iter().copied().fold(0.0, f64::max);
                    if max == 0.0 {
                        likelihoods.iter_mut().for_each(|l| *l = 1.0);
                    } else {
                        likelihoods.iter_mut().for_each(|l| *l /= max);
                    }
                }
            },
            EvidenceType::Finding => {
                likelihoods
                    .iter_mut()
                    .for_each(|l| *l = if *l > 0.0 { 1.0 } else { 0.0 });
                if likelihoods.iter().all(|l| *l == 0.0) {
                    likelihoods.iter_mut().for_each(|l| *l = 1.0);
                }
            }
            EvidenceType::Observation => {
                if !likelihoods.iter().any(|l| *l > 0.0) {
                    return Err(PptcError::EmptyObservation(self.node.name().to_string()));
                }
                // ties go to the value listed first in the domain
                let mut best = 0;
                for (i, l) in likelihoods.iter().enumerate() {
                    if *l > likelihoods[best] {
                        best = i;
                    }
                }
                for (i, l) in likelihoods.iter_mut().enumerate() {
                    *l = if i == best { 1.0 } else { 0.0 };
                }
            }
            EvidenceType::Unobserve => {
                likelihoods.iter_mut().for_each(|l| *l = 1.0);
            }
        }

        self.values = self
            .node
            .variable
            .values
            .iter()
            .cloned()
            .zip(likelihoods)
            .collect();
        Ok(())
    }

    /// Compares this (validated) evidence against the likelihoods currently stored for the node.
    pub fn compare(&self, previous: &[f64]) -> ChangeType {
        ChangeType::classify(previous, &self.likelihoods())
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Fluent construction of [`Evidence`]. The type defaults to [`EvidenceType::Observation`].
#[derive(Debug, Clone, Default)]
pub struct EvidenceBuilder {
    node: Option<Arc<BbnNode>>,
    kind: EvidenceType,
    values: Vec<(String, f64)>,
}

impl EvidenceBuilder {
    pub fn new() -> Self {
        EvidenceBuilder::default()
    }

    pub fn with_node(mut self, node: &Arc<BbnNode>) -> Self {
        self.node = Some(node.clone());
        self
    }

    pub fn with_type(mut self, kind: EvidenceType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_evidence<S: Into<String>>(mut self, value: S, likelihood: f64) -> Self {
        self.values.push((value.into(), likelihood));
        self
    }

    pub fn build(self) -> Result<Evidence> {
        let node = self.node.ok_or_else(|| {
            PptcError::UnknownVariable("evidence was built without a node".to_string())
        })?;
        let mut evidence = Evidence::new(node, self.kind);
        for (value, likelihood) in self.values {
            evidence.add_value(value, likelihood);
        }
        Ok(evidence)
    }
}
