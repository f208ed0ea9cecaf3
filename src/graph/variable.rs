use serde::{Deserialize, Serialize};
use std::fmt;

use super::NodeId;

/// A discrete variable. The order of `values` is significant: it fixes the row layout of every
/// CPT and potential that mentions the variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub id: NodeId,
    pub name: String,
    pub values: Vec<String>,
}

impl Variable {
    pub fn new<S, I>(id: NodeId, name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Variable {
            id,
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Position of `value` in the domain.
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    pub fn cardinality(&self) -> usize {
        self.values.len()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.id, self.name, self.values.join(","))
    }
}
