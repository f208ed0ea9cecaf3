use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

use crate::graph::NodeId;

pub type Result<T> = std::result::Result<T, PptcError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum PptcError {
    #[error("Structural error: {0}")]
    Structure(String),
    #[error("Dimension mismatch for node {node}: expected {expected} entries, found {actual}")]
    DimensionMismatch {
        node: String,
        expected: usize,
        actual: usize,
    },
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Unknown value '{value}' for variable {node}")]
    UnknownValue { node: String, value: String },
    #[error("Observation of {0} gives no value a positive likelihood")]
    EmptyObservation(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
}

impl PptcError {
    pub fn unknown_node(id: NodeId) -> Self {
        PptcError::UnknownVariable(format!("no node with id {id}"))
    }

    /// True for errors caused by the caller's input rather than by a broken join tree.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PptcError::DimensionMismatch { .. }
                | PptcError::UnknownVariable(_)
                | PptcError::UnknownValue { .. }
                | PptcError::EmptyObservation(_)
                | PptcError::Serialization(_)
        )
    }
}

impl From<JsonError> for PptcError {
    fn from(src: JsonError) -> PptcError {
        PptcError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<toml::de::Error> for PptcError {
    fn from(src: toml::de::Error) -> PptcError {
        PptcError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for PptcError {
    fn from(src: toml::ser::Error) -> PptcError {
        PptcError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<io::Error> for PptcError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => PptcError::NotFound(format!("{x}")),
            _ => PptcError::Io(format!("IOError: {}", x.kind())),
        }
    }
}
