use crate::forest::{MdomId, NodeId, TreeId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForestError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("unknown tree {0}")]
    UnknownTree(TreeId),
    #[error("unknown multi-dominance edge {0}")]
    UnknownMdom(MdomId),
    #[error("node {node} is not a daughter of {mother}")]
    NotADaughter { mother: NodeId, node: NodeId },
    #[error("node {0} is the root of its tree; remove the tree instead")]
    RootRemoval(NodeId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathDataError {
    #[error("path data must start with an absolute moveto")]
    MissingMoveto,
    #[error("expected {expected} coordinates, found {found}")]
    CoordinateCount { expected: usize, found: usize },
    #[error("unsupported path command `{0}`")]
    UnsupportedCommand(char),
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to parse document: {0}")]
    Parse(#[from] json5::Error),
    #[error("duplicate node id `{0}`")]
    DuplicateId(String),
    #[error("multi-dominance edge {index} references unknown node `{id}`")]
    DanglingReference { index: usize, id: String },
    #[error(transparent)]
    Forest(#[from] ForestError),
}
