//! Reference records produced by a [`ReferenceFinder`](super::ReferenceFinder).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::syntax::NodeId;

/// A declaration addressed by its unit and node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeclRef {
    pub unit: PathBuf,
    pub node: NodeId,
}

impl DeclRef {
    pub fn new(unit: impl Into<PathBuf>, node: NodeId) -> Self {
        Self {
            unit: unit.into(),
            node,
        }
    }
}

/// A use of a declaration somewhere in the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Unit containing the use.
    pub unit: PathBuf,
    /// The node that mentions the target.
    pub element: NodeId,
    /// The referenced declaration.
    pub target: DeclRef,
    pub kind: ReferenceKind,
}

impl Reference {
    /// Returns true when the use sits in a different unit than the declaration.
    pub fn is_cross_unit(&self) -> bool {
        self.unit != self.target.unit
    }

    pub fn is_in(&self, unit: &Path) -> bool {
        self.unit == unit
    }
}

/// How the target is mentioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// `new Target(..)`; the element is the `new` expression.
    Instantiation,
    /// A name occurrence in an expression.
    Read,
    /// A declared type of a field, local, parameter or return value; the
    /// element is the declaration.
    Type,
    /// A supertype or interface clause; the element is the subclass.
    Inheritance,
}

/// Where a search looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// Every unit of the project.
    Project,
    /// A single unit.
    Unit(PathBuf),
}

impl SearchScope {
    pub fn includes(&self, unit: &Path) -> bool {
        match self {
            SearchScope::Project => true,
            SearchScope::Unit(path) => path == unit,
        }
    }
}
