//! The migration plan: an ordered list of structural edits.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::matcher::Variant;
use crate::syntax::{FragmentKind, NodeId, Param, Placement};

/// Generated Java source together with the position it parses in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl Fragment {
    pub fn member(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Member,
            text: text.into(),
        }
    }

    pub fn statement(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Statement,
            text: text.into(),
        }
    }

    pub fn expression(text: impl Into<String>) -> Self {
        Self {
            kind: FragmentKind::Expression,
            text: text.into(),
        }
    }
}

/// One structural tree edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Detaches a member and reinserts it at `to`.
    MoveMember { member: NodeId, to: Placement },
    /// Renames a class, method or field declaration.
    RenameMember { member: NodeId, name: String },
    /// Drops access modifiers and prepends `replacement` when given.
    StripModifier {
        member: NodeId,
        replacement: Option<String>,
    },
    RemoveAnnotation { member: NodeId, name: String },
    AddParameter {
        method: NodeId,
        index: usize,
        param: Param,
    },
    /// Renames the method a call invokes.
    RenameCall { call: NodeId, name: String },
    /// Replaces a node in place; the node keeps its id.
    ReplaceNode { target: NodeId, with: Fragment },
    /// Inserts new members or statements.
    Insert { at: Placement, fragment: Fragment },
    DeleteNode { target: NodeId },
    /// Adds imports not yet covered and drops listed imports whose simple
    /// name no longer appears in the unit.
    NormalizeImports {
        add: Vec<String>,
        drop_unused: Vec<String>,
    },
}

impl Edit {
    /// Short kind name used in reports and errors.
    pub fn label(&self) -> &'static str {
        match self {
            Edit::MoveMember { .. } => "move-member",
            Edit::RenameMember { .. } => "rename-member",
            Edit::StripModifier { .. } => "strip-modifier",
            Edit::RemoveAnnotation { .. } => "remove-annotation",
            Edit::AddParameter { .. } => "add-parameter",
            Edit::RenameCall { .. } => "rename-call",
            Edit::ReplaceNode { .. } => "replace-node",
            Edit::Insert {
                at: Placement::Before(_) | Placement::Start(_),
                ..
            } => "insert-before",
            Edit::Insert { .. } => "insert-after",
            Edit::DeleteNode { .. } => "delete-node",
            Edit::NormalizeImports { .. } => "normalize-imports",
        }
    }
}

/// A non-fatal observation made while planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// The enclosing class has no teardown hook to dispose subscriptions in.
    TeardownNotSynthesized { enclosing: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::TeardownNotSynthesized { enclosing } => write!(
                f,
                "{enclosing} has no teardown method; dispose its subscriptions manually"
            ),
        }
    }
}

/// Every edit needed to migrate one candidate into its enclosing class.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub unit: PathBuf,
    pub candidate: String,
    pub enclosing: NodeId,
    pub edits: Vec<Edit>,
    pub notices: Vec<Notice>,
}

impl MigrationPlan {
    pub fn new(unit: impl Into<PathBuf>, candidate: impl Into<String>, enclosing: NodeId) -> Self {
        Self {
            unit: unit.into(),
            candidate: candidate.into(),
            enclosing,
            edits: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// A planning precondition that does not hold. Aborts one candidate only.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "precondition", rename_all = "snake_case")]
pub enum PlanError {
    #[error("{enclosing} already received a migration in this pass")]
    EnclosingAlreadyMigrated { enclosing: String },

    #[error("only nested declarations can be planned, found {variant}")]
    NotNested { variant: Variant },

    #[error("declaration has no enclosing class")]
    MissingEnclosing,

    #[error("{enclosing} already declares aggregate field '{field}'")]
    AggregateAlreadyPresent { enclosing: String, field: String },

    #[error("no method named exactly '{expected}'")]
    MissingRequiredHook { expected: String },

    #[error("unsupported use: {context}")]
    UnsupportedUse { context: String },

    #[error("trigger call is not a whole statement: {context}")]
    TriggerNotStatement { context: String },

    #[error("trigger call outside the enclosing class")]
    TriggerOutsideEnclosing,

    #[error("trigger call in static context of '{method}'")]
    StaticContext { method: String },

    #[error("progress published from '{method}', outside the work hook")]
    PublishOutsideWorkHook { method: String },

    #[error("progress published with {args} values, expected exactly one")]
    PublishArity { args: usize },

    #[error("progress published but no progress hook declared")]
    PublishWithoutProgressHook,

    #[error("anonymous body captures local '{name}'")]
    CapturedLocal { name: String },
}

/// What went wrong applying an edit.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditErrorKind {
    #[error("node {node:?} is no longer in the tree")]
    MissingNode { node: NodeId },

    #[error("'{name}' collides with an existing declaration")]
    Collision { name: String },

    #[error("node {node:?} cannot take this edit: {reason}")]
    InvalidTarget { node: NodeId, reason: String },

    #[error("generated code does not parse: {text}")]
    InvalidFragment { text: String },
}

/// A failed edit. The transaction it belonged to was abandoned.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("edit step {step} ({edit}) failed: {kind}")]
pub struct EditError {
    /// Index of the failing edit in its plan.
    pub step: usize,
    pub edit: String,
    pub kind: EditErrorKind,
}
