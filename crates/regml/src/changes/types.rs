//! Core types for the notice application module.

use thiserror::Error;

use crate::doc::XmlElement;

// ── Error ─────────────────────────────────────────────────────────────────

/// A fatal problem with a changeset or its application.
///
/// Any of these aborts the whole notice; the input document is never left
/// partially patched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChangeError {
    #[error("DUPLICATE_LABEL: {0}")]
    DuplicateLabel(String),
    #[error("MISSING_LABEL: {0}")]
    MissingLabel(String),
    #[error("MISSING_PAYLOAD: {0}")]
    MissingPayload(String),
    #[error("MISSING_PARENT: {0}")]
    MissingParent(String),
    #[error("MISSING_RETARGET_INFO")]
    MissingRetargetInfo,
    #[error("MALFORMED_CHANGE: {0}")]
    MalformedChange(String),
}

// ── Change enum ───────────────────────────────────────────────────────────

/// A single `<change>` directive from a notice changeset.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Added {
        label: String,
        parent: Option<String>,
        before: Option<String>,
        after: Option<String>,
        node: XmlElement,
    },
    Modified {
        label: String,
        subpath: Option<String>,
        node: XmlElement,
    },
    Deleted {
        label: String,
        subpath: Option<String>,
    },
    Moved {
        label: String,
        parent: Option<String>,
        before: Option<String>,
        after: Option<String>,
        subpath: Option<String>,
    },
    ChangeTarget {
        old_target: String,
        new_target: String,
        text: Option<String>,
    },
    ChangeLabel {
        label: String,
        new_label: String,
    },
}

impl Change {
    /// Returns the operation name string as it appears in the XML.
    pub fn op_name(&self) -> &'static str {
        match self {
            Change::Added { .. } => "added",
            Change::Modified { .. } => "modified",
            Change::Deleted { .. } => "deleted",
            Change::Moved { .. } => "moved",
            Change::ChangeTarget { .. } => "changeTarget",
            Change::ChangeLabel { .. } => "changeLabel",
        }
    }

    /// The label the directive targets, when it targets one.
    pub fn label(&self) -> Option<&str> {
        match self {
            Change::Added { label, .. } => Some(label),
            Change::Modified { label, .. } => Some(label),
            Change::Deleted { label, .. } => Some(label),
            Change::Moved { label, .. } => Some(label),
            Change::ChangeTarget { .. } => None,
            Change::ChangeLabel { label, .. } => Some(label),
        }
    }
}

/// Options for `apply_changes`.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// If true, run every lookup and validation but leave the document
    /// untouched.
    pub dry: bool,
}
