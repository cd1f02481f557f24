//! RegML regulation tooling.
//!
//! Parses RegML regulation and notice documents, applies notice
//! changesets to produce new regulation versions, normalizes documents
//! into a label-addressed tree, derives the presentation layers the
//! front end consumes, diffs versions label by label, and validates the
//! invariants all of that depends on.
//!
//! The label algebra itself (parsing, parents, siblings, ordering)
//! lives in the `regml-label` crate.

pub mod changes;
pub mod diff;
pub mod doc;
pub mod layers;
pub mod settings;
pub mod text;
pub mod tree;
pub mod validate;
pub mod version;

pub use changes::{apply_changes, ApplyOptions, Change, ChangeError};
pub use diff::{diff_documents, diff_trees, DiffEntry, DiffOp};
pub use doc::{LabelIndex, NodePath, XmlElement, XmlNode};
pub use settings::Settings;
pub use tree::{build_reg_tree, NodeType, RegNode};
pub use validate::{Severity, ValidationEvent, Validator};
pub use version::{apply_through, notice_info, NoticeInfo, VersionError, VersionStep};
