//! Notice application: changeset decoding, the application engine, and the
//! bookkeeping that keeps tables of contents and analyses in step with
//! structural edits.

pub mod analysis;
pub mod apply;
pub mod codec;
pub mod toc;
pub mod types;

pub use analysis::merge_analysis;
pub use apply::{apply_changes, canonical_order};
pub use codec::{decode_change, decode_changeset};
pub use types::{ApplyOptions, Change, ChangeError};
