//! RegML label algebra.
//!
//! Regulation nodes are addressed by dash-delimited labels such as
//! `1234-1-a-2` or `1234-1-a-2-Interp`. This crate provides parsing and
//! formatting for those labels plus the structural computations the
//! change engine depends on: a label's parent, its preceding sibling
//! (via the marker alphabet catalog), and the ordering used to sequence
//! change directives.
//!
//! # Example
//!
//! ```
//! use regml_label::{format_label, parent_label, parse_label, sibling_label};
//!
//! let path = parse_label("1234-1-g-2");
//! let parent = parent_label(&path).unwrap();
//! assert_eq!(format_label(&parent), "1234-1-g");
//!
//! let sibling = sibling_label(&parse_label("1234-1-g")).unwrap();
//! assert_eq!(format_label(&sibling), "1234-1-f");
//!
//! // The first marker of an alphabet has no preceding sibling.
//! assert_eq!(sibling_label(&parse_label("1234-1-a")), None);
//! ```

use std::cmp::Ordering;

use thiserror::Error;

pub mod markers;
pub use markers::{emphasized, marker_alphabets, roman_lower, INTERP, SUBPART};

/// A single label path segment.
pub type Segment = String;

/// A label path: the dash-separated segments of a `label` attribute.
pub type Segments = Vec<Segment>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("EMPTY_LABEL")]
    EmptyLabel,
    #[error("EMPTY_SEGMENT")]
    EmptySegment,
}

/// Split a label string into its path segments.
///
/// The empty string parses to an empty path.
///
/// # Example
///
/// ```
/// use regml_label::parse_label;
///
/// assert_eq!(parse_label("1234-1-a"), vec!["1234", "1", "a"]);
/// assert_eq!(parse_label(""), Vec::<String>::new());
/// ```
pub fn parse_label(label: &str) -> Segments {
    if label.is_empty() {
        return Vec::new();
    }
    label.split('-').map(|s| s.to_string()).collect()
}

/// Join label path segments back into a label string.
///
/// # Example
///
/// ```
/// use regml_label::format_label;
///
/// let path = vec!["1234".to_string(), "Subpart".to_string(), "A".to_string()];
/// assert_eq!(format_label(&path), "1234-Subpart-A");
/// ```
pub fn format_label(path: &[Segment]) -> String {
    path.join("-")
}

/// Check that a label string is well-formed: non-empty, with no empty
/// segments.
///
/// # Example
///
/// ```
/// use regml_label::{validate_label, LabelError};
///
/// assert!(validate_label("1234-1-a").is_ok());
/// assert_eq!(validate_label(""), Err(LabelError::EmptyLabel));
/// assert_eq!(validate_label("1234--a"), Err(LabelError::EmptySegment));
/// ```
pub fn validate_label(label: &str) -> Result<(), LabelError> {
    if label.is_empty() {
        return Err(LabelError::EmptyLabel);
    }
    if label.split('-').any(|segment| segment.is_empty()) {
        return Err(LabelError::EmptySegment);
    }
    Ok(())
}

/// True if the label addresses a node on an interpretation branch.
pub fn is_interp_label(label: &str) -> bool {
    label == INTERP || label.ends_with(&format!("-{INTERP}")) || label.contains(&format!("-{INTERP}-"))
}

/// Compute the structural parent of a label path.
///
/// Returns `None` for single-segment paths (the root has no parent).
/// Two-segment paths collapse to their first segment, interpretation
/// paths mirror their regular-text counterpart one level up, and any
/// `Subpart` segment truncates the parent to everything before it.
///
/// # Example
///
/// ```
/// use regml_label::{parent_label, parse_label};
///
/// assert_eq!(parent_label(&parse_label("1234")), None);
/// assert_eq!(parent_label(&parse_label("1234-Interp")), Some(parse_label("1234")));
/// assert_eq!(
///     parent_label(&parse_label("1234-1-g-2-Interp")),
///     Some(parse_label("1234-1-g-Interp"))
/// );
/// assert_eq!(parent_label(&parse_label("1234-Subpart-A")), Some(parse_label("1234")));
/// ```
pub fn parent_label(path: &[Segment]) -> Option<Segments> {
    // It can't have a parent if it's only one segment.
    if path.len() <= 1 {
        return None;
    }

    // Two segments attach directly under the part, including `{part}-Interp`.
    if path.len() == 2 {
        return Some(path[..1].to_vec());
    }

    if path[path.len() - 1] == INTERP {
        // The whole interp for the label: parent of the underlying label,
        // with Interp restored.
        let mut parent = parent_label(&path[..path.len() - 1])?;
        parent.push(INTERP.to_string());
        return Some(parent);
    }

    // Subparts attach directly to their part regardless of remaining depth.
    if let Some(pos) = path.iter().position(|s| s == SUBPART) {
        return Some(path[..pos].to_vec());
    }

    Some(path[..path.len() - 1].to_vec())
}

/// Compute the preceding-sibling label path, if one exists.
///
/// The trailing marker (or, for interpretation paths, the marker before
/// the trailing `Interp`) is looked up across the marker alphabets in
/// priority order and decremented within its alphabet. A marker at the
/// start of its alphabet has no preceding sibling, and a marker found in
/// no alphabet resolves to no sibling rather than an error; callers
/// treat the absence as append-at-end-of-parent.
///
/// # Example
///
/// ```
/// use regml_label::{format_label, parse_label, sibling_label};
///
/// let sib = sibling_label(&parse_label("1234-2")).unwrap();
/// assert_eq!(format_label(&sib), "1234-1");
///
/// let sib = sibling_label(&parse_label("1234-1-g-2-Interp")).unwrap();
/// assert_eq!(format_label(&sib), "1234-1-g-1-Interp");
///
/// assert_eq!(sibling_label(&parse_label("1234-Interp")), None);
/// ```
pub fn sibling_label(path: &[Segment]) -> Option<Segments> {
    // It can't have a sibling if it's only one segment.
    if path.len() <= 1 {
        return None;
    }

    // For interpretations, decrement the underlying marker and restore
    // Interp afterwards.
    let is_interp = path[path.len() - 1] == INTERP;
    let (mut sibling, last) = if is_interp {
        (path[..path.len() - 2].to_vec(), &path[path.len() - 2])
    } else {
        (path[..path.len() - 1].to_vec(), &path[path.len() - 1])
    };

    for alphabet in marker_alphabets() {
        if let Some(pos) = alphabet.iter().position(|m| m == last) {
            if pos == 0 {
                // There is no preceding sibling.
                return None;
            }
            sibling.push(alphabet[pos - 1].clone());
            if is_interp {
                sibling.push(INTERP.to_string());
            }
            return Some(sibling);
        }
    }

    // The marker isn't in any alphabet, so there is no preceding sibling.
    None
}

/// Order two labels for change sequencing.
///
/// A trailing `Interp` segment is ignored so an interpretation sorts
/// next to its regular-text counterpart instead of after all numbered
/// children, and at the first divergent segment `Subpart` orders before
/// any other marker so subparts precede their part's direct children.
///
/// # Example
///
/// ```
/// use regml_label::cmp_labels;
/// use std::cmp::Ordering;
///
/// assert_eq!(cmp_labels("1234-Interp", "1234-1-Interp"), Ordering::Less);
/// assert_eq!(cmp_labels("1234-Subpart-A", "1234-1"), Ordering::Less);
/// assert_eq!(cmp_labels("1234-1-a", "1234-1-a"), Ordering::Equal);
/// ```
pub fn cmp_labels(a: &str, b: &str) -> Ordering {
    cmp_label_parts(&parse_label(a), &parse_label(b))
}

/// Segment-list flavor of [`cmp_labels`].
pub fn cmp_label_parts(a: &[Segment], b: &[Segment]) -> Ordering {
    let a = strip_trailing_interp(a);
    let b = strip_trailing_interp(b);
    let mut i = 0;
    loop {
        match (a.get(i), b.get(i)) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x != y {
                    if x == SUBPART {
                        return Ordering::Less;
                    }
                    if y == SUBPART {
                        return Ordering::Greater;
                    }
                    return x.cmp(y);
                }
            }
        }
        i += 1;
    }
}

fn strip_trailing_interp(path: &[Segment]) -> &[Segment] {
    match path.last() {
        Some(last) if last == INTERP => &path[..path.len() - 1],
        _ => path,
    }
}
