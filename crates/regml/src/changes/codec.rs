//! Decoding `<changeset>` directives into typed [`Change`] values.

use crate::doc::XmlElement;
use crate::text::node_text;

use super::types::{Change, ChangeError};

/// Decode every `<change>` in a notice's changeset, in notice order.
///
/// A notice without a `<changeset>` element decodes to an empty list;
/// metadata-only notices are legal.
pub fn decode_changeset(notice: &XmlElement) -> Result<Vec<Change>, ChangeError> {
    let changeset = if notice.tag == "changeset" {
        notice
    } else {
        match notice.find_descendant("changeset") {
            Some(el) => el,
            None => return Ok(Vec::new()),
        }
    };
    changeset
        .elements()
        .filter(|el| el.tag == "change")
        .map(decode_change)
        .collect()
}

/// Decode a single `<change>` element.
pub fn decode_change(change: &XmlElement) -> Result<Change, ChangeError> {
    let op = change.attr("operation").ok_or_else(|| {
        ChangeError::MalformedChange("change element has no operation".to_string())
    })?;
    match op {
        "added" => {
            let label = require_attr(change, op, "label")?;
            let node = payload(change, &label)?;
            Ok(Change::Added {
                parent: optional_attr(change, "parent"),
                before: optional_attr(change, "before"),
                after: optional_attr(change, "after"),
                label,
                node,
            })
        }
        "modified" => {
            let label = require_attr(change, op, "label")?;
            let node = payload(change, &label)?;
            Ok(Change::Modified {
                subpath: optional_attr(change, "subpath"),
                label,
                node,
            })
        }
        "deleted" => Ok(Change::Deleted {
            label: require_attr(change, op, "label")?,
            subpath: optional_attr(change, "subpath"),
        }),
        "moved" => Ok(Change::Moved {
            label: require_attr(change, op, "label")?,
            parent: optional_attr(change, "parent"),
            before: optional_attr(change, "before"),
            after: optional_attr(change, "after"),
            subpath: optional_attr(change, "subpath"),
        }),
        "changeTarget" => {
            let old_target = change
                .attr("oldTarget")
                .ok_or(ChangeError::MissingRetargetInfo)?
                .to_string();
            let new_target = change
                .attr("newTarget")
                .ok_or(ChangeError::MissingRetargetInfo)?
                .to_string();
            let text = node_text(change);
            let text = text.trim();
            Ok(Change::ChangeTarget {
                old_target,
                new_target,
                text: if text.is_empty() {
                    None
                } else {
                    Some(text.to_string())
                },
            })
        }
        "changeLabel" => Ok(Change::ChangeLabel {
            label: require_attr(change, op, "label")?,
            new_label: change
                .attr("newLabel")
                .ok_or(ChangeError::MissingRetargetInfo)?
                .to_string(),
        }),
        other => Err(ChangeError::MalformedChange(format!(
            "unknown operation: {other}"
        ))),
    }
}

fn require_attr(change: &XmlElement, op: &str, name: &str) -> Result<String, ChangeError> {
    change
        .attr(name)
        .map(str::to_string)
        .ok_or_else(|| {
            ChangeError::MalformedChange(format!("{op} change is missing the {name} attribute"))
        })
}

fn optional_attr(change: &XmlElement, name: &str) -> Option<String> {
    change.attr(name).map(str::to_string)
}

fn payload(change: &XmlElement, label: &str) -> Result<XmlElement, ChangeError> {
    change
        .elements()
        .next()
        .cloned()
        .ok_or_else(|| ChangeError::MissingPayload(label.to_string()))
}
