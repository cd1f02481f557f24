//! Sequencing notices into a chain of regulation versions.
//!
//! A notice names the version it applies to; a set of notices for one
//! part therefore forms a chain from the initial regulation to the
//! current text. This module extracts the metadata that defines the
//! chain, orders the notices, and folds the change engine over them.

use chrono::NaiveDate;
use thiserror::Error;

use crate::changes::{apply_changes, ApplyOptions, ChangeError};
use crate::doc::XmlElement;
use crate::settings::Settings;
use crate::text::leading_text;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("notice has no preamble/documentNumber")]
    MissingDocumentNumber,
    #[error("notice {0} has no preamble/effectiveDate")]
    MissingEffectiveDate(String),
    #[error("notice {document_number} has an unreadable effective date {value:?}")]
    BadEffectiveDate {
        document_number: String,
        value: String,
    },
    #[error("notice {0} has no changeset leftDocumentNumber")]
    MissingAppliesTo(String),
    #[error("cannot apply notice {document_number}: {source}")]
    Apply {
        document_number: String,
        #[source]
        source: ChangeError,
    },
}

/// The metadata that positions one notice in a part's version chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeInfo {
    pub document_number: String,
    pub effective_date: NaiveDate,
    /// Document number of the version this notice patches.
    pub applies_to: String,
}

/// One applied notice and the regulation text it produced.
#[derive(Debug, Clone)]
pub struct VersionStep {
    pub notice: NoticeInfo,
    pub document: XmlElement,
}

/// Read a notice's chain metadata from its preamble and changeset.
pub fn notice_info(notice: &XmlElement) -> Result<NoticeInfo, VersionError> {
    let preamble = notice.find("preamble");
    let document_number = preamble
        .and_then(|p| p.find("documentNumber"))
        .map(|el| leading_text(el).trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(VersionError::MissingDocumentNumber)?;
    let date_text = preamble
        .and_then(|p| p.find("effectiveDate"))
        .map(|el| leading_text(el).trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| VersionError::MissingEffectiveDate(document_number.clone()))?;
    let effective_date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d").map_err(|_| {
        VersionError::BadEffectiveDate {
            document_number: document_number.clone(),
            value: date_text,
        }
    })?;
    let applies_to = notice
        .find("changeset")
        .and_then(|c| c.attr("leftDocumentNumber"))
        .map(str::to_string)
        .ok_or_else(|| VersionError::MissingAppliesTo(document_number.clone()))?;
    Ok(NoticeInfo {
        document_number,
        effective_date,
        applies_to,
    })
}

/// Document number of a regulation version, from its preamble.
pub fn document_number(regulation: &XmlElement) -> Option<String> {
    regulation
        .find("preamble")
        .and_then(|p| p.find("documentNumber"))
        .map(|el| leading_text(el).trim().to_string())
        .filter(|t| !t.is_empty())
}

/// CFR part of a regulation, from its preamble.
pub fn document_part(regulation: &XmlElement) -> Option<String> {
    regulation
        .find("preamble")
        .and_then(|p| p.find("cfr"))
        .and_then(|c| c.find("section"))
        .map(|el| leading_text(el).trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Apply every notice to the regulation in chain order, returning each
/// intermediate version.
///
/// Notices are ordered by effective date, the explicit per-part order in
/// `Settings` taking precedence where present. A notice whose applies-to
/// does not match the previous step's document number is still applied,
/// with a warning; the chain is the curator's problem, not the engine's.
pub fn apply_through(
    regulation: &XmlElement,
    notices: &[XmlElement],
    settings: &Settings,
) -> Result<Vec<VersionStep>, VersionError> {
    let mut chain = Vec::with_capacity(notices.len());
    for notice in notices {
        chain.push((notice_info(notice)?, notice));
    }
    let part = document_part(regulation).unwrap_or_default();
    sort_chain(&mut chain, &part, settings);

    let mut steps: Vec<VersionStep> = Vec::with_capacity(chain.len());
    let mut current = regulation.clone();
    for (index, (info, notice)) in chain.into_iter().enumerate() {
        if index > 0 {
            let previous = &steps[index - 1].notice.document_number;
            if *previous != info.applies_to {
                tracing::warn!(
                    notice = %info.document_number,
                    applies_to = %info.applies_to,
                    previous = %previous,
                    "notice does not apply to the previous version"
                );
            }
        }
        tracing::info!(
            notice = %info.document_number,
            effective = %info.effective_date,
            "applying notice"
        );
        let next =
            apply_changes(&current, notice, &ApplyOptions::default()).map_err(|source| {
                VersionError::Apply {
                    document_number: info.document_number.clone(),
                    source,
                }
            })?;
        current = next.clone();
        steps.push(VersionStep {
            notice: info,
            document: next,
        });
    }
    Ok(steps)
}

fn sort_chain(chain: &mut [(NoticeInfo, &XmlElement)], part: &str, settings: &Settings) {
    let order = settings.custom_notice_order.get(part);
    chain.sort_by(|a, b| {
        custom_index(order, &a.0.document_number)
            .cmp(&custom_index(order, &b.0.document_number))
            .then_with(|| a.0.effective_date.cmp(&b.0.effective_date))
            .then_with(|| a.0.document_number.cmp(&b.0.document_number))
    });
}

/// Notices outside the explicit order sort after every notice in it.
fn custom_index(order: Option<&Vec<String>>, document_number: &str) -> usize {
    order
        .and_then(|o| o.iter().position(|d| d == document_number))
        .unwrap_or(usize::MAX)
}
