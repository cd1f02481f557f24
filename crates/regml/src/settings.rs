//! Runtime configuration for the tooling built around the core.
//!
//! Settings are data the algorithms consult but never hardcode: noun
//! singularization overrides for the terms layer, the CFR part number
//! to regulation letter mapping for the meta layer, and per-part
//! overrides of the notice application order.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Terms the singularizer must pass through untouched.
    pub special_singular_nouns: Vec<String>,
    /// CFR part number to regulation letter. Parts not listed here fall
    /// back to their own number.
    pub part_letters: IndexMap<String, String>,
    /// Per-part document number sequences that override effective-date
    /// ordering when notices share dates or arrive out of order.
    pub custom_notice_order: IndexMap<String, Vec<String>>,
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Settings, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Settings, SettingsError> {
        Settings::from_toml_str(&fs::read_to_string(path)?)
    }

    /// The overrides the original tooling shipped with: the two nouns
    /// the stemmer mangles and the CFPB part lettering.
    pub fn builtin() -> Settings {
        let mut part_letters = IndexMap::new();
        let letters = [
            "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P",
            "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z", "AA", "BB", "CC", "DD",
        ];
        for (i, letter) in letters.iter().enumerate() {
            part_letters.insert((1001 + i).to_string(), letter.to_string());
        }
        Settings {
            special_singular_nouns: vec![
                "bonus".to_string(),
                "escrow account analysis".to_string(),
            ],
            part_letters,
            custom_notice_order: IndexMap::new(),
        }
    }

    /// The regulation letter for a part, with the identity fallback
    /// used by parts that have no letter (for example 1070).
    pub fn reg_letter(&self, part: &str) -> String {
        self.part_letters
            .get(part)
            .cloned()
            .unwrap_or_else(|| part.to_string())
    }
}
