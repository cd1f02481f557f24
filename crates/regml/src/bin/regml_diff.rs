//! `regml-diff` — compare two regulation versions label by label.
//!
//! Usage:
//!   regml-diff <left.xml> <right.xml>
//!
//! Writes a JSON object to stdout, one key per changed label, each entry
//! carrying the operation (added, deleted, or modified).

use std::io::{self, Write};
use std::process;

use regml::diff::diff_documents;
use regml::doc::xml::parse_document;
use regml::doc::XmlElement;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: regml-diff <left.xml> <right.xml>");
        process::exit(1);
    }

    let left = read_document(&args[1]);
    let right = read_document(&args[2]);
    let diff = diff_documents(&left, &right);

    match serde_json::to_string_pretty(&diff) {
        Ok(json) => {
            io::stdout().write_all(json.as_bytes()).unwrap();
            io::stdout().write_all(b"\n").unwrap();
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

fn read_document(path: &str) -> XmlElement {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("{path}: {e}");
            process::exit(1);
        }
    };
    match parse_document(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{path}: {e}");
            process::exit(1);
        }
    }
}
