//! `regml-apply` — apply notice changesets to a regulation version.
//!
//! Usage:
//!   regml-apply <regulation.xml> <notice.xml>...
//!
//! Notices are ordered by effective date and applied in sequence; the
//! final regulation XML is written to stdout. Set `REGML_SETTINGS` to a
//! TOML file to override the built-in part tables.

use std::io::{self, Write};
use std::path::Path;
use std::process;

use tracing_subscriber::EnvFilter;

use regml::doc::xml::{parse_document, serialize_document_pretty};
use regml::doc::XmlElement;
use regml::settings::Settings;
use regml::version::apply_through;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: regml-apply <regulation.xml> <notice.xml>...");
        process::exit(1);
    }

    let regulation = read_document(&args[1]);
    let notices: Vec<XmlElement> = args[2..].iter().map(|path| read_document(path)).collect();
    let settings = load_settings();

    match apply_through(&regulation, &notices, &settings) {
        Ok(steps) => {
            let last = steps.last().map(|s| &s.document).unwrap_or(&regulation);
            let xml = serialize_document_pretty(last);
            io::stdout().write_all(xml.as_bytes()).unwrap();
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

fn load_settings() -> Settings {
    match std::env::var("REGML_SETTINGS") {
        Ok(path) => match Settings::load(Path::new(&path)) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("{path}: {e}");
                process::exit(1);
            }
        },
        Err(_) => Settings::builtin(),
    }
}
