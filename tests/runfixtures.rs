//! Runs the documents under `tests/fixtures`.
//!
//! Documents under `wf/` must be well-formed. If a `.events` file sits next
//! to one, the events it produces must match it line by line, with line ends
//! and tabs written as `\n` and `\t`.
//!
//! Documents under `not-wf/` must stop with a fatal error. If a `.error`
//! file sits next to one, it names the key of that error.

mod common;

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use common::{Files, scan_source};
use glob::glob;
use xscan::{config::XmlScanConfig, error::XmlScanError, io::XmlInputSource};

fn fixtures(dir: &str) -> Vec<PathBuf> {
    let pattern = format!("{}/tests/fixtures/{dir}/*.xml", env!("CARGO_MANIFEST_DIR"));
    let files = glob(&pattern)
        .expect("valid pattern")
        .collect::<Result<Vec<_>, _>>()
        .expect("readable fixture directory");
    assert!(!files.is_empty(), "no fixtures match {pattern}");
    files
}

fn source(path: &Path) -> XmlInputSource {
    let system_id = path.to_str().expect("fixture paths are UTF-8");
    XmlInputSource::new(None, Some(system_id), None)
}

fn escape(event: &str) -> String {
    event.replace('\n', "\\n").replace('\t', "\\t")
}

#[test]
fn well_formed_documents() {
    let mut failures = vec![];
    for path in fixtures("wf") {
        let outcome = scan_source(
            source(&path),
            XmlScanConfig::default(),
            Files::default(),
            false,
        );
        if !matches!(outcome.result, Ok(false)) || !outcome.errors.is_empty() {
            failures.push(format!(
                "{}: {:?} {:?}",
                path.display(),
                outcome.result,
                outcome.errors
            ));
            continue;
        }

        let Ok(expected) = read_to_string(path.with_extension("events")) else {
            continue;
        };
        let events = outcome
            .events
            .iter()
            .map(|event| escape(event))
            .collect::<Vec<_>>();
        let expected = expected.lines().collect::<Vec<_>>();
        if events != expected {
            failures.push(format!(
                "{}:\n  expected {expected:?}\n  found    {events:?}",
                path.display()
            ));
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn documents_that_are_not_well_formed() {
    let mut failures = vec![];
    for path in fixtures("not-wf") {
        let outcome = scan_source(
            source(&path),
            XmlScanConfig::default(),
            Files::default(),
            false,
        );
        let key = match &outcome.result {
            Err(XmlScanError::Fatal(error)) => error.key(),
            other => {
                failures.push(format!("{}: {other:?}", path.display()));
                continue;
            }
        };
        assert!(!outcome.well_formed);
        if let Ok(expected) = read_to_string(path.with_extension("error")) {
            if key != expected.trim() {
                failures.push(format!(
                    "{}: expected {}, found {key}",
                    path.display(),
                    expected.trim()
                ));
            }
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn recovery_reaches_the_end() {
    for path in fixtures("not-wf") {
        let config = XmlScanConfig {
            continue_after_fatal_error: true,
            ..Default::default()
        };
        let outcome = scan_source(source(&path), config, Files::default(), false);
        assert!(
            matches!(outcome.result, Ok(false)),
            "{}: {:?}",
            path.display(),
            outcome.result
        );
        assert!(!outcome.errors.is_empty(), "{}", path.display());
        assert!(!outcome.well_formed, "{}", path.display());
    }
}
