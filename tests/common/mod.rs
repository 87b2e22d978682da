//! Shared helpers for sigconform integration tests
//!
//! - Locating fixture and declarations files shipped in `fixtures/`
//! - Building checkers over the built-in preset
//! - Writing scratch files for configuration and declarations tests
#![allow(dead_code)]

use sigconform::backend::builtin_catalog;
use sigconform::backend::{Catalog, CheckOptions, Checker, Report};
use sigconform::fixture::{MarkerSyntax, DEFAULT_PREFIXES};

use std::fs;
use std::path::PathBuf;

/// Directory holding the shipped fixtures
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn read_fixture(name: &str) -> String {
    let path = fixture_path(name);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {}", path.display(), e))
}

pub fn default_syntax() -> MarkerSyntax {
    MarkerSyntax::new(DEFAULT_PREFIXES).expect("default marker prefixes are valid")
}

pub fn options(parallel: bool) -> CheckOptions {
    CheckOptions {
        parallel,
        workers: 4,
        show_passing: false,
    }
}

/// Checker over the testing-library preset
pub fn preset_checker(parallel: bool) -> Checker {
    let catalog = builtin_catalog::testing_library().expect("preset builds");
    Checker::new(catalog, options(parallel)).expect("checker starts")
}

pub fn checker_for(catalog: Catalog) -> Checker {
    Checker::new(catalog, options(false)).expect("checker starts")
}

/// Check inline fixture source against the preset
pub fn check(source: &str) -> Report {
    preset_checker(false)
        .check_source("inline", source, &default_syntax())
        .unwrap_or_else(|e| panic!("fixture failed to parse: {}", e))
}

/// Fresh scratch directory, unique per test
pub fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sigconform-{}-{}", test, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

pub fn write_file(dir: &PathBuf, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write scratch file");
    path
}
