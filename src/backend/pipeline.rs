//! Checking pipeline
//!
//! Builds the catalog, parses fixtures, evaluates every call site and
//! summarizes the outcomes. Call sites are independent once collected, so
//! evaluation fans out over a rayon pool sized from the configuration;
//! outcomes are put back in source order before the report is built, which
//! keeps parallel and sequential runs byte-identical.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::config::{CatalogConfig, Config, ConfigError};
use crate::fixture::{parse_fixture, Fixture, FixtureError, MarkerSyntax};

use super::builtin_catalog;
use super::call_site::{collect, Assertion};
use super::catalog::{Catalog, CatalogError};
use super::declarations::Declarations;
use super::evaluator::Evaluator;
use super::report::{summarize, Outcome, Report};

#[derive(Debug)]
pub enum RunError {
    Config(ConfigError),
    Catalog(CatalogError),
    Fixture { name: String, error: FixtureError },
    Io { path: PathBuf, source: io::Error },
    ThreadPool(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Config(e) => write!(f, "{}", e),
            RunError::Catalog(e) => write!(f, "Catalog error: {}", e),
            RunError::Fixture { name, error } => write!(f, "{}:{}", name, error),
            RunError::Io { path, source } => {
                write!(f, "Failed to read '{}': {}", path.display(), source)
            }
            RunError::ThreadPool(reason) => write!(f, "Failed to start workers: {}", reason),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Config(e) => Some(e),
            RunError::Catalog(e) => Some(e),
            RunError::Fixture { error, .. } => Some(error),
            RunError::Io { source, .. } => Some(source),
            RunError::ThreadPool(_) => None,
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(e: ConfigError) -> Self {
        RunError::Config(e)
    }
}

impl From<CatalogError> for RunError {
    fn from(e: CatalogError) -> Self {
        RunError::Catalog(e)
    }
}

/// How call sites are evaluated and reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    pub parallel: bool,
    /// Resolved worker count, at least 1
    pub workers: usize,
    pub show_passing: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions::from(&Config::default())
    }
}

impl From<&Config> for CheckOptions {
    fn from(config: &Config) -> Self {
        CheckOptions {
            parallel: config.evaluation.parallel,
            workers: config.evaluation.worker_count().max(1),
            show_passing: config.report.show_passing,
        }
    }
}

/// Start from the configured preset and merge declarations files over it
pub fn build_catalog(config: &CatalogConfig) -> Result<Catalog, CatalogError> {
    let mut catalog = match config.preset() {
        Some(name) => builtin_catalog::load(name)?,
        None => Catalog::new(),
    };
    for path in &config.declarations {
        let declarations = Declarations::load(path)?;
        declarations.apply(&mut catalog)?;
        debug!(target: "sigconform::pipeline", path = %path.display(), "merged declarations");
    }
    catalog.validate()?;
    info!(
        target: "sigconform::pipeline",
        preset = config.preset().unwrap_or("none"),
        symbols = catalog.len(),
        "catalog ready"
    );
    Ok(catalog)
}

/// Evaluates fixtures against one catalog
pub struct Checker {
    catalog: Catalog,
    options: CheckOptions,
    pool: Option<rayon::ThreadPool>,
}

impl Checker {
    pub fn new(catalog: Catalog, options: CheckOptions) -> Result<Self, RunError> {
        let pool = if options.parallel && options.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(options.workers)
                .thread_name(|i| format!("sigconform-eval-{}", i))
                .build()
                .map_err(|e| RunError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };
        Ok(Checker {
            catalog,
            options,
            pool,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Evaluate every call site of a parsed fixture
    pub fn check(&self, name: &str, fixture: &Fixture) -> Report {
        let start = Instant::now();
        let assertions = collect(fixture);
        let mut outcomes = match &self.pool {
            Some(pool) => pool.install(|| {
                assertions
                    .par_iter()
                    .map(|a| self.evaluate(a))
                    .collect::<Vec<_>>()
            }),
            None => assertions.iter().map(|a| self.evaluate(a)).collect(),
        };
        outcomes.sort_by_key(|o| o.site().location);

        let report = summarize(name, &outcomes).with_passing(self.options.show_passing);
        info!(
            target: "sigconform::pipeline",
            fixture = name,
            call_sites = report.total,
            mismatches = report.mismatches.len(),
            errors = report.fatal.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "fixture checked"
        );
        report
    }

    /// Parse and check fixture source text
    pub fn check_source(
        &self,
        name: &str,
        source: &str,
        syntax: &MarkerSyntax,
    ) -> Result<Report, RunError> {
        let fixture = parse_fixture(source, syntax).map_err(|error| RunError::Fixture {
            name: name.to_string(),
            error,
        })?;
        Ok(self.check(name, &fixture))
    }

    fn evaluate(&self, assertion: &Assertion) -> Outcome {
        let site = assertion.site.clone();
        let result = Evaluator::new(&self.catalog).evaluate(&site);
        trace!(
            target: "sigconform::pipeline",
            location = %site.location,
            symbol = %site.symbol,
            ?result,
            "evaluated call site"
        );
        match result {
            Ok(verdict) => Outcome::Evaluated {
                site,
                expected: assertion.expectation,
                verdict,
            },
            Err(error) => Outcome::Fatal { site, error },
        }
    }
}

/// Marker syntax for the configured prefixes
pub fn marker_syntax(config: &Config) -> Result<MarkerSyntax, RunError> {
    let prefixes: Vec<&str> = config
        .markers
        .prefixes
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();
    MarkerSyntax::new(&prefixes).map_err(|e| RunError::Config(ConfigError::Invalid(e.message)))
}

/// Read and parse one fixture file
pub fn load_fixture(path: &Path, syntax: &MarkerSyntax) -> Result<Fixture, RunError> {
    let source = fs::read_to_string(path).map_err(|source| RunError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_fixture(&source, syntax).map_err(|error| RunError::Fixture {
        name: path.display().to_string(),
        error,
    })
}

/// Check fixture files; one report per file, in argument order
///
/// The catalog is built while the fixtures are read and parsed.
pub fn run(config: &Config, paths: &[PathBuf]) -> Result<Vec<Report>, RunError> {
    let syntax = marker_syntax(config)?;
    let (catalog, fixtures) = rayon::join(
        || build_catalog(&config.catalog),
        || {
            paths
                .par_iter()
                .map(|path| load_fixture(path, &syntax))
                .collect::<Result<Vec<_>, _>>()
        },
    );
    let checker = Checker::new(catalog?, CheckOptions::from(config))?;
    let fixtures = fixtures?;

    Ok(paths
        .iter()
        .zip(&fixtures)
        .map(|(path, fixture)| checker.check(&path.display().to_string(), fixture))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::diagnostics::DiagnosticKind;
    use crate::fixture::DEFAULT_PREFIX;

    const SOURCE: &str = r#"
import {render, cleanup, act} from '@testing-library/react';

describe('cleanup', () => {
  it('takes no arguments', () => {
    cleanup();
    // $ExpectError[extra-arg]
    cleanup(1);
  });
});

describe('act', () => {
  it('requires a callback', () => {
    act(() => {});
    // $ExpectError[incompatible-call]
    act();
  });
});
"#;

    fn checker(parallel: bool) -> Checker {
        let catalog = builtin_catalog::testing_library().unwrap();
        let options = CheckOptions {
            parallel,
            workers: 4,
            show_passing: true,
        };
        Checker::new(catalog, options).unwrap()
    }

    fn syntax() -> MarkerSyntax {
        MarkerSyntax::new(&[DEFAULT_PREFIX]).unwrap()
    }

    #[test]
    fn test_check_source_passes() {
        let report = checker(false).check_source("inline", SOURCE, &syntax()).unwrap();
        assert!(report.passed(), "{}", report);
        assert_eq!(report.rejected, 2);
    }

    #[test]
    fn test_parallel_and_sequential_reports_match() {
        let sequential = checker(false).check_source("inline", SOURCE, &syntax()).unwrap();
        let parallel = checker(true).check_source("inline", SOURCE, &syntax()).unwrap();
        assert_eq!(sequential.to_string(), parallel.to_string());
    }

    #[test]
    fn test_wrong_expectation_is_a_mismatch() {
        let source = SOURCE.replace("[extra-arg]", "[incompatible-type]");
        let report = checker(true).check_source("inline", &source, &syntax()).unwrap();
        assert!(!report.passed());
        assert_eq!(report.mismatches.len(), 1);
        assert_eq!(
            report.mismatches[0].expected,
            crate::backend::call_site::Expectation::Reject(DiagnosticKind::IncompatibleType)
        );
    }

    #[test]
    fn test_parse_error_names_the_fixture() {
        let err = checker(false)
            .check_source("broken.fixture", "cleanup(", &syntax())
            .unwrap_err();
        assert!(matches!(err, RunError::Fixture { ref name, .. } if name == "broken.fixture"));
    }

    #[test]
    fn test_build_catalog_without_preset_is_empty() {
        let config = CatalogConfig {
            preset: String::new(),
            declarations: vec![],
        };
        assert!(build_catalog(&config).unwrap().is_empty());
    }

    #[test]
    fn test_missing_declarations_file_fails() {
        let config = CatalogConfig {
            declarations: vec![PathBuf::from("/nonexistent/decls.toml")],
            ..CatalogConfig::default()
        };
        assert!(matches!(
            build_catalog(&config),
            Err(CatalogError::Declaration { .. })
        ));
    }

    #[test]
    fn test_run_reports_missing_fixture() {
        let err = run(&Config::default(), &[PathBuf::from("/nonexistent/a.fixture")]).unwrap_err();
        assert!(matches!(err, RunError::Io { .. }));
    }
}
