/// sigconform - Signature Conformance Checker
///
/// Checks fixture files of type-level assertions against a catalog of
/// declared API signatures. Every statement in a fixture is a call site; a
/// call site is expected to type-check unless an expectation marker directly
/// above it names the diagnostic it must be rejected with.
///
/// # Architecture
///
/// 1. **Fixture front end** (`fixture` module)
///    - Tokenizes and parses the JavaScript-flavoured fixture language
///    - Attaches `// $ExpectError[kind]` markers to the statement below them
///    - Parses the type annotation language shared with declarations files
///
/// 2. **Backend** (`backend` module)
///    - `Catalog`: symbol name → ordered overload set, values and named types
///    - `Evaluator`: infers each call site and classifies rejections
///    - `reconcile` / `summarize`: expectation ledger and report
///    - `pipeline`: catalog build and fixture parse run concurrently, call
///      sites are evaluated in parallel against the shared catalog
///
/// 3. **Configuration** (`config` module): `sigconform.toml`
///
/// # Example
///
/// ```rust
/// use sigconform::backend::builtin_catalog;
/// use sigconform::backend::{CheckOptions, Checker};
/// use sigconform::fixture::{MarkerSyntax, DEFAULT_PREFIX};
///
/// let source = r#"
///     import {cleanup} from '@testing-library/react';
///     cleanup();
///     // $ExpectError[extra-arg]
///     cleanup(1);
/// "#;
///
/// let catalog = builtin_catalog::testing_library().unwrap();
/// let checker = Checker::new(catalog, CheckOptions::default()).unwrap();
/// let syntax = MarkerSyntax::new(&[DEFAULT_PREFIX]).unwrap();
/// let report = checker.check_source("inline", source, &syntax).unwrap();
/// assert!(report.passed());
/// ```
pub mod backend;
pub mod config;
pub mod fixture;

pub use backend::{Catalog, Checker, Report, RunError, Verdict};
pub use config::Config;
