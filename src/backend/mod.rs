// Backend: catalog, evaluation, reconciliation and reporting
//
// - `catalog` / `declarations` / `builtin_catalog`: the declared API surface
// - `call_site` / `scope`: call sites collected from a parsed fixture
// - `evaluator` / `subtyping`: verdict for each call site
// - `ledger` / `report`: verdicts reconciled against expectations
// - `pipeline`: the phases wired together

pub mod builtin_catalog;
pub mod call_site;
pub mod catalog;
pub mod declarations;
pub mod diagnostics;
pub mod evaluator;
pub mod ledger;
pub mod pipeline;
pub mod report;
pub mod scope;
pub mod subtyping;
pub mod types;

pub use call_site::{collect, Assertion, CallSite, Expectation};
pub use catalog::{Catalog, CatalogError};
pub use declarations::Declarations;
pub use diagnostics::{Diagnostic, DiagnosticKind, RejectionCause};
pub use evaluator::{EvalError, Evaluator, Verdict};
pub use ledger::{reconcile, Mismatch};
pub use pipeline::{build_catalog, run, CheckOptions, Checker, RunError};
pub use report::{summarize, Outcome, Report};
pub use types::{Param, Signature, TypeDecl, TypeExpr};
