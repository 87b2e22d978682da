//! Expectation ledger
//!
//! Reconciles each call site's verdict with the expectation its marker
//! declared. Diagnostic kinds are compared exactly.

use std::fmt;

use super::call_site::{CallSite, Expectation};
use super::evaluator::Verdict;

/// A call site whose verdict disagrees with its expectation
#[derive(Debug, Clone)]
pub struct Mismatch {
    pub site: CallSite,
    pub expected: Expectation,
    pub actual: Verdict,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.site.location)?;
        if !self.site.suite.is_empty() {
            write!(f, "{} > ", self.site.suite_path())?;
        }
        write!(
            f,
            "{}: expected {}, got {}",
            self.site.symbol, self.expected, self.actual
        )
    }
}

/// `None` when the verdict honours the expectation
pub fn reconcile(site: &CallSite, expected: Expectation, actual: &Verdict) -> Option<Mismatch> {
    let agrees = match (expected, actual) {
        (Expectation::Accept, Verdict::Accepted { .. }) => true,
        (Expectation::Reject(kind), Verdict::Rejected(diagnostic)) => kind == diagnostic.kind,
        _ => false,
    };
    if agrees {
        return None;
    }
    Some(Mismatch {
        site: site.clone(),
        expected,
        actual: actual.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::diagnostics::{DiagnosticKind, RejectionCause};
    use crate::backend::scope::Scope;
    use crate::backend::types::TypeExpr;
    use crate::fixture::ast::{Expr, Location, StmtKind};

    fn site() -> CallSite {
        CallSite::new(
            Location::new(4, 3),
            StmtKind::Expr(Expr::Call {
                callee: Box::new(Expr::Ident("act".into())),
                type_args: vec![],
                args: vec![Expr::Number(1.0)],
            }),
            Scope::root(),
        )
    }

    fn rejected(cause: RejectionCause) -> Verdict {
        Verdict::Rejected(cause.into())
    }

    fn extra_arg() -> Verdict {
        rejected(RejectionCause::ArityMismatch {
            supplied: 2,
            min: 1,
            max: Some(1),
        })
    }

    #[test]
    fn test_agreement_yields_no_mismatch() {
        let accepted = Verdict::Accepted { ty: TypeExpr::Void };
        assert!(reconcile(&site(), Expectation::Accept, &accepted).is_none());
        assert!(reconcile(&site(), Expectation::Reject(DiagnosticKind::ExtraArg), &extra_arg()).is_none());
    }

    #[test]
    fn test_kinds_are_compared_exactly() {
        let mismatch = reconcile(
            &site(),
            Expectation::Reject(DiagnosticKind::IncompatibleCall),
            &extra_arg(),
        )
        .unwrap();
        assert_eq!(mismatch.expected, Expectation::Reject(DiagnosticKind::IncompatibleCall));
        assert_eq!(
            mismatch.to_string(),
            "4:3 act: expected rejected [incompatible-call], got rejected [extra-arg] expected 1 argument(s), got 2"
        );
    }

    #[test]
    fn test_unexpected_acceptance_and_rejection() {
        let accepted = Verdict::Accepted { ty: TypeExpr::Void };
        assert!(reconcile(&site(), Expectation::Reject(DiagnosticKind::ExtraArg), &accepted).is_some());
        assert!(reconcile(&site(), Expectation::Accept, &extra_arg()).is_some());
    }
}
