//! Report emitter
//!
//! Aggregates the reconciled outcomes of one fixture into a pass/fail report.

use std::fmt;

use super::call_site::{CallSite, Expectation};
use super::evaluator::{EvalError, Verdict};
use super::ledger::{reconcile, Mismatch};

/// Result of evaluating one call site
#[derive(Debug, Clone)]
pub enum Outcome {
    Evaluated {
        site: CallSite,
        expected: Expectation,
        verdict: Verdict,
    },
    Fatal {
        site: CallSite,
        error: EvalError,
    },
}

impl Outcome {
    pub fn site(&self) -> &CallSite {
        match self {
            Outcome::Evaluated { site, .. } | Outcome::Fatal { site, .. } => site,
        }
    }
}

/// A call site listed by `show_passing`
#[derive(Debug, Clone, PartialEq)]
pub struct Passing {
    pub location: String,
    pub symbol: String,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Fixture the report covers
    pub name: String,
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub mismatches: Vec<Mismatch>,
    pub fatal: Vec<EvalError>,
    pub passing: Vec<Passing>,
    pub show_passing: bool,
}

impl Report {
    /// True iff there are no mismatches and no fatal errors
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty() && self.fatal.is_empty()
    }

    pub fn with_passing(mut self, show: bool) -> Self {
        self.show_passing = show;
        self
    }
}

/// Summarize outcomes, in the order given, into a report
pub fn summarize(name: &str, outcomes: &[Outcome]) -> Report {
    let mut report = Report {
        name: name.to_string(),
        total: outcomes.len(),
        ..Report::default()
    };

    for outcome in outcomes {
        match outcome {
            Outcome::Evaluated {
                site,
                expected,
                verdict,
            } => {
                if verdict.is_accepted() {
                    report.accepted += 1;
                } else {
                    report.rejected += 1;
                }
                match reconcile(site, *expected, verdict) {
                    Some(mismatch) => report.mismatches.push(mismatch),
                    None => report.passing.push(Passing {
                        location: site.location.to_string(),
                        symbol: site.symbol.clone(),
                        verdict: verdict.clone(),
                    }),
                }
            }
            Outcome::Fatal { error, .. } => report.fatal.push(error.clone()),
        }
    }
    report
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.name)?;
        if self.show_passing {
            for p in &self.passing {
                writeln!(f, "  ok       {} {}: {}", p.location, p.symbol, p.verdict)?;
            }
        }
        for mismatch in &self.mismatches {
            writeln!(f, "  MISMATCH {}", mismatch)?;
        }
        for error in &self.fatal {
            writeln!(f, "  ERROR    {}", error)?;
        }
        writeln!(
            f,
            "{}: {} call sites, {} accepted, {} rejected, {} mismatches, {} errors",
            if self.passed() { "PASS" } else { "FAIL" },
            self.total,
            self.accepted,
            self.rejected,
            self.mismatches.len(),
            self.fatal.len()
        )
    }
}
