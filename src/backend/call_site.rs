//! Call sites and their expectations
//!
//! Walks a parsed fixture in source order, threading the lexical scope through
//! suites and statements, and produces one [`CallSite`] per checked statement
//! together with the [`Expectation`] its marker declares.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::fixture::ast::{Expr, Fixture, Item, Location, Statement, StmtKind};

use super::diagnostics::DiagnosticKind;
use super::scope::Scope;

/// Expected outcome of a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Accept,
    Reject(DiagnosticKind),
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Accept => write!(f, "accepted"),
            Expectation::Reject(kind) => write!(f, "rejected [{}]", kind),
        }
    }
}

/// One checked statement with the scope visible to it
#[derive(Debug, Clone)]
pub struct CallSite {
    pub location: Location,
    /// Titles of the enclosing `describe`/`it` blocks, outermost first
    pub suite: Vec<String>,
    /// Display name of the checked callee, e.g. `fireEvent.click`
    pub symbol: String,
    pub statement: StmtKind,
    pub scope: Arc<Scope>,
}

impl CallSite {
    /// Call site for a statement evaluated in `scope`, outside any suite
    pub fn new(location: Location, statement: StmtKind, scope: Arc<Scope>) -> Self {
        CallSite {
            location,
            suite: Vec::new(),
            symbol: statement_symbol(&statement),
            statement,
            scope,
        }
    }

    pub fn suite_path(&self) -> String {
        self.suite.join(" > ")
    }
}

/// A call site paired with its expectation
#[derive(Debug, Clone)]
pub struct Assertion {
    pub site: CallSite,
    pub expectation: Expectation,
}

/// Collect every checked statement of `fixture` in source order
pub fn collect(fixture: &Fixture) -> Vec<Assertion> {
    let mut out = Vec::new();
    let mut suite = Vec::new();
    collect_items(&fixture.items, Scope::root(), &mut suite, &mut out);
    debug!(target: "sigconform::call_site", count = out.len(), "collected call sites");
    out
}

fn collect_items(
    items: &[Item],
    mut scope: Arc<Scope>,
    suite: &mut Vec<String>,
    out: &mut Vec<Assertion>,
) {
    for item in items {
        match item {
            Item::Statement(stmt) => {
                if stmt.kind.is_checked() {
                    out.push(assertion(stmt, &scope, suite));
                }
                scope = scope.bind(&stmt.kind, stmt.location);
            }
            Item::Suite(s) => {
                suite.push(s.title.clone());
                collect_items(&s.items, Arc::clone(&scope), suite, out);
                suite.pop();
            }
        }
    }
}

fn assertion(stmt: &Statement, scope: &Arc<Scope>, suite: &[String]) -> Assertion {
    let expectation = match &stmt.marker {
        Some(marker) => Expectation::Reject(marker.kind),
        None => Expectation::Accept,
    };
    Assertion {
        site: CallSite {
            location: stmt.location,
            suite: suite.to_vec(),
            symbol: statement_symbol(&stmt.kind),
            statement: stmt.kind.clone(),
            scope: Arc::clone(scope),
        },
        expectation,
    }
}

fn statement_symbol(kind: &StmtKind) -> String {
    match kind {
        StmtKind::Import { source, .. } => format!("import '{}'", source),
        StmtKind::Const { init, .. } => expr_symbol(init),
        StmtKind::Assign {
            object, property, ..
        } => format!("{}.{}", object.path(), property),
        StmtKind::Return(Some(e)) | StmtKind::Expr(e) => expr_symbol(e),
        StmtKind::Return(None) => "return".to_string(),
        StmtKind::DeclareVar { name, .. }
        | StmtKind::TypeAlias { name, .. }
        | StmtKind::Class { name, .. } => name.clone(),
    }
}

/// Callee path of the outermost call, e.g. `act(..).then` for `act(..).then(1)`
fn expr_symbol(expr: &Expr) -> String {
    match expr {
        Expr::Call { callee, .. } => callee.path(),
        Expr::Await(inner) => expr_symbol(inner),
        Expr::Add(left, _) => format!("{} + ..", expr_symbol(left)),
        Expr::New { class, .. } => format!("new {}", class),
        other => other.path(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{parse_fixture, MarkerSyntax, DEFAULT_PREFIX};

    fn assertions(src: &str) -> Vec<Assertion> {
        let syntax = MarkerSyntax::new(&[DEFAULT_PREFIX]).unwrap();
        collect(&parse_fixture(src, &syntax).unwrap())
    }

    #[test]
    fn test_collects_sites_with_suite_paths_and_expectations() {
        let found = assertions(
            "\
describe('act', () => {
  it('fails', () => {
    // $ExpectError[extra-arg]
    act(() => {}, 1);
    act(() => {}).then(() => {});
  });
});
",
        );
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].site.suite_path(), "act > fails");
        assert_eq!(found[0].site.symbol, "act");
        assert_eq!(found[0].expectation, Expectation::Reject(DiagnosticKind::ExtraArg));
        assert_eq!(found[1].site.symbol, "act(..).then");
        assert_eq!(found[1].expectation, Expectation::Accept);
    }

    #[test]
    fn test_scope_snapshots_only_see_earlier_bindings() {
        let found = assertions(
            "\
describe('render', () => {
  f(x);
  const x = g();
  it('uses x', () => {
    f(x);
  });
});
",
        );
        assert_eq!(found.len(), 3);
        assert!(found[0].site.scope.value("x").is_none());
        assert!(found[1].site.scope.value("x").is_none());
        assert!(found[2].site.scope.value("x").is_some());
    }

    #[test]
    fn test_sibling_suites_do_not_share_bindings() {
        let found = assertions(
            "\
describe('a', () => {
  const y = g();
});
describe('b', () => {
  f(y);
});
",
        );
        assert!(found[1].site.scope.value("y").is_none());
    }
}
