//! Fixture syntax tree

use std::fmt;

use crate::backend::diagnostics::DiagnosticKind;
use crate::backend::types::{Param, TypeExpr};

/// Source position (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Location { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Regex(String),
    Bool(bool),
    Null,
    Undefined,
    Ident(String),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Call {
        callee: Box<Expr>,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    /// `new Path.To.Class(args)`
    New {
        class: String,
        args: Vec<Expr>,
    },
    Add(Box<Expr>, Box<Expr>),
    Await(Box<Expr>),
    Arrow(Box<ArrowFn>),
    /// Object literal; shorthand `{ a }` is stored as `("a", Ident("a"))`
    Object(Vec<(String, Expr)>),
    /// Self-closing JSX element `<Name />`
    Jsx(String),
}

impl Expr {
    /// Display form of a callee path (`fireEvent.click`, `act(..).then`)
    pub fn path(&self) -> String {
        match self {
            Expr::Ident(name) => name.clone(),
            Expr::Member { object, property } => format!("{}.{}", object.path(), property),
            Expr::Call { callee, .. } => format!("{}(..)", callee.path()),
            Expr::New { class, .. } => format!("new {}", class),
            Expr::Await(inner) => format!("await {}", inner.path()),
            Expr::Add(left, _) => format!("{} + ..", left.path()),
            Expr::Arrow(_) => "<arrow>".to_string(),
            Expr::Object(_) => "{..}".to_string(),
            Expr::Jsx(name) => format!("<{} />", name),
            Expr::Number(n) => n.to_string(),
            Expr::Str(s) => format!("'{}'", s),
            Expr::Regex(r) => format!("/{}/", r),
            Expr::Bool(b) => b.to_string(),
            Expr::Null => "null".to_string(),
            Expr::Undefined => "undefined".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFn {
    pub is_async: bool,
    /// Unannotated parameters have type `any`
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: ArrowBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Statement>),
}

/// An expectation marker attached to a statement
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub kind: DiagnosticKind,
    pub note: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportName {
    pub name: String,
    pub is_type: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    /// `{ a, b }`
    Object(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Import {
        names: Vec<ImportName>,
        /// `import * as X` or `import X`
        namespace: Option<String>,
        source: String,
    },
    Const {
        pattern: Pattern,
        annotation: Option<TypeExpr>,
        init: Expr,
    },
    DeclareVar {
        name: String,
        ty: TypeExpr,
    },
    TypeAlias {
        name: String,
        params: Vec<String>,
        ty: TypeExpr,
    },
    Class {
        name: String,
        extends: Option<TypeExpr>,
    },
    /// `object.property = value`
    Assign {
        object: Expr,
        property: String,
        value: Expr,
    },
    Return(Option<Expr>),
    Expr(Expr),
}

impl StmtKind {
    /// Whether the statement is checked as a call site, or only extends scope
    pub fn is_checked(&self) -> bool {
        !matches!(
            self,
            StmtKind::DeclareVar { .. } | StmtKind::TypeAlias { .. } | StmtKind::Class { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub location: Location,
    pub marker: Option<Marker>,
    pub kind: StmtKind,
}

/// `describe`/`it` block
#[derive(Debug, Clone, PartialEq)]
pub struct Suite {
    pub title: String,
    pub location: Location,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Statement(Statement),
    Suite(Suite),
}

/// A parsed fixture file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fixture {
    pub items: Vec<Item>,
}

impl Fixture {
    /// Number of statements checked as call sites, at any nesting depth
    pub fn call_site_count(&self) -> usize {
        fn count(items: &[Item]) -> usize {
            items
                .iter()
                .map(|item| match item {
                    Item::Statement(s) => usize::from(s.kind.is_checked()),
                    Item::Suite(suite) => count(&suite.items),
                })
                .sum()
        }
        count(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use crate::fixture::{parse_fixture, MarkerSyntax, DEFAULT_PREFIX};

    #[test]
    fn test_type_only_statements_are_not_call_sites() {
        let syntax = MarkerSyntax::new(&[DEFAULT_PREFIX]).unwrap();
        let fixture = parse_fixture(
            r#"
type Id = number;
declare var id: Id;
describe('outer', () => {
  class Widget extends React.Component<{ ... }> {}
  it('inner', () => {
    cleanup();
    const a: Id = id;
  });
});
"#,
            &syntax,
        )
        .unwrap();
        assert_eq!(fixture.call_site_count(), 2);
    }
}
