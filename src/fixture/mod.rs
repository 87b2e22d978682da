//! Fixture front end
//!
//! Fixtures are written in a small JavaScript-flavoured language: `describe`/`it`
//! suites containing statements, each optionally preceded by an expectation
//! marker comment. The same lexer and parser also read the type annotation
//! language used by declarations files and the built-in preset.

pub mod ast;
pub mod lexer;
pub mod markers;
pub mod parser;

use std::fmt;
use std::sync::Arc;

use crate::backend::types::{Signature, TypeExpr};

pub use ast::{Fixture, Item, Location, Statement, StmtKind, Suite};
pub use markers::{MarkerSyntax, DEFAULT_PREFIX, DEFAULT_PREFIXES, FLOW_PREFIX};
pub use parser::SUITE_CALLEES;

use lexer::Lexer;
use parser::Parser;

/// Lexing, parsing or marker error, with the position it was detected at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl FixtureError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        FixtureError {
            line,
            column,
            message: message.into(),
        }
    }
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for FixtureError {}

/// Parse a fixture source, recognizing markers with `syntax`
pub fn parse_fixture(source: &str, syntax: &MarkerSyntax) -> Result<Fixture, FixtureError> {
    let lexed = Lexer::new(source).tokenize()?;
    Parser::new(lexed, syntax)?.parse_fixture()
}

/// Parse a standalone type annotation
pub fn parse_type(source: &str) -> Result<TypeExpr, FixtureError> {
    parse_type_with_params(source, &[])
}

/// Parse a type annotation in which `params` name type variables
pub fn parse_type_with_params(source: &str, params: &[String]) -> Result<TypeExpr, FixtureError> {
    let lexed = Lexer::new(source).tokenize()?;
    let mut parser = Parser::for_types(lexed, params);
    let ty = parser.parse_type()?;
    parser.finish()?;
    Ok(ty)
}

/// Parse a function type into a signature
pub fn parse_signature(source: &str) -> Result<Signature, FixtureError> {
    match parse_type(source)? {
        TypeExpr::Function(sig) => Ok(Arc::unwrap_or_clone(sig)),
        other => Err(FixtureError::new(
            1,
            1,
            format!("Expected a function type, found {}", other),
        )),
    }
}
