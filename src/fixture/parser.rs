//! Recursive-descent parser for fixtures and type annotations

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::trace;

use crate::backend::types::{ObjectType, Param, Property, Signature, TypeExpr, TypeParam};

use super::ast::*;
use super::lexer::{Lexed, Spanned, Token};
use super::markers::MarkerSyntax;
use super::FixtureError;

/// Identifiers that open a suite when called with a title and a callback
/// Callees parsed as suite blocks rather than call sites
pub const SUITE_CALLEES: &[&str] = &["describe", "it", "test"];

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Type parameters visible to the type currently being parsed
    type_vars: Vec<String>,
    /// Unclaimed expectation markers by line
    markers: BTreeMap<usize, Marker>,
    /// Lines holding nothing but a `//` comment
    comment_lines: BTreeSet<usize>,
    /// Depth of arrow-function block bodies being parsed
    nesting: usize,
}

impl Parser {
    /// Parser for a fixture file, recognizing markers with `syntax`
    pub fn new(lexed: Lexed, syntax: &MarkerSyntax) -> Result<Self, FixtureError> {
        let mut markers = BTreeMap::new();
        let mut comment_lines = BTreeSet::new();
        for comment in lexed.comments {
            if !comment.own_line {
                if syntax.recognize(&comment.text).is_some() {
                    return Err(FixtureError::new(
                        comment.line,
                        comment.column,
                        "Expectation marker must be on its own line above the statement",
                    ));
                }
                continue;
            }
            comment_lines.insert(comment.line);
            match syntax.recognize(&comment.text) {
                Some(Ok((kind, note))) => {
                    markers.insert(
                        comment.line,
                        Marker {
                            kind,
                            note,
                            line: comment.line,
                        },
                    );
                }
                Some(Err(message)) => {
                    return Err(FixtureError::new(comment.line, comment.column, message))
                }
                None => {}
            }
        }
        Ok(Parser {
            tokens: lexed.tokens,
            pos: 0,
            type_vars: Vec::new(),
            markers,
            comment_lines,
            nesting: 0,
        })
    }

    /// Parser for a standalone type annotation with `params` in scope
    pub fn for_types(lexed: Lexed, params: &[String]) -> Self {
        Parser {
            tokens: lexed.tokens,
            pos: 0,
            type_vars: params.to_vec(),
            markers: BTreeMap::new(),
            comment_lines: BTreeSet::new(),
            nesting: 0,
        }
    }

    /// Fail unless every token has been consumed
    pub fn finish(&mut self) -> Result<(), FixtureError> {
        match self.current() {
            Token::Eof => Ok(()),
            other => Err(self.error(format!("Unexpected '{}' after end of input", other))),
        }
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn spanned(&self) -> &Spanned {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn current(&self) -> &Token {
        &self.spanned().token
    }

    fn peek(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)].token
    }

    fn location(&self) -> Location {
        let s = self.spanned();
        Location::new(s.line, s.column)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.current() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_ident(&self, name: &str) -> bool {
        matches!(self.current(), Token::Ident(s) if s == name)
    }

    fn eat_ident(&mut self, name: &str) -> bool {
        if self.is_ident(name) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> FixtureError {
        let s = self.spanned();
        FixtureError::new(s.line, s.column, message)
    }

    fn expect(&mut self, token: Token) -> Result<(), FixtureError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(format!("Expected '{}', found '{}'", token, self.current())))
        }
    }

    fn expect_ident(&mut self) -> Result<String, FixtureError> {
        match self.current().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("Expected identifier, found '{}'", other))),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), FixtureError> {
        if self.eat_ident(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("Expected '{}', found '{}'", keyword, self.current())))
        }
    }

    fn expect_string(&mut self) -> Result<String, FixtureError> {
        match self.current().clone() {
            Token::Str(s) => {
                self.advance();
                Ok(s)
            }
            other => Err(self.error(format!("Expected string literal, found '{}'", other))),
        }
    }

    /// Index of the token closing the bracket at `self.pos + offset`
    fn matching_close(&self, offset: usize, open: &Token, close: &Token) -> Option<usize> {
        let mut depth = 0usize;
        for (i, spanned) in self.tokens.iter().enumerate().skip(self.pos + offset) {
            if &spanned.token == open {
                depth += 1;
            } else if &spanned.token == close {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            } else if spanned.token == Token::Eof {
                return None;
            }
        }
        None
    }

    /// True when the `(` at the cursor opens an arrow parameter list
    fn at_arrow_params(&self) -> bool {
        self.matching_close(0, &Token::LParen, &Token::RParen)
            .and_then(|close| self.tokens.get(close + 1))
            .is_some_and(|next| matches!(next.token, Token::FatArrow | Token::Colon))
    }

    /// True when the `(` at the cursor opens a function type's parameter list
    fn at_function_type_params(&self) -> bool {
        self.matching_close(0, &Token::LParen, &Token::RParen)
            .and_then(|close| self.tokens.get(close + 1))
            .is_some_and(|next| next.token == Token::FatArrow)
    }

    fn skip_balanced(&mut self, open: Token, close: Token) -> Result<(), FixtureError> {
        match self.matching_close(0, &open, &close) {
            Some(end) => {
                self.pos = end + 1;
                Ok(())
            }
            None => Err(self.error(format!("Unclosed '{}'", open))),
        }
    }

    // ========================================================================
    // Fixture structure
    // ========================================================================

    pub fn parse_fixture(&mut self) -> Result<Fixture, FixtureError> {
        let items = self.parse_items(&Token::Eof)?;
        self.expect(Token::Eof)?;

        if let Some(marker) = self.markers.values().next() {
            return Err(FixtureError::new(
                marker.line,
                1,
                format!(
                    "Expectation marker [{}] is not attached to a statement",
                    marker.kind
                ),
            ));
        }
        Ok(Fixture { items })
    }

    fn parse_items(&mut self, terminator: &Token) -> Result<Vec<Item>, FixtureError> {
        let mut items = Vec::new();
        while !self.check(terminator) && !self.check(&Token::Eof) {
            if self.eat(&Token::Semicolon) {
                continue;
            }
            if self.at_suite() {
                items.push(Item::Suite(self.parse_suite()?));
            } else {
                items.push(Item::Statement(self.parse_statement()?));
            }
        }
        Ok(items)
    }

    fn at_suite(&self) -> bool {
        matches!(self.current(), Token::Ident(name) if SUITE_CALLEES.contains(&name.as_str()))
            && *self.peek(1) == Token::LParen
            && matches!(self.peek(2), Token::Str(_))
    }

    fn parse_suite(&mut self) -> Result<Suite, FixtureError> {
        let location = self.location();
        self.advance(); // describe / it
        self.expect(Token::LParen)?;
        let title = self.expect_string()?;
        self.expect(Token::Comma)?;

        self.eat_ident("async");
        match self.current() {
            Token::LParen => self.skip_balanced(Token::LParen, Token::RParen)?,
            Token::Ident(_) => {
                self.advance();
            }
            other => {
                return Err(self.error(format!("Expected suite callback, found '{}'", other)))
            }
        }
        self.expect(Token::FatArrow)?;
        self.expect(Token::LBrace)?;
        let items = self.parse_items(&Token::RBrace)?;
        self.expect(Token::RBrace)?;
        self.eat(&Token::Comma);
        self.expect(Token::RParen)?;
        self.eat(&Token::Semicolon);

        trace!(target: "sigconform::fixture::parser", %title, items = items.len(), "suite");
        Ok(Suite {
            title,
            location,
            items,
        })
    }

    /// Claim the marker on the comment-only lines directly above `line`
    fn take_marker(&mut self, line: usize) -> Result<Option<Marker>, FixtureError> {
        let mut found: Option<Marker> = None;
        let mut above = line.saturating_sub(1);
        while above > 0 && self.comment_lines.contains(&above) {
            if let Some(marker) = self.markers.remove(&above) {
                if let Some(previous) = &found {
                    return Err(FixtureError::new(
                        previous.line,
                        1,
                        "A statement may carry only one expectation marker",
                    ));
                }
                found = Some(marker);
            }
            above -= 1;
        }
        Ok(found)
    }

    fn parse_statement(&mut self) -> Result<Statement, FixtureError> {
        let location = self.location();
        let marker = self.take_marker(location.line)?;
        let kind = self.parse_statement_kind()?;

        if let Some(m) = &marker {
            if self.nesting > 0 {
                return Err(FixtureError::new(
                    m.line,
                    1,
                    "Expectation markers are not allowed inside nested function bodies",
                ));
            }
            if !kind.is_checked() {
                return Err(FixtureError::new(
                    m.line,
                    1,
                    "Expectation marker precedes a declaration that is not checked",
                ));
            }
        }

        Ok(Statement {
            location,
            marker,
            kind,
        })
    }

    fn parse_statement_kind(&mut self) -> Result<StmtKind, FixtureError> {
        let kind = match self.current() {
            Token::Ident(k) if k == "import" => self.parse_import()?,
            Token::Ident(k) if k == "const" || k == "let" || k == "var" => self.parse_const()?,
            Token::Ident(k) if k == "declare" => {
                self.advance();
                if !(self.eat_ident("var") || self.eat_ident("const") || self.eat_ident("let")) {
                    return Err(self.error("Expected 'var' after 'declare'"));
                }
                let name = self.expect_ident()?;
                self.expect(Token::Colon)?;
                let ty = self.parse_type()?;
                StmtKind::DeclareVar { name, ty }
            }
            Token::Ident(k) if k == "type" && matches!(self.peek(1), Token::Ident(_)) => {
                self.parse_type_alias()?
            }
            Token::Ident(k) if k == "class" => {
                self.advance();
                let name = self.expect_ident()?;
                let extends = if self.eat_ident("extends") {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                self.skip_balanced(Token::LBrace, Token::RBrace)?;
                StmtKind::Class { name, extends }
            }
            Token::Ident(k) if k == "return" => {
                self.advance();
                if matches!(self.current(), Token::Semicolon | Token::RBrace | Token::Eof) {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expr()?))
                }
            }
            _ => {
                let expr = self.parse_expr()?;
                if self.eat(&Token::Equals) {
                    let Expr::Member { object, property } = expr else {
                        return Err(self.error("Only member assignments are supported"));
                    };
                    let value = self.parse_expr()?;
                    StmtKind::Assign {
                        object: *object,
                        property,
                        value,
                    }
                } else {
                    StmtKind::Expr(expr)
                }
            }
        };
        self.eat(&Token::Semicolon);
        Ok(kind)
    }

    fn parse_import(&mut self) -> Result<StmtKind, FixtureError> {
        self.expect_keyword("import")?;
        let mut names = Vec::new();
        let mut namespace = None;

        let all_types = self.is_ident("type") && *self.peek(1) == Token::LBrace;
        if all_types {
            self.advance();
        }

        if self.eat(&Token::Star) {
            self.expect_keyword("as")?;
            namespace = Some(self.expect_ident()?);
        } else {
            if matches!(self.current(), Token::Ident(name) if name != "from") {
                namespace = Some(self.expect_ident()?);
                self.eat(&Token::Comma);
            }
            if self.eat(&Token::LBrace) {
                while !self.check(&Token::RBrace) {
                    let is_type = all_types
                        || (self.is_ident("type") && matches!(self.peek(1), Token::Ident(_)));
                    if is_type && !all_types {
                        self.advance();
                    }
                    let name = self.expect_ident()?;
                    names.push(ImportName { name, is_type });
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBrace)?;
            }
        }
        self.expect_keyword("from")?;
        let source = self.expect_string()?;
        Ok(StmtKind::Import {
            names,
            namespace,
            source,
        })
    }

    fn parse_const(&mut self) -> Result<StmtKind, FixtureError> {
        self.advance(); // const / let / var
        let pattern = if self.eat(&Token::LBrace) {
            let mut names = Vec::new();
            while !self.check(&Token::RBrace) {
                names.push(self.expect_ident()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RBrace)?;
            Pattern::Object(names)
        } else {
            Pattern::Ident(self.expect_ident()?)
        };
        let annotation = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(Token::Equals)?;
        let init = self.parse_expr()?;
        Ok(StmtKind::Const {
            pattern,
            annotation,
            init,
        })
    }

    fn parse_type_alias(&mut self) -> Result<StmtKind, FixtureError> {
        self.expect_keyword("type")?;
        let name = self.expect_ident()?;
        let mut params = Vec::new();
        if self.eat(&Token::Lt) {
            while !self.check(&Token::Gt) {
                params.push(self.expect_ident()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::Gt)?;
        }
        self.expect(Token::Equals)?;

        let scope = self.type_vars.len();
        self.type_vars.extend(params.iter().cloned());
        let ty = self.parse_type();
        self.type_vars.truncate(scope);

        Ok(StmtKind::TypeAlias {
            name,
            params,
            ty: ty?,
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn parse_expr(&mut self) -> Result<Expr, FixtureError> {
        let mut left = self.parse_unary()?;
        while self.eat(&Token::Plus) {
            let right = self.parse_unary()?;
            left = Expr::Add(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, FixtureError> {
        if self.eat_ident("await") {
            return Ok(Expr::Await(Box::new(self.parse_unary()?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, FixtureError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current() {
                Token::Dot => {
                    self.advance();
                    let property = self.expect_ident()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                    };
                }
                Token::LParen => {
                    let args = self.parse_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        type_args: Vec::new(),
                        args,
                    };
                }
                Token::Lt => {
                    let type_args = self.parse_type_args()?;
                    let args = self.parse_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        type_args,
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, FixtureError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        while !self.check(&Token::RParen) {
            args.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, FixtureError> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            Token::Regex(r) => {
                self.advance();
                Ok(Expr::Regex(r))
            }
            Token::LParen => {
                if self.at_arrow_params() {
                    return self.parse_arrow(false);
                }
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBrace => self.parse_object_literal(),
            Token::Lt => {
                self.advance();
                let name = self.parse_dotted_name()?;
                self.expect(Token::SlashGt)?;
                Ok(Expr::Jsx(name))
            }
            Token::Ident(name) => match name.as_str() {
                "true" | "false" => {
                    self.advance();
                    Ok(Expr::Bool(name == "true"))
                }
                "null" => {
                    self.advance();
                    Ok(Expr::Null)
                }
                "undefined" => {
                    self.advance();
                    Ok(Expr::Undefined)
                }
                "new" => {
                    self.advance();
                    let class = self.parse_dotted_name()?;
                    let args = if self.check(&Token::LParen) {
                        self.parse_args()?
                    } else {
                        Vec::new()
                    };
                    Ok(Expr::New { class, args })
                }
                "async"
                    if matches!(self.peek(1), Token::LParen)
                        || (matches!(self.peek(1), Token::Ident(_))
                            && *self.peek(2) == Token::FatArrow) =>
                {
                    self.advance();
                    self.parse_arrow(true)
                }
                _ if *self.peek(1) == Token::FatArrow => self.parse_arrow(false),
                _ => {
                    self.advance();
                    Ok(Expr::Ident(name))
                }
            },
            other => Err(self.error(format!("Expected expression, found '{}'", other))),
        }
    }

    fn parse_dotted_name(&mut self) -> Result<String, FixtureError> {
        let mut name = self.expect_ident()?;
        while self.check(&Token::Dot) && matches!(self.peek(1), Token::Ident(_)) {
            self.advance();
            name.push('.');
            name.push_str(&self.expect_ident()?);
        }
        Ok(name)
    }

    fn parse_arrow(&mut self, is_async: bool) -> Result<Expr, FixtureError> {
        let mut params = Vec::new();
        if self.eat(&Token::LParen) {
            while !self.check(&Token::RParen) {
                let name = self.expect_ident()?;
                let optional = self.eat(&Token::Question);
                let ty = if self.eat(&Token::Colon) {
                    self.parse_type()?
                } else {
                    TypeExpr::Any
                };
                params.push(Param {
                    name: Some(name),
                    ty,
                    optional,
                });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        } else {
            params.push(Param {
                name: Some(self.expect_ident()?),
                ty: TypeExpr::Any,
                optional: false,
            });
        }

        let ret = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(Token::FatArrow)?;

        let body = if self.check(&Token::LBrace) {
            ArrowBody::Block(self.parse_block()?)
        } else {
            ArrowBody::Expr(Box::new(self.parse_expr()?))
        };
        Ok(Expr::Arrow(Box::new(ArrowFn {
            is_async,
            params,
            ret,
            body,
        })))
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, FixtureError> {
        self.expect(Token::LBrace)?;
        self.nesting += 1;
        let mut statements = Vec::new();
        let result = loop {
            if self.check(&Token::RBrace) || self.check(&Token::Eof) {
                break Ok(());
            }
            if self.eat(&Token::Semicolon) {
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => break Err(e),
            }
        };
        self.nesting -= 1;
        result?;
        self.expect(Token::RBrace)?;
        Ok(statements)
    }

    fn parse_object_literal(&mut self) -> Result<Expr, FixtureError> {
        self.expect(Token::LBrace)?;
        let mut entries = Vec::new();
        while !self.check(&Token::RBrace) {
            let key = match self.current().clone() {
                Token::Ident(name) => name,
                Token::Str(s) => s,
                other => {
                    return Err(self.error(format!("Expected property name, found '{}'", other)))
                }
            };
            let shorthand = matches!(self.current(), Token::Ident(_));
            self.advance();
            let value = if self.eat(&Token::Colon) {
                self.parse_expr()?
            } else if shorthand {
                Expr::Ident(key.clone())
            } else {
                return Err(self.error("Expected ':' after string property name"));
            };
            entries.push((key, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RBrace)?;
        Ok(Expr::Object(entries))
    }

    // ========================================================================
    // Types
    // ========================================================================

    pub fn parse_type(&mut self) -> Result<TypeExpr, FixtureError> {
        self.eat(&Token::Pipe);
        let mut parts = vec![self.parse_intersection_type()?];
        while self.eat(&Token::Pipe) {
            parts.push(self.parse_intersection_type()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            TypeExpr::union(parts)
        })
    }

    fn parse_intersection_type(&mut self) -> Result<TypeExpr, FixtureError> {
        self.eat(&Token::Ampersand);
        let mut parts = vec![self.parse_prefix_type()?];
        while self.eat(&Token::Ampersand) {
            parts.push(self.parse_prefix_type()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            TypeExpr::intersection(parts)
        })
    }

    fn parse_prefix_type(&mut self) -> Result<TypeExpr, FixtureError> {
        if self.eat(&Token::Question) {
            return Ok(TypeExpr::Maybe(Box::new(self.parse_prefix_type()?)));
        }
        let mut ty = self.parse_primary_type()?;
        while self.check(&Token::LBracket) && *self.peek(1) == Token::RBracket {
            self.advance();
            self.advance();
            ty = TypeExpr::Array(Box::new(ty));
        }
        Ok(ty)
    }

    fn parse_primary_type(&mut self) -> Result<TypeExpr, FixtureError> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(TypeExpr::NumberLit(n))
            }
            Token::Str(s) => {
                self.advance();
                Ok(TypeExpr::StringLit(s))
            }
            Token::Lt => self.parse_function_type(),
            Token::LParen => {
                if self.at_function_type_params() {
                    return self.parse_function_type();
                }
                self.advance();
                let inner = self.parse_type()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBrace | Token::LBracePipe => self.parse_object_type(),
            Token::Ident(name) => {
                let keyword = match name.as_str() {
                    "number" => Some(TypeExpr::Number),
                    "string" => Some(TypeExpr::String),
                    "boolean" | "bool" | "true" | "false" => Some(TypeExpr::Bool),
                    "void" | "undefined" => Some(TypeExpr::Void),
                    "null" => Some(TypeExpr::Null),
                    "mixed" => Some(TypeExpr::Mixed),
                    "any" => Some(TypeExpr::Any),
                    _ => None,
                };
                if let Some(ty) = keyword {
                    self.advance();
                    return Ok(ty);
                }
                self.parse_named_type()
            }
            other => Err(self.error(format!("Expected type, found '{}'", other))),
        }
    }

    fn parse_named_type(&mut self) -> Result<TypeExpr, FixtureError> {
        let name = self.parse_dotted_name()?;
        let args = if self.check(&Token::Lt) {
            self.parse_type_args()?
        } else {
            Vec::new()
        };

        if args.is_empty() && self.type_vars.contains(&name) {
            return Ok(TypeExpr::Var(name));
        }
        match (name.as_str(), args.len()) {
            ("Array" | "$ReadOnlyArray", 1) => {
                Ok(TypeExpr::Array(Box::new(args.into_iter().next().unwrap_or(TypeExpr::Any))))
            }
            ("Class", 1) => {
                Ok(TypeExpr::Class(Box::new(args.into_iter().next().unwrap_or(TypeExpr::Any))))
            }
            _ => Ok(TypeExpr::Named(name, args)),
        }
    }

    fn parse_type_args(&mut self) -> Result<Vec<TypeExpr>, FixtureError> {
        self.expect(Token::Lt)?;
        let mut args = Vec::new();
        while !self.check(&Token::Gt) {
            args.push(self.parse_type()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::Gt)?;
        Ok(args)
    }

    fn parse_function_type(&mut self) -> Result<TypeExpr, FixtureError> {
        let scope = self.type_vars.len();
        let result = self.parse_function_type_inner();
        self.type_vars.truncate(scope);
        result.map(|sig| TypeExpr::Function(Arc::new(sig)))
    }

    fn parse_function_type_inner(&mut self) -> Result<Signature, FixtureError> {
        let mut type_params = Vec::new();
        if self.eat(&Token::Lt) {
            while !self.check(&Token::Gt) {
                let name = self.expect_ident()?;
                let bound = if self.eat(&Token::Colon) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                self.type_vars.push(name.clone());
                type_params.push(TypeParam { name, bound });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(Token::Gt)?;
        }

        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        let mut rest = None;
        while !self.check(&Token::RParen) {
            if self.eat(&Token::Ellipsis) {
                if matches!(self.current(), Token::Ident(_)) && *self.peek(1) == Token::Colon {
                    self.advance();
                    self.advance();
                }
                rest = Some(match self.parse_type()? {
                    TypeExpr::Array(elem) => *elem,
                    _ => TypeExpr::Any,
                });
                self.eat(&Token::Comma);
                break;
            }
            let named = matches!(self.current(), Token::Ident(_))
                && (*self.peek(1) == Token::Colon
                    || (*self.peek(1) == Token::Question && *self.peek(2) == Token::Colon));
            let param = if named {
                let name = self.expect_ident()?;
                let optional = self.eat(&Token::Question);
                self.expect(Token::Colon)?;
                Param {
                    name: Some(name),
                    ty: self.parse_type()?,
                    optional,
                }
            } else {
                Param {
                    name: None,
                    ty: self.parse_type()?,
                    optional: false,
                }
            };
            params.push(param);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        self.expect(Token::FatArrow)?;
        let ret = self.parse_type()?;

        Ok(Signature {
            type_params,
            params,
            rest,
            ret,
        })
    }

    /// Object type; `{ }` is exact unless it lists `...`, `{| |}` is always exact
    fn parse_object_type(&mut self) -> Result<TypeExpr, FixtureError> {
        let close = match self.advance() {
            Token::LBracePipe => Token::PipeRBrace,
            _ => Token::RBrace,
        };
        let mut exact = true;
        let mut props: Vec<Property> = Vec::new();

        while !self.check(&close) {
            if self.eat(&Token::Ellipsis) {
                if close == Token::PipeRBrace {
                    return Err(self.error("Exact object types cannot be inexact"));
                }
                exact = false;
            } else {
                let name = match self.current().clone() {
                    Token::Ident(name) | Token::Str(name) => name,
                    other => {
                        return Err(
                            self.error(format!("Expected property name, found '{}'", other))
                        )
                    }
                };
                self.advance();
                let optional = self.eat(&Token::Question);
                self.expect(Token::Colon)?;
                let ty = self.parse_type()?;
                props.push(Property { name, ty, optional });
            }
            if !(self.eat(&Token::Comma) || self.eat(&Token::Semicolon)) {
                break;
            }
        }
        self.expect(close)?;
        Ok(TypeExpr::Object(ObjectType { props, exact }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::diagnostics::DiagnosticKind;
    use crate::backend::types::*;
    use crate::fixture::lexer::Lexer;
    use crate::fixture::markers::DEFAULT_PREFIX;

    fn fixture(src: &str) -> Result<Fixture, FixtureError> {
        let syntax = MarkerSyntax::new(&[DEFAULT_PREFIX]).unwrap();
        let lexed = Lexer::new(src).tokenize()?;
        Parser::new(lexed, &syntax)?.parse_fixture()
    }

    fn ty(src: &str) -> TypeExpr {
        let lexed = Lexer::new(src).tokenize().unwrap();
        let mut parser = Parser::for_types(lexed, &[]);
        let t = parser.parse_type().unwrap();
        assert_eq!(parser.current(), &Token::Eof);
        t
    }

    fn statements(items: &[Item]) -> Vec<&Statement> {
        items
            .iter()
            .filter_map(|i| match i {
                Item::Statement(s) => Some(s),
                Item::Suite(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_types() {
        assert_eq!(ty("?number"), maybe(TypeExpr::Number));
        assert_eq!(ty("string[]"), array(TypeExpr::String));
        assert_eq!(ty("Array<Node>"), array(named("Node")));
        assert_eq!(ty("Promise<Array<Node>>"), promise(array(named("Node"))));
        assert_eq!(ty("React.Element"), named("React.Element"));
        assert_eq!(ty("123456"), TypeExpr::NumberLit(123456.0));
        assert_eq!(
            ty("| 'input' | 'div'"),
            TypeExpr::Union(vec![TypeExpr::StringLit("input".into()), TypeExpr::StringLit("div".into())])
        );
        assert_eq!(
            ty("A & B"),
            TypeExpr::Intersection(vec![named("A"), named("B")])
        );
    }

    #[test]
    fn test_function_types() {
        assert_eq!(
            ty("(callback: () => void | Thenable) => Thenable"),
            arrow(
                vec![param(
                    "callback",
                    arrow(vec![], TypeExpr::union(vec![TypeExpr::Void, named("Thenable")]))
                )],
                named("Thenable")
            )
        );

        let TypeExpr::Function(sig) = ty("<T: HTMLElement>(string, cb?: () => T, ...rest: number[]) => Promise<T>") else {
            panic!("expected function type");
        };
        assert_eq!(sig.type_params[0].bound, Some(named("HTMLElement")));
        assert_eq!(sig.params[0].name, None);
        assert!(sig.params[1].optional);
        assert_eq!(sig.rest, Some(TypeExpr::Number));
        assert_eq!(sig.ret, promise(TypeExpr::Var("T".into())));
    }

    #[test]
    fn test_object_types() {
        assert_eq!(
            ty("{| a: number, b?: string |}"),
            exact_object(vec![prop("a", TypeExpr::Number), opt_prop("b", TypeExpr::String)])
        );
        assert_eq!(ty("{ a: number, ... }"), object(vec![prop("a", TypeExpr::Number)]));
        assert_eq!(ty("{ ... }"), object(vec![]));
        assert_eq!(ty("{ a: number }"), exact_object(vec![prop("a", TypeExpr::Number)]));
    }

    #[test]
    fn test_suites_and_markers() {
        let src = "\
describe('act', () => {
  it('fails', () => {
    // $ExpectError[incompatible-call]
    act(1);
    act(() => {});
  });
});
";
        let fixture = fixture(src).unwrap();
        let Item::Suite(outer) = &fixture.items[0] else {
            panic!("expected suite");
        };
        assert_eq!(outer.title, "act");
        let Item::Suite(inner) = &outer.items[0] else {
            panic!("expected nested suite");
        };
        let stmts = statements(&inner.items);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].location, Location::new(4, 5));
        assert_eq!(
            stmts[0].marker.as_ref().map(|m| m.kind),
            Some(DiagnosticKind::IncompatibleCall)
        );
        assert_eq!(stmts[1].marker, None);
        assert_eq!(fixture.call_site_count(), 2);
    }

    #[test]
    fn test_expressions() {
        let fixture = fixture(
            "act(() => {}).then(1) + 1;\nrender<{| q: (string) => number |}>(<C />, { queries });\nawait new MouseEvent('click', { bubbles: true });",
        )
        .unwrap();
        let stmts = statements(&fixture.items);

        let StmtKind::Expr(Expr::Add(left, right)) = &stmts[0].kind else {
            panic!("expected addition");
        };
        assert_eq!(left.path(), "act(..).then(..)");
        assert_eq!(**right, Expr::Number(1.0));

        let StmtKind::Expr(Expr::Call { type_args, args, .. }) = &stmts[1].kind else {
            panic!("expected call");
        };
        assert_eq!(type_args.len(), 1);
        assert_eq!(args[0], Expr::Jsx("C".into()));
        assert_eq!(
            args[1],
            Expr::Object(vec![("queries".into(), Expr::Ident("queries".into()))])
        );

        assert!(matches!(&stmts[2].kind, StmtKind::Expr(Expr::Await(inner)) if matches!(**inner, Expr::New { .. })));
    }

    #[test]
    fn test_arrows() {
        let fixture = fixture(
            "f((content: string, element) => true);\ng(async () => ({ then: (resolve: () => mixed) => {} }));\nh(x => x);",
        )
        .unwrap();
        let stmts = statements(&fixture.items);
        let StmtKind::Expr(Expr::Call { args, .. }) = &stmts[0].kind else {
            panic!("expected call");
        };
        let Expr::Arrow(arrow_fn) = &args[0] else {
            panic!("expected arrow");
        };
        assert_eq!(arrow_fn.params[0].ty, TypeExpr::String);
        assert_eq!(arrow_fn.params[1].ty, TypeExpr::Any);
        assert_eq!(arrow_fn.body, ArrowBody::Expr(Box::new(Expr::Bool(true))));

        let StmtKind::Expr(Expr::Call { args, .. }) = &stmts[1].kind else {
            panic!("expected call");
        };
        assert!(matches!(&args[0], Expr::Arrow(a) if a.is_async && matches!(a.body, ArrowBody::Expr(_))));
    }

    #[test]
    fn test_declarations() {
        let fixture = fixture(
            "\
import { act, type IntersectionHTMLElement } from '@testing-library/react';
import * as React from 'react';
class Component extends React.Component<{ ... }> {}
type CustomReturnType = 123456;
declare var customValue: CustomReturnType;
const { container, debug } = render(<Component />);
const a: number = container;
el.value = 'x';
",
        )
        .unwrap();
        let stmts = statements(&fixture.items);
        assert!(matches!(
            &stmts[0].kind,
            StmtKind::Import { names, .. } if names.len() == 2 && names[1].is_type && !names[0].is_type
        ));
        assert!(matches!(&stmts[1].kind, StmtKind::Import { namespace: Some(ns), .. } if ns == "React"));
        assert!(matches!(&stmts[2].kind, StmtKind::Class { name, extends: Some(_) } if name == "Component"));
        assert!(matches!(&stmts[3].kind, StmtKind::TypeAlias { ty: TypeExpr::NumberLit(_), .. }));
        assert!(matches!(&stmts[4].kind, StmtKind::DeclareVar { .. }));
        assert!(matches!(&stmts[5].kind, StmtKind::Const { pattern: Pattern::Object(names), .. } if names.len() == 2));
        assert!(matches!(&stmts[6].kind, StmtKind::Const { annotation: Some(TypeExpr::Number), .. }));
        assert!(matches!(&stmts[7].kind, StmtKind::Assign { property, .. } if property == "value"));
        assert_eq!(fixture.call_site_count(), 5);
    }

    #[test]
    fn test_dangling_marker_is_an_error() {
        let err = fixture("// $ExpectError[extra-arg]\n\nact();").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("not attached"));
    }

    #[test]
    fn test_marker_above_suite_is_an_error() {
        let err = fixture("// $ExpectError[extra-arg]\ndescribe('x', () => {});").unwrap_err();
        assert!(err.message.contains("not attached"));
    }

    #[test]
    fn test_marker_in_nested_body_is_an_error() {
        let err = fixture("act(() => {\n  // $ExpectError[extra-arg]\n  f(1);\n});").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unknown_marker_kind_is_an_error() {
        let err = fixture("// $ExpectError[bogus]\nact();").unwrap_err();
        assert!(err.message.contains("unknown diagnostic kind"));
    }

    #[test]
    fn test_trailing_marker_is_an_error() {
        let err = fixture("cleanup(1); // $ExpectError[extra-arg]").unwrap_err();
        assert_eq!((err.line, err.column), (1, 13));
        assert!(err.message.contains("own line"));

        let ok = fixture("cleanup(); // an ordinary note\ncleanup();").unwrap();
        assert_eq!(ok.call_site_count(), 2);
        assert!(statements(&ok.items).iter().all(|s| s.marker.is_none()));
    }

    #[test]
    fn test_marker_with_intervening_comment() {
        let fixture = fixture("// $ExpectError[extra-arg]\n// explanation\ncleanup(1);").unwrap();
        let stmts = statements(&fixture.items);
        assert_eq!(stmts[0].marker.as_ref().map(|m| m.kind), Some(DiagnosticKind::ExtraArg));
    }
}
