//! Lexical scope snapshots for call-site evaluation.
//!
//! Provides scope management for:
//! - Bindings introduced by `const`, `declare var`, `class` and arrow parameters
//! - Fixture-local type aliases that layer over the catalog's declarations
//! - Independent per-call-site snapshots that share structure
//!
//! A scope is a persistent linked list: extending a scope allocates one node
//! pointing at its parent, so every call site can hold its own `Arc<Scope>`
//! without copying bindings or sharing mutable state.

use std::sync::{Arc, OnceLock};

use crate::fixture::ast::{Expr, Location, Pattern, StmtKind};

use super::catalog::Catalog;
use super::evaluator::EvalError;
use super::subtyping::TypeEnv;
use super::types::{ObjectType, Param, TypeDecl, TypeDeclKind, TypeExpr};

/// Initializer whose type is inferred on first use
#[derive(Debug)]
pub struct Deferred {
    pub init: Expr,
    /// Scope visible to the initializer
    pub scope: Arc<Scope>,
    /// Declaring statement, reported for fatal errors inside the initializer
    pub location: Location,
    cached: OnceLock<Result<TypeExpr, EvalError>>,
}

impl Deferred {
    pub fn new(init: Expr, scope: Arc<Scope>, location: Location) -> Self {
        Deferred {
            init,
            scope,
            location,
            cached: OnceLock::new(),
        }
    }

    /// Inferred type, computing it with `infer` the first time
    pub fn get_or_infer(
        &self,
        infer: impl FnOnce(&Self) -> Result<TypeExpr, EvalError>,
    ) -> Result<TypeExpr, EvalError> {
        self.cached.get_or_init(|| infer(self)).clone()
    }
}

#[derive(Debug)]
pub enum Binding {
    /// Declared or annotated type
    Typed(TypeExpr),
    Inferred(Deferred),
    /// One name of a destructuring pattern
    Property {
        source: Arc<Binding>,
        property: String,
        scope: Arc<Scope>,
    },
}

#[derive(Debug)]
enum Entry {
    Value(String, Arc<Binding>),
    Type(TypeDecl),
}

#[derive(Debug, Default)]
pub struct Scope {
    entry: Option<Entry>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// Empty scope; names fall through to the catalog
    pub fn root() -> Arc<Scope> {
        Arc::new(Scope::default())
    }

    fn extend(self: &Arc<Self>, entry: Entry) -> Arc<Scope> {
        Arc::new(Scope {
            entry: Some(entry),
            parent: Some(Arc::clone(self)),
        })
    }

    pub fn with_value(self: &Arc<Self>, name: &str, binding: Binding) -> Arc<Scope> {
        self.extend(Entry::Value(name.to_string(), Arc::new(binding)))
    }

    pub fn with_type(self: &Arc<Self>, decl: TypeDecl) -> Arc<Scope> {
        self.extend(Entry::Type(decl))
    }

    /// Bind arrow-function parameters
    pub fn with_params(self: &Arc<Self>, params: &[Param]) -> Arc<Scope> {
        params.iter().fold(Arc::clone(self), |scope, p| match &p.name {
            Some(name) => {
                let ty = if p.optional {
                    TypeExpr::union(vec![p.ty.clone(), TypeExpr::Void])
                } else {
                    p.ty.clone()
                };
                scope.with_value(name, Binding::Typed(ty))
            }
            None => scope,
        })
    }

    /// Scope visible to the statement following `kind`
    pub fn bind(self: &Arc<Self>, kind: &StmtKind, location: Location) -> Arc<Scope> {
        match kind {
            StmtKind::Const {
                pattern,
                annotation,
                init,
            } => {
                let source = match annotation {
                    Some(ty) => Binding::Typed(ty.clone()),
                    None => Binding::Inferred(Deferred::new(init.clone(), Arc::clone(self), location)),
                };
                match pattern {
                    Pattern::Ident(name) => self.with_value(name, source),
                    Pattern::Object(names) => {
                        let source = Arc::new(source);
                        names.iter().fold(Arc::clone(self), |scope, name| {
                            scope.with_value(
                                name,
                                Binding::Property {
                                    source: Arc::clone(&source),
                                    property: name.clone(),
                                    scope: Arc::clone(self),
                                },
                            )
                        })
                    }
                }
            }
            StmtKind::DeclareVar { name, ty } => self.with_value(name, Binding::Typed(ty.clone())),
            StmtKind::TypeAlias { name, params, ty } => self.with_type(TypeDecl {
                name: name.clone(),
                params: params.clone(),
                kind: TypeDeclKind::Alias(ty.clone()),
            }),
            StmtKind::Class { name, extends } => {
                let instance = extends
                    .clone()
                    .unwrap_or_else(|| TypeExpr::Object(ObjectType::default()));
                self.with_type(TypeDecl::interface(name.clone(), vec![instance.clone()], vec![]))
                    .with_value(name, Binding::Typed(TypeExpr::Class(Box::new(instance))))
            }
            StmtKind::Import { .. }
            | StmtKind::Assign { .. }
            | StmtKind::Return(_)
            | StmtKind::Expr(_) => Arc::clone(self),
        }
    }

    /// Innermost binding of `name`
    pub fn value(&self, name: &str) -> Option<&Arc<Binding>> {
        let mut current = self;
        loop {
            if let Some(Entry::Value(bound, binding)) = &current.entry {
                if bound == name {
                    return Some(binding);
                }
            }
            current = current.parent.as_deref()?;
        }
    }

    /// Innermost fixture-local type declaration of `name`
    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        let mut current = self;
        loop {
            if let Some(Entry::Type(decl)) = &current.entry {
                if decl.name == name {
                    return Some(decl);
                }
            }
            current = current.parent.as_deref()?;
        }
    }

    /// Number of entries visible from this scope
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some(parent) = current.parent.as_deref() {
            depth += 1;
            current = parent;
        }
        depth
    }
}

/// Type environment layering a scope's local types over the catalog
pub struct ScopedEnv<'a> {
    pub scope: &'a Scope,
    pub catalog: &'a Catalog,
}

impl TypeEnv for ScopedEnv<'_> {
    fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.scope
            .type_decl(name)
            .or_else(|| self.catalog.type_decl(name))
    }
}
