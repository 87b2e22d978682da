//! Call-site evaluator
//!
//! Infers the type of a call site's statement against the catalog and the
//! site's scope snapshot. Expressions are evaluated inner-first, left to
//! right; the first rejection met is the site's verdict. Calls resolve their
//! callee's overload set in declaration order and the first overload that
//! accepts the arguments supplies the result type.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::fixture::ast::{ArrowBody, ArrowFn, Expr, Location, Pattern, StmtKind};
use crate::fixture::SUITE_CALLEES;

use super::call_site::CallSite;
use super::catalog::Catalog;
use super::diagnostics::{Diagnostic, RejectionCause};
use super::scope::{Binding, Deferred, Scope, ScopedEnv};
use super::subtyping::{MemberLookup, Subtyping, TypeEnv};
use super::types::{named, promise, ObjectType, Property, Signature, TypeExpr};

/// Outcome of evaluating one call site
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted { ty: TypeExpr },
    Rejected(Diagnostic),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accepted { ty } => write!(f, "accepted: {}", ty),
            Verdict::Rejected(diagnostic) => write!(f, "rejected {}", diagnostic),
        }
    }
}

/// Errors that abort the evaluation of a call site
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A referenced value is neither bound in scope nor declared by the catalog
    UnknownSymbol { name: String, location: Location },
    /// An annotation names a type nothing declares
    UnknownType { name: String, location: Location },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnknownSymbol { name, location } => {
                write!(f, "{}: Unknown symbol: {}", location, name)
            }
            EvalError::UnknownType { name, location } => {
                write!(f, "{}: Unknown type: {}", location, name)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Why inference stopped early
enum Halt {
    Rejected(Diagnostic),
    Fatal(EvalError),
}

impl From<RejectionCause> for Halt {
    fn from(cause: RejectionCause) -> Self {
        Halt::Rejected(cause.into())
    }
}

impl From<EvalError> for Halt {
    fn from(err: EvalError) -> Self {
        Halt::Fatal(err)
    }
}

type Check<T> = Result<T, Halt>;

/// Argument types of a single call
type ArgTypes = SmallVec<[TypeExpr; 4]>;

/// Evaluation context: the scope in effect and the location reported for
/// fatal errors
#[derive(Clone, Copy)]
struct Cx<'s> {
    scope: &'s Arc<Scope>,
    location: Location,
}

pub struct Evaluator<'c> {
    catalog: &'c Catalog,
}

impl<'c> Evaluator<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Evaluator { catalog }
    }

    /// Evaluate a call site into a verdict
    ///
    /// Only unknown symbols and types are errors; every type mismatch is a
    /// rejected verdict.
    pub fn evaluate(&self, site: &CallSite) -> Result<Verdict, EvalError> {
        let cx = Cx {
            scope: &site.scope,
            location: site.location,
        };
        let verdict = match self.check_statement(&site.statement, cx) {
            Ok(ty) => Verdict::Accepted { ty },
            Err(Halt::Rejected(diagnostic)) => Verdict::Rejected(diagnostic),
            Err(Halt::Fatal(err)) => {
                debug!(target: "sigconform::evaluator", location = %site.location, symbol = %site.symbol, %err, "fatal");
                return Err(err);
            }
        };
        trace!(
            target: "sigconform::evaluator",
            location = %site.location,
            symbol = %site.symbol,
            %verdict
        );
        Ok(verdict)
    }

    fn env<'a>(&'a self, cx: Cx<'a>) -> ScopedEnv<'a> {
        ScopedEnv {
            scope: cx.scope,
            catalog: self.catalog,
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn check_statement(&self, kind: &StmtKind, cx: Cx<'_>) -> Check<TypeExpr> {
        match kind {
            StmtKind::Import { names, .. } => {
                // Suite helpers are fixture syntax, never catalog symbols
                let imported = names
                    .iter()
                    .filter(|import| !SUITE_CALLEES.contains(&import.name.as_str()));
                for import in imported {
                    if import.is_type {
                        if !self.catalog.has_type(&import.name) {
                            return Err(EvalError::UnknownType {
                                name: import.name.clone(),
                                location: cx.location,
                            }
                            .into());
                        }
                    } else if !self.catalog.has_symbol(&import.name) {
                        return Err(EvalError::UnknownSymbol {
                            name: import.name.clone(),
                            location: cx.location,
                        }
                        .into());
                    }
                }
                Ok(TypeExpr::Void)
            }
            StmtKind::Const {
                pattern,
                annotation,
                init,
            } => {
                let found = self.infer(init, cx)?;
                let source = match annotation {
                    Some(expected) => {
                        self.check_known_types(expected, cx)?;
                        self.assign(expected, &found, cx)?;
                        expected.clone()
                    }
                    None => found,
                };
                if let Pattern::Object(names) = pattern {
                    for name in names {
                        self.member(&source, name, cx)?;
                    }
                }
                Ok(source)
            }
            StmtKind::Assign {
                object,
                property,
                value,
            } => {
                let receiver = self.infer(object, cx)?;
                let slot = self.member(&receiver, property, cx)?;
                let found = self.infer(value, cx)?;
                self.assign(&slot, &found, cx)?;
                Ok(found)
            }
            StmtKind::Return(Some(expr)) | StmtKind::Expr(expr) => self.infer(expr, cx),
            StmtKind::Return(None) => Ok(TypeExpr::Void),
            StmtKind::DeclareVar { ty, .. } => {
                self.check_known_types(ty, cx)?;
                Ok(TypeExpr::Void)
            }
            StmtKind::TypeAlias { .. } | StmtKind::Class { .. } => Ok(TypeExpr::Void),
        }
    }

    /// Check that a value of type `found` may be stored where `expected` is declared
    fn assign(&self, expected: &TypeExpr, found: &TypeExpr, cx: Cx<'_>) -> Check<()> {
        let env = self.env(cx);
        let sub = Subtyping::new(&env);
        if sub.is_subtype(found, expected) {
            return Ok(());
        }
        Err(RejectionCause::IncompatibleAssignment {
            expected: expected.clone(),
            found: found.clone(),
            in_type_arg: sub.shares_generic_head(found, expected),
        }
        .into())
    }

    /// Every named type in an annotation must resolve
    fn check_known_types(&self, ty: &TypeExpr, cx: Cx<'_>) -> Check<()> {
        let env = self.env(cx);
        let mut names = Vec::new();
        ty.named_refs(&mut names);
        match names.into_iter().find(|name| env.type_decl(name).is_none()) {
            Some(name) => Err(EvalError::UnknownType {
                name: name.to_string(),
                location: cx.location,
            }
            .into()),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn infer(&self, expr: &Expr, cx: Cx<'_>) -> Check<TypeExpr> {
        match expr {
            Expr::Number(n) => Ok(TypeExpr::NumberLit(*n)),
            Expr::Str(s) => Ok(TypeExpr::StringLit(s.clone())),
            Expr::Regex(_) => Ok(named("RegExp")),
            Expr::Bool(_) => Ok(TypeExpr::Bool),
            Expr::Null => Ok(TypeExpr::Null),
            Expr::Undefined => Ok(TypeExpr::Void),
            Expr::Ident(name) => self.lookup_value(name, cx),
            Expr::Member { object, property } => {
                let receiver = self.infer(object, cx)?;
                self.member(&receiver, property, cx)
            }
            Expr::Call {
                callee,
                type_args,
                args,
            } => self.infer_call(callee, type_args, args, cx),
            Expr::New { class, args } => {
                let overloads = self.catalog.constructor(class).map_err(|_| {
                    EvalError::UnknownSymbol {
                        name: class.clone(),
                        location: cx.location,
                    }
                })?;
                let arg_types = self.infer_args(args, cx)?;
                self.resolve(overloads, &[], &arg_types, cx)
            }
            Expr::Add(left, right) => {
                let left = self.infer(left, cx)?;
                let right = self.infer(right, cx)?;
                self.addition(left, right, cx)
            }
            Expr::Await(inner) => {
                let ty = self.infer(inner, cx)?;
                let env = self.env(cx);
                match Subtyping::new(&env).expand(&ty) {
                    TypeExpr::Named(name, mut args) if name == "Promise" && args.len() == 1 => {
                        Ok(args.remove(0))
                    }
                    _ => Ok(ty),
                }
            }
            Expr::Arrow(arrow) => self.infer_arrow(arrow, cx),
            Expr::Object(entries) => {
                let mut props = Vec::with_capacity(entries.len());
                for (name, value) in entries {
                    props.push(Property {
                        name: name.clone(),
                        ty: self.infer(value, cx)?,
                        optional: false,
                    });
                }
                Ok(TypeExpr::Object(ObjectType { props, exact: true }))
            }
            Expr::Jsx(name) => {
                let mut segments = name.split('.');
                let head = segments.next().unwrap_or_default();
                let mut ty = self.lookup_value(head, cx)?;
                for segment in segments {
                    ty = self.member(&ty, segment, cx)?;
                }
                let env = self.env(cx);
                match Subtyping::new(&env).expand(&ty) {
                    TypeExpr::Class(_) | TypeExpr::Function(_) | TypeExpr::Any => {
                        Ok(named("React.Element"))
                    }
                    _ => Err(RejectionCause::NotAComponent(ty).into()),
                }
            }
        }
    }

    fn infer_args(&self, args: &[Expr], cx: Cx<'_>) -> Check<ArgTypes> {
        args.iter().map(|arg| self.infer(arg, cx)).collect()
    }

    fn lookup_value(&self, name: &str, cx: Cx<'_>) -> Check<TypeExpr> {
        if let Some(binding) = cx.scope.value(name) {
            return self.binding_type(binding, cx);
        }
        self.catalog.value_type(name).ok_or_else(|| {
            EvalError::UnknownSymbol {
                name: name.to_string(),
                location: cx.location,
            }
            .into()
        })
    }

    /// Type of a scope binding; rejected initializers leave the name typed `any`
    fn binding_type(&self, binding: &Binding, cx: Cx<'_>) -> Check<TypeExpr> {
        match binding {
            Binding::Typed(ty) => Ok(ty.clone()),
            Binding::Inferred(deferred) => Ok(self.deferred_type(deferred)?),
            Binding::Property {
                source,
                property,
                scope,
            } => {
                let source_cx = Cx {
                    scope,
                    location: cx.location,
                };
                let source_ty = self.binding_type(source, source_cx)?;
                let env = self.env(source_cx);
                match Subtyping::new(&env).property(&source_ty, property) {
                    MemberLookup::Found(ty) => Ok(ty),
                    MemberLookup::Missing | MemberLookup::Nullable => Ok(TypeExpr::Any),
                }
            }
        }
    }

    fn deferred_type(&self, deferred: &Deferred) -> Result<TypeExpr, EvalError> {
        deferred.get_or_infer(|d| {
            let cx = Cx {
                scope: &d.scope,
                location: d.location,
            };
            match self.infer(&d.init, cx) {
                Ok(ty) => Ok(ty),
                Err(Halt::Rejected(_)) => Ok(TypeExpr::Any),
                Err(Halt::Fatal(err)) => Err(err),
            }
        })
    }

    fn member(&self, receiver: &TypeExpr, property: &str, cx: Cx<'_>) -> Check<TypeExpr> {
        let env = self.env(cx);
        match Subtyping::new(&env).property(receiver, property) {
            MemberLookup::Found(ty) => Ok(ty),
            MemberLookup::Missing => Err(RejectionCause::MissingProperty {
                property: property.to_string(),
                receiver: receiver.clone(),
            }
            .into()),
            MemberLookup::Nullable => Err(RejectionCause::NullableAccess {
                property: property.to_string(),
                receiver: receiver.clone(),
            }
            .into()),
        }
    }

    fn addition(&self, left: TypeExpr, right: TypeExpr, cx: Cx<'_>) -> Check<TypeExpr> {
        let env = self.env(cx);
        let sub = Subtyping::new(&env);
        let (l, r) = (sub.expand(&left), sub.expand(&right));
        if matches!(l, TypeExpr::Any) || matches!(r, TypeExpr::Any) {
            return Ok(TypeExpr::Any);
        }
        if l.is_numeric() && r.is_numeric() {
            return Ok(TypeExpr::Number);
        }
        let textual = |t: &TypeExpr| t.is_stringy() || t.is_numeric();
        if (l.is_stringy() && textual(&r)) || (r.is_stringy() && textual(&l)) {
            return Ok(TypeExpr::String);
        }
        Err(RejectionCause::NonNumericOperand { left, right }.into())
    }

    fn infer_arrow(&self, arrow: &ArrowFn, cx: Cx<'_>) -> Check<TypeExpr> {
        for p in &arrow.params {
            self.check_known_types(&p.ty, cx)?;
        }
        let mut scope = cx.scope.with_params(&arrow.params);

        let body_ty = match &arrow.body {
            ArrowBody::Expr(expr) => self.infer(expr, Cx { scope: &scope, location: cx.location })?,
            ArrowBody::Block(statements) => {
                let mut returned = None;
                for stmt in statements {
                    let inner = Cx {
                        scope: &scope,
                        location: cx.location,
                    };
                    let ty = self.check_statement(&stmt.kind, inner)?;
                    if returned.is_none() && matches!(stmt.kind, StmtKind::Return(_)) {
                        returned = Some(ty);
                    }
                    scope = scope.bind(&stmt.kind, stmt.location);
                }
                returned.unwrap_or(TypeExpr::Void)
            }
        };

        let ret = match &arrow.ret {
            Some(declared) => {
                self.check_known_types(declared, cx)?;
                self.assign(declared, &body_ty, cx)?;
                declared.clone()
            }
            None => body_ty,
        };
        let ret = if arrow.is_async && !self.is_promise(&ret, cx) {
            promise(ret)
        } else {
            ret
        };
        Ok(TypeExpr::Function(Arc::new(Signature::new(
            arrow.params.clone(),
            ret,
        ))))
    }

    fn is_promise(&self, ty: &TypeExpr, cx: Cx<'_>) -> bool {
        let env = self.env(cx);
        matches!(Subtyping::new(&env).expand(ty), TypeExpr::Named(name, _) if name == "Promise")
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn infer_call(
        &self,
        callee: &Expr,
        type_args: &[TypeExpr],
        args: &[Expr],
        cx: Cx<'_>,
    ) -> Check<TypeExpr> {
        // Unshadowed catalog functions resolve straight from their overload set
        if let Expr::Ident(name) = callee {
            if cx.scope.value(name).is_none() {
                if let Ok(overloads) = self.catalog.lookup(name) {
                    return self.call_overloads(overloads, type_args, args, cx);
                }
            }
        }

        let callee_ty = self.infer(callee, cx)?;
        let env = self.env(cx);
        let sub = Subtyping::new(&env);
        match callable(&sub, &callee_ty) {
            Some(overloads) if overloads.is_empty() => {
                Err(RejectionCause::NotCallable(callee_ty).into())
            }
            Some(overloads) => self.call_overloads(&overloads, type_args, args, cx),
            None => {
                self.infer_args(args, cx)?;
                Ok(TypeExpr::Any)
            }
        }
    }

    fn call_overloads(
        &self,
        overloads: &[Arc<Signature>],
        type_args: &[TypeExpr],
        args: &[Expr],
        cx: Cx<'_>,
    ) -> Check<TypeExpr> {
        let arg_types = self.infer_args(args, cx)?;
        for ty in type_args {
            self.check_known_types(ty, cx)?;
        }
        self.resolve(overloads, type_args, &arg_types, cx)
    }

    /// Try each overload in order; the first that accepts the arguments wins
    fn resolve(
        &self,
        overloads: &[Arc<Signature>],
        type_args: &[TypeExpr],
        args: &[TypeExpr],
        cx: Cx<'_>,
    ) -> Check<TypeExpr> {
        let env = self.env(cx);
        let sub = Subtyping::new(&env);

        let mut causes = Vec::with_capacity(overloads.len());
        for (index, sig) in overloads.iter().enumerate() {
            match try_overload(&sub, sig, type_args, args) {
                Ok(ret) => {
                    trace!(target: "sigconform::evaluator::resolve", index, %sig, "overload matched");
                    return Ok(ret);
                }
                Err(cause) => causes.push(cause),
            }
        }

        let cause = match causes.len() {
            1 => causes.remove(0),
            _ => RejectionCause::NoMatchingOverload(causes),
        };
        Err(cause.into())
    }
}

/// Overloads of a callable type; `None` for `any`, empty when not callable
fn callable<E: TypeEnv + ?Sized>(
    sub: &Subtyping<'_, E>,
    ty: &TypeExpr,
) -> Option<Vec<Arc<Signature>>> {
    match sub.expand(ty) {
        TypeExpr::Any => None,
        TypeExpr::Function(sig) => Some(vec![sig]),
        TypeExpr::Intersection(parts) => Some(
            parts
                .iter()
                .filter_map(|part| match sub.expand(part) {
                    TypeExpr::Function(sig) => Some(sig),
                    _ => None,
                })
                .collect(),
        ),
        _ => Some(Vec::new()),
    }
}

/// Check one overload against the argument types, returning its result type
fn try_overload<E: TypeEnv + ?Sized>(
    sub: &Subtyping<'_, E>,
    sig: &Signature,
    type_args: &[TypeExpr],
    args: &[TypeExpr],
) -> Result<TypeExpr, RejectionCause> {
    let supplied = args.len();
    let (min, max) = (sig.min_arity(), sig.max_arity());
    if supplied < min || supplied > max {
        return Err(RejectionCause::ArityMismatch {
            supplied,
            min,
            max: (max != usize::MAX).then_some(max),
        });
    }

    let sig: Cow<'_, Signature> = if sig.is_generic() || !type_args.is_empty() {
        Cow::Owned(bind_type_params(sub, sig, type_args, args)?)
    } else {
        Cow::Borrowed(sig)
    };

    for (position, found) in args.iter().enumerate() {
        let Some((declared, optional)) = sig.param_at(position) else {
            continue;
        };
        let accepts = sub.is_subtype(found, declared)
            || (optional && matches!(found, TypeExpr::Void));
        if !accepts {
            return Err(RejectionCause::IncompatibleArgument {
                position,
                expected: declared.clone(),
                found: found.clone(),
            });
        }
    }
    Ok(sig.ret.clone())
}

/// Bind a generic signature's type parameters from explicit type arguments,
/// or by inference from the arguments, and check their bounds
fn bind_type_params<E: TypeEnv + ?Sized>(
    sub: &Subtyping<'_, E>,
    sig: &Signature,
    type_args: &[TypeExpr],
    args: &[TypeExpr],
) -> Result<Signature, RejectionCause> {
    let vars: Vec<String> = sig.type_params.iter().map(|tp| tp.name.clone()).collect();
    let mut bindings: HashMap<String, TypeExpr> = HashMap::new();

    if !type_args.is_empty() {
        if type_args.len() != vars.len() {
            return Err(RejectionCause::TypeArgumentCount {
                supplied: type_args.len(),
                expected: vars.len(),
            });
        }
        bindings.extend(vars.iter().cloned().zip(type_args.iter().cloned()));
    } else {
        for (position, found) in args.iter().enumerate() {
            if let Some((declared, _)) = sig.param_at(position) {
                sub.infer_bindings(declared, found, &vars, &mut bindings);
            }
        }
    }
    for var in &vars {
        bindings.entry(var.clone()).or_insert(TypeExpr::Any);
    }

    for tp in &sig.type_params {
        let (Some(bound), Some(found)) = (&tp.bound, bindings.get(&tp.name)) else {
            continue;
        };
        let bound = bound.substitute(&bindings);
        if !sub.is_subtype(found, &bound) {
            return Err(RejectionCause::TypeArgumentBound {
                param: tp.name.clone(),
                bound,
                found: found.clone(),
            });
        }
    }
    Ok(sig.instantiate(&bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::diagnostics::DiagnosticKind;
    use crate::backend::types::*;
    use crate::fixture::parse_signature;
    use crate::fixture::{parse_fixture, MarkerSyntax, DEFAULT_PREFIX};

    /// Catalog for the `act` scenario plus a few helpers
    fn catalog() -> Catalog {
        let mut c = Catalog::new();
        c.declare_type(TypeDecl::alias(
            "Thenable",
            object(vec![prop(
                "then",
                arrow(
                    vec![
                        param("resolve", arrow(vec![], TypeExpr::Mixed)),
                        opt_param("reject", arrow(vec![], TypeExpr::Mixed)),
                    ],
                    TypeExpr::Mixed,
                ),
            )]),
        ));
        c.declare_type(TypeDecl::interface("Node", vec![], vec![prop("textContent", TypeExpr::String)]));
        c.declare_type(TypeDecl::interface("HTMLElement", vec![named("Node")], vec![]));
        c.declare_type(TypeDecl::interface("HTMLInputElement", vec![named("HTMLElement")], vec![prop("value", TypeExpr::String)]));
        c.declare_type(
            TypeDecl::interface("Promise", vec![], vec![]).with_params(&["T"]),
        );
        c.register("act", parse_signature("(callback: () => void | Thenable) => Thenable").unwrap()).unwrap();
        c.register("query", parse_signature("(text: string) => HTMLElement").unwrap()).unwrap();
        c.register("query", parse_signature("(text: string, options: { exact?: boolean }) => ?HTMLElement").unwrap()).unwrap();
        c.register("input", parse_signature("() => HTMLInputElement").unwrap()).unwrap();
        c.register("count", parse_signature("() => number").unwrap()).unwrap();
        c.register(
            "removed",
            parse_signature("<T: HTMLElement>(callback: () => T) => Promise<T>").unwrap(),
        )
        .unwrap();
        c.register("pair", parse_signature("<A, B>(a: A, b: B) => A").unwrap()).unwrap();
        c
    }

    /// Evaluate every statement of `src` in order, threading scope
    fn verdicts(src: &str) -> Vec<Result<Verdict, EvalError>> {
        let catalog = catalog();
        let evaluator = Evaluator::new(&catalog);
        let syntax = MarkerSyntax::new(&[DEFAULT_PREFIX]).unwrap();
        let fixture = parse_fixture(src, &syntax).unwrap();
        crate::backend::call_site::collect(&fixture)
            .iter()
            .map(|a| evaluator.evaluate(&a.site))
            .collect()
    }

    fn verdict(src: &str) -> Verdict {
        verdicts(src).pop().unwrap().unwrap()
    }

    fn kind(src: &str) -> Option<DiagnosticKind> {
        match verdict(src) {
            Verdict::Accepted { .. } => None,
            Verdict::Rejected(d) => Some(d.kind),
        }
    }

    #[test]
    fn test_act_end_to_end() {
        assert_eq!(kind("act(1);"), Some(DiagnosticKind::IncompatibleCall));
        assert_eq!(
            verdict("act(() => {});"),
            Verdict::Accepted {
                ty: named("Thenable")
            }
        );
        assert_eq!(kind("act(() => {}).then(1);"), Some(DiagnosticKind::IncompatibleCall));
        assert_eq!(kind("act(() => {}).then(() => {});"), None);
    }

    #[test]
    fn test_act_misuse() {
        assert_eq!(kind("act(() => {}, 1);"), Some(DiagnosticKind::ExtraArg));
        assert_eq!(kind("act(() => 1);"), Some(DiagnosticKind::IncompatibleCall));
        assert_eq!(kind("act();"), Some(DiagnosticKind::IncompatibleCall));
    }

    #[test]
    fn test_chained_misuse() {
        assert_eq!(kind("act(() => {}).doesNotExist();"), Some(DiagnosticKind::PropMissing));
        assert_eq!(kind("act(() => {}) + 1;"), Some(DiagnosticKind::UnsafeAddition));
        assert_eq!(kind("count() + 1;"), None);
        assert_eq!(kind("count() + 'px';"), None);
    }

    #[test]
    fn test_overload_order() {
        let Verdict::Accepted { ty } = verdict("query('a');") else {
            panic!("expected acceptance");
        };
        assert_eq!(ty, named("HTMLElement"));

        let Verdict::Accepted { ty } = verdict("query('a', { exact: true });") else {
            panic!("expected acceptance");
        };
        assert_eq!(ty, maybe(named("HTMLElement")));

        assert_eq!(kind("query('a', 1, 2);"), Some(DiagnosticKind::ExtraArg));
        assert_eq!(kind("query(1);"), Some(DiagnosticKind::IncompatibleCall));
    }

    #[test]
    fn test_nullable_member_access() {
        assert_eq!(
            kind("query('a', { exact: true }).textContent;"),
            Some(DiagnosticKind::IncompatibleUse)
        );
        assert_eq!(kind("query('a').textContent;"), None);
    }

    #[test]
    fn test_annotations() {
        assert_eq!(kind("const a: number = input();"), Some(DiagnosticKind::IncompatibleType));
        assert_eq!(kind("const a: HTMLElement = input();"), None);
        assert_eq!(
            kind("const a: Promise<number> = removed(() => input());"),
            Some(DiagnosticKind::IncompatibleTypeArg)
        );
    }

    #[test]
    fn test_mixed_flows_into_maybe_mixed() {
        let found = verdicts(
            "declare var m: mixed;\ndeclare var f: (x: ?mixed) => void;\nf(m);\nconst x: ?mixed = m;",
        );
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|v| matches!(v, Ok(v) if v.is_accepted())), "{:?}", found);
    }

    #[test]
    fn test_suite_helper_imports_need_no_catalog_entry() {
        assert_eq!(kind("import {describe, it, act} from 'flow-typed-test';"), None);
        assert!(matches!(
            verdicts("import {describe, expect} from 'flow-typed-test';").pop(),
            Some(Err(EvalError::UnknownSymbol { ref name, .. })) if name == "expect"
        ));
    }

    #[test]
    fn test_generic_inference_and_bounds() {
        let Verdict::Accepted { ty } = verdict("removed(() => input());") else {
            panic!("expected acceptance");
        };
        assert_eq!(ty, promise(named("HTMLInputElement")));
        assert_eq!(kind("removed(() => 1);"), Some(DiagnosticKind::IncompatibleCall));
        assert_eq!(kind("pair<number>(1, 2);"), Some(DiagnosticKind::IncompatibleCall));
        assert_eq!(kind("pair<string, number>(1, 2);"), Some(DiagnosticKind::IncompatibleCall));
        assert_eq!(kind("pair<number, number>(1, 2);"), None);
    }

    #[test]
    fn test_await_and_member_assignment() {
        let results = verdicts(
            "const el = await removed(() => input());\nel.value = 'x';\nel.value = 1;\nel.missing = 'x';",
        );
        let kinds: Vec<Option<DiagnosticKind>> = results
            .into_iter()
            .map(|r| match r.unwrap() {
                Verdict::Accepted { .. } => None,
                Verdict::Rejected(d) => Some(d.kind),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                None,
                None,
                Some(DiagnosticKind::IncompatibleType),
                Some(DiagnosticKind::PropMissing)
            ]
        );
    }

    #[test]
    fn test_unknown_symbol_is_fatal() {
        let result = verdicts("nope(1);").pop().unwrap();
        assert_eq!(
            result,
            Err(EvalError::UnknownSymbol {
                name: "nope".into(),
                location: Location::new(1, 1)
            })
        );
    }

    #[test]
    fn test_unknown_annotation_type_is_fatal() {
        let result = verdicts("const a: Nope = count();").pop().unwrap();
        assert!(matches!(result, Err(EvalError::UnknownType { name, .. }) if name == "Nope"));
    }

    #[test]
    fn test_not_callable_and_not_a_component() {
        assert_eq!(kind("declare var n: number;\nn();"), Some(DiagnosticKind::NotAFunction));
        assert_eq!(
            kind("declare var n: number;\nact(<n />);"),
            Some(DiagnosticKind::IncompatibleType)
        );
        assert_eq!(kind("class C extends HTMLElement {}\nact(() => <C />);"), Some(DiagnosticKind::IncompatibleCall));
    }

    #[test]
    fn test_local_aliases_and_destructuring() {
        let results = verdicts(
            "\
type Custom = 123456;
declare var v: Custom;
const obj = { get: (s: string) => v };
const { get } = obj;
const a: Custom = get('x');
const { nope } = obj;
",
        );
        let kinds: Vec<Option<DiagnosticKind>> = results
            .into_iter()
            .map(|r| match r.unwrap() {
                Verdict::Accepted { .. } => None,
                Verdict::Rejected(d) => Some(d.kind),
            })
            .collect();
        assert_eq!(kinds, vec![None, None, None, Some(DiagnosticKind::PropMissing)]);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let catalog = catalog();
        let evaluator = Evaluator::new(&catalog);
        let syntax = MarkerSyntax::new(&[DEFAULT_PREFIX]).unwrap();
        let fixture = parse_fixture("const x = input();\nx.value + 1;\nact(() => {}).then(1);", &syntax).unwrap();
        for assertion in crate::backend::call_site::collect(&fixture) {
            assert_eq!(evaluator.evaluate(&assertion.site), evaluator.evaluate(&assertion.site));
        }
    }

    #[test]
    fn test_async_arrow_returns_promise() {
        let Verdict::Accepted { ty } = verdict("async () => 1;") else {
            panic!("expected acceptance");
        };
        let TypeExpr::Function(sig) = ty else {
            panic!("expected function");
        };
        assert_eq!(sig.ret, promise(TypeExpr::NumberLit(1.0)));
    }
}
