//! Type compatibility
//!
//! Decides whether a value of one type may flow where another is expected,
//! resolves members on types, and infers type arguments for generic calls.
//! Named types are looked up through a [`TypeEnv`], which lets a fixture's
//! local aliases layer over the catalog's declarations.

use std::collections::HashMap;

use tracing::trace;

use super::types::{ObjectType, Signature, TypeDecl, TypeDeclKind, TypeExpr};

/// Recursion limit for alias expansion and structural checks
///
/// Cyclic aliases fail closed once it is reached.
pub const MAX_DEPTH: usize = 64;

/// Source of named type declarations
pub trait TypeEnv {
    fn type_decl(&self, name: &str) -> Option<&TypeDecl>;
}

/// Result of looking up a member on a type
#[derive(Debug, Clone, PartialEq)]
pub enum MemberLookup {
    Found(TypeExpr),
    Missing,
    /// The receiver may be null or void
    Nullable,
}

/// Compatibility checks against a type environment
pub struct Subtyping<'e, E: TypeEnv + ?Sized> {
    env: &'e E,
}

impl<'e, E: TypeEnv + ?Sized> Subtyping<'e, E> {
    pub fn new(env: &'e E) -> Self {
        Subtyping { env }
    }

    /// Check that `sub` may be used where `sup` is expected
    pub fn is_subtype(&self, sub: &TypeExpr, sup: &TypeExpr) -> bool {
        let result = self.check(sub, sup, 0);
        trace!(target: "sigconform::subtyping", %sub, %sup, result);
        result
    }

    /// Expand alias references at the head of `ty`
    pub fn expand(&self, ty: &TypeExpr) -> TypeExpr {
        let mut current = ty.clone();
        for _ in 0..MAX_DEPTH {
            let expansion = match &current {
                TypeExpr::Named(name, args) => {
                    self.env.type_decl(name).and_then(|decl| match &decl.kind {
                        TypeDeclKind::Alias(body) => Some(body.substitute(&decl.bindings(args))),
                        TypeDeclKind::Interface { .. } => None,
                    })
                }
                _ => None,
            };
            match expansion {
                Some(next) => current = next,
                None => return current,
            }
        }
        current
    }

    /// True when both types apply the same generic head (`Promise<A>` vs `Promise<B>`)
    pub fn shares_generic_head(&self, a: &TypeExpr, b: &TypeExpr) -> bool {
        match (self.expand(a), self.expand(b)) {
            (TypeExpr::Named(n, a_args), TypeExpr::Named(m, _)) => n == m && !a_args.is_empty(),
            (TypeExpr::Array(_), TypeExpr::Array(_)) => true,
            _ => false,
        }
    }

    fn check(&self, sub: &TypeExpr, sup: &TypeExpr, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        if sub == sup {
            return true;
        }
        let sub = self.expand(sub);
        let sup = self.expand(sup);
        if sub == sup {
            return true;
        }
        let next = depth + 1;

        use TypeExpr::*;
        match (&sub, &sup) {
            (Any, _) => true,
            _ if is_top(&sup) => true,
            (Mixed, _) => false,

            (Union(parts), _) => parts.iter().all(|p| self.check(p, &sup, next)),
            (Maybe(inner), _) => {
                self.check(&Null, &sup, next)
                    && self.check(&Void, &sup, next)
                    && self.check(inner, &sup, next)
            }
            (_, Intersection(parts)) => parts.iter().all(|p| self.check(&sub, p, next)),
            (_, Union(parts)) => parts.iter().any(|p| self.check(&sub, p, next)),
            (_, Maybe(inner)) => matches!(sub, Null | Void) || self.check(&sub, inner, next),

            (Intersection(parts), Object(target)) => {
                parts.iter().any(|p| self.check(p, &sup, next))
                    || (!target.exact && self.members_match(&sub, target, next))
            }
            (Intersection(parts), _) => parts.iter().any(|p| self.check(p, &sup, next)),

            (NumberLit(_), Number) | (StringLit(_), String) => true,
            (Array(a), Array(b)) | (Class(a), Class(b)) => self.check(a, b, next),
            (Function(f), Function(g)) => self.function_subtype(f, g, next),
            (Object(o), Object(p)) => self.object_subtype(o, p, next),
            (Named(..), Object(target)) => !target.exact && self.members_match(&sub, target, next),
            (Named(n, a), Named(m, _)) => self.nominal_subtype(n, a, &sup, m, next),
            _ => false,
        }
    }

    fn nominal_subtype(
        &self,
        name: &str,
        args: &[TypeExpr],
        sup: &TypeExpr,
        sup_name: &str,
        depth: usize,
    ) -> bool {
        if name == sup_name {
            // Type arguments are treated covariantly
            let TypeExpr::Named(_, sup_args) = sup else {
                return false;
            };
            return args
                .iter()
                .zip(sup_args.iter())
                .all(|(a, b)| self.check(a, b, depth));
        }
        match self.env.type_decl(name) {
            Some(decl) => match &decl.kind {
                TypeDeclKind::Interface { extends, .. } => {
                    let bindings = decl.bindings(args);
                    extends
                        .iter()
                        .any(|parent| self.check(&parent.substitute(&bindings), sup, depth))
                }
                TypeDeclKind::Alias(_) => false,
            },
            None => false,
        }
    }

    fn function_subtype(&self, f: &Signature, g: &Signature, depth: usize) -> bool {
        let f = erase_type_params(f);
        let g = erase_type_params(g);

        for (i, gp) in g.params.iter().enumerate() {
            let Some((f_ty, f_optional)) = f.param_at(i) else {
                continue;
            };
            // Parameters are contravariant; an optional slot may receive void
            let supplied = with_void(&gp.ty, gp.optional);
            let accepted = with_void(f_ty, f_optional);
            if !self.check(&supplied, &accepted, depth) {
                return false;
            }
        }

        match &g.rest {
            Some(g_rest) => {
                let supplied = with_void(g_rest, true);
                for fp in f.params.iter().skip(g.params.len()) {
                    if !self.check(&supplied, &with_void(&fp.ty, fp.optional), depth) {
                        return false;
                    }
                }
            }
            None => {
                if f.min_arity() > g.params.len() {
                    return false;
                }
            }
        }

        self.check(&f.ret, &g.ret, depth)
    }

    fn object_subtype(&self, o: &ObjectType, p: &ObjectType, depth: usize) -> bool {
        if p.exact && !o.exact {
            return false;
        }
        for target in &p.props {
            match o.get(&target.name) {
                Some(source) => {
                    if source.optional && !target.optional {
                        return false;
                    }
                    let compatible = self.check(&source.ty, &target.ty, depth)
                        || (target.optional && source.ty == TypeExpr::Void);
                    if !compatible {
                        return false;
                    }
                }
                None if target.optional => {}
                None => return false,
            }
        }
        !p.exact || o.props.iter().all(|source| p.get(&source.name).is_some())
    }

    /// Structural check of a nominal or intersection type against an object type
    fn members_match(&self, sub: &TypeExpr, target: &ObjectType, depth: usize) -> bool {
        target
            .props
            .iter()
            .all(|prop| match self.lookup(sub, &prop.name, depth) {
                MemberLookup::Found(ty) => self.check(&ty, &prop.ty, depth),
                MemberLookup::Missing => prop.optional,
                MemberLookup::Nullable => false,
            })
    }

    /// Resolve the type of member `name` on `ty`
    pub fn property(&self, ty: &TypeExpr, name: &str) -> MemberLookup {
        self.lookup(ty, name, 0)
    }

    fn lookup(&self, ty: &TypeExpr, name: &str, depth: usize) -> MemberLookup {
        if depth > MAX_DEPTH {
            return MemberLookup::Missing;
        }
        let ty = self.expand(ty);
        match &ty {
            TypeExpr::Any => MemberLookup::Found(TypeExpr::Any),
            TypeExpr::Object(obj) => match obj.get(name) {
                Some(p) => MemberLookup::Found(p.ty.clone()),
                None => MemberLookup::Missing,
            },
            TypeExpr::Named(type_name, args) => {
                let Some(decl) = self.env.type_decl(type_name) else {
                    return MemberLookup::Missing;
                };
                let TypeDeclKind::Interface { extends, members } = &decl.kind else {
                    return MemberLookup::Missing;
                };
                let bindings = decl.bindings(args);
                if let Some(member) = members.iter().find(|m| m.name == name) {
                    return MemberLookup::Found(member.ty.substitute(&bindings));
                }
                extends
                    .iter()
                    .map(|parent| self.lookup(&parent.substitute(&bindings), name, depth + 1))
                    .find(|found| matches!(found, MemberLookup::Found(_)))
                    .unwrap_or(MemberLookup::Missing)
            }
            TypeExpr::Intersection(parts) => parts
                .iter()
                .map(|p| self.lookup(p, name, depth + 1))
                .find(|found| matches!(found, MemberLookup::Found(_)))
                .unwrap_or(MemberLookup::Missing),
            TypeExpr::Maybe(_) | TypeExpr::Null | TypeExpr::Void => MemberLookup::Nullable,
            TypeExpr::Union(parts) => {
                if parts.iter().any(|p| matches!(p, TypeExpr::Null | TypeExpr::Void)) {
                    return MemberLookup::Nullable;
                }
                let mut found = Vec::with_capacity(parts.len());
                for part in parts {
                    match self.lookup(part, name, depth + 1) {
                        MemberLookup::Found(t) => found.push(t),
                        other => return other,
                    }
                }
                MemberLookup::Found(TypeExpr::union(found))
            }
            _ => MemberLookup::Missing,
        }
    }

    /// Infer bindings for `vars` by matching a declared type against an actual one
    ///
    /// The first binding found for a variable wins.
    pub fn infer_bindings(
        &self,
        declared: &TypeExpr,
        actual: &TypeExpr,
        vars: &[String],
        map: &mut HashMap<String, TypeExpr>,
    ) {
        self.infer_at(declared, actual, vars, map, 0);
    }

    fn infer_at(
        &self,
        declared: &TypeExpr,
        actual: &TypeExpr,
        vars: &[String],
        map: &mut HashMap<String, TypeExpr>,
        depth: usize,
    ) {
        if depth > MAX_DEPTH {
            return;
        }
        let next = depth + 1;
        use TypeExpr::*;
        match (declared, actual) {
            (Var(v), _) if vars.contains(v) => {
                map.entry(v.clone()).or_insert_with(|| actual.clone());
            }
            (Maybe(d), a) => self.infer_at(d, a, vars, map, next),
            (Union(parts), a) => {
                // Structured alternatives bind before bare variables
                let (bare, structured): (Vec<_>, Vec<_>) =
                    parts.iter().partition(|p| matches!(p, Var(_)));
                for part in structured.into_iter().chain(bare) {
                    self.infer_at(part, a, vars, map, next);
                }
            }
            (Array(d), Array(a)) | (Class(d), Class(a)) => self.infer_at(d, a, vars, map, next),
            (Named(n, ds), Named(m, as_)) if n == m => {
                for (d, a) in ds.iter().zip(as_.iter()) {
                    self.infer_at(d, a, vars, map, next);
                }
            }
            (Named(..), _) => {
                let expanded = self.expand(declared);
                if &expanded != declared {
                    self.infer_at(&expanded, actual, vars, map, next);
                }
            }
            (Function(df), Function(af)) => {
                for (dp, ap) in df.params.iter().zip(af.params.iter()) {
                    self.infer_at(&dp.ty, &ap.ty, vars, map, next);
                }
                self.infer_at(&df.ret, &af.ret, vars, map, next);
            }
            (Object(d), Object(a)) => {
                for dp in &d.props {
                    if let Some(ap) = a.get(&dp.name) {
                        self.infer_at(&dp.ty, &ap.ty, vars, map, next);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Replace a generic signature's own type parameters with `any`
fn erase_type_params(sig: &Signature) -> Signature {
    if !sig.is_generic() {
        return sig.clone();
    }
    let map = sig
        .type_params
        .iter()
        .map(|tp| (tp.name.clone(), TypeExpr::Any))
        .collect();
    sig.instantiate(&map)
}

fn with_void(ty: &TypeExpr, optional: bool) -> TypeExpr {
    if optional {
        TypeExpr::union(vec![ty.clone(), TypeExpr::Void])
    } else {
        ty.clone()
    }
}

/// Type environment backed by a plain map, used by tests and small tools
impl TypeEnv for HashMap<String, TypeDecl> {
    fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.get(name)
    }
}

/// `any`, `mixed`, or a maybe or union that admits one of them
fn is_top(ty: &TypeExpr) -> bool {
    match ty {
        TypeExpr::Any | TypeExpr::Mixed => true,
        TypeExpr::Maybe(inner) => is_top(inner),
        TypeExpr::Union(parts) => parts.iter().any(is_top),
        _ => false,
    }
}
