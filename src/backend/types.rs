//! Type expressions for declared signatures and inferred fixture types
//!
//! `TypeExpr` is shared by the catalog (declared parameter and return types),
//! the fixture front end (annotations) and the evaluator (inferred types of
//! argument expressions). Names are kept unresolved (`Named`) until a
//! [`TypeEnv`](super::subtyping::TypeEnv) expands them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

/// Type expression
#[derive(Clone, PartialEq, Debug)]
pub enum TypeExpr {
    /// Compatible with everything in both directions
    Any,
    /// Top type: everything flows in, nothing is usable out
    Mixed,
    Void,
    Null,
    Number,
    /// Numeric literal type (`123456`)
    NumberLit(f64),
    String,
    /// String literal type (`'input'`)
    StringLit(String),
    Bool,

    /// `?T`: T, null or void
    Maybe(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    /// Overloaded callables and callables carrying properties are intersections
    Intersection(Vec<TypeExpr>),
    Array(Box<TypeExpr>),
    Function(Arc<Signature>),
    Object(ObjectType),

    /// Nominal type or alias reference, e.g. `Promise<T>`, `React.Element`
    Named(String, Vec<TypeExpr>),
    /// Type parameter bound by an enclosing generic signature or declaration
    Var(String),
    /// `Class<T>`: a class whose instances have type T
    Class(Box<TypeExpr>),
}

/// A function parameter
#[derive(Clone, PartialEq, Debug)]
pub struct Param {
    pub name: Option<String>,
    pub ty: TypeExpr,
    pub optional: bool,
}

/// A generic type parameter with an optional upper bound (`<T: HTMLElement>`)
#[derive(Clone, PartialEq, Debug)]
pub struct TypeParam {
    pub name: String,
    pub bound: Option<TypeExpr>,
}

/// A declared call shape: one member of an overload set
#[derive(Clone, PartialEq, Debug)]
pub struct Signature {
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    /// Element type of a trailing rest parameter (`...rest: T[]`)
    pub rest: Option<TypeExpr>,
    pub ret: TypeExpr,
}

impl Signature {
    pub fn new(params: Vec<Param>, ret: TypeExpr) -> Self {
        Signature {
            type_params: Vec::new(),
            params,
            rest: None,
            ret,
        }
    }

    /// Minimum number of arguments a call must supply
    ///
    /// Optional parameters only relax arity when they trail every required one.
    pub fn min_arity(&self) -> usize {
        self.params
            .iter()
            .rposition(|p| !p.optional)
            .map_or(0, |last_required| last_required + 1)
    }

    /// Maximum number of arguments accepted (`usize::MAX` with a rest parameter)
    pub fn max_arity(&self) -> usize {
        if self.rest.is_some() {
            usize::MAX
        } else {
            self.params.len()
        }
    }

    /// Declared type at an argument position, with its optionality
    pub fn param_at(&self, position: usize) -> Option<(&TypeExpr, bool)> {
        match self.params.get(position) {
            Some(p) => Some((&p.ty, p.optional)),
            None => self.rest.as_ref().map(|t| (t, true)),
        }
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }

    /// Replace free type variables throughout the signature
    ///
    /// The signature's own type parameters shadow entries of `map`.
    pub fn substitute(&self, map: &HashMap<String, TypeExpr>) -> Signature {
        if self.type_params.iter().any(|tp| map.contains_key(&tp.name)) {
            let mut inner = map.clone();
            for tp in &self.type_params {
                inner.remove(&tp.name);
            }
            return self.rewrite(&inner, self.type_params.clone());
        }
        self.rewrite(map, self.type_params.clone())
    }

    /// Bind the signature's own type parameters, yielding a monomorphic signature
    pub fn instantiate(&self, map: &HashMap<String, TypeExpr>) -> Signature {
        self.rewrite(map, Vec::new())
    }

    fn rewrite(&self, map: &HashMap<String, TypeExpr>, type_params: Vec<TypeParam>) -> Signature {
        Signature {
            type_params: type_params
                .into_iter()
                .map(|tp| TypeParam {
                    bound: tp.bound.map(|b| b.substitute(map)),
                    name: tp.name,
                })
                .collect(),
            params: self
                .params
                .iter()
                .map(|p| Param {
                    name: p.name.clone(),
                    ty: p.ty.substitute(map),
                    optional: p.optional,
                })
                .collect(),
            rest: self.rest.as_ref().map(|t| t.substitute(map)),
            ret: self.ret.substitute(map),
        }
    }
}

/// An object or interface member
#[derive(Clone, PartialEq, Debug)]
pub struct Property {
    pub name: String,
    pub ty: TypeExpr,
    pub optional: bool,
}

/// Structural object type
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ObjectType {
    pub props: Vec<Property>,
    /// Exact objects (`{| |}`) admit no properties beyond those listed
    pub exact: bool,
}

impl ObjectType {
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.props.iter().find(|p| p.name == name)
    }
}

/// A named type declaration held by the catalog or a fixture scope
#[derive(Clone, PartialEq, Debug)]
pub struct TypeDecl {
    pub name: String,
    pub params: Vec<String>,
    pub kind: TypeDeclKind,
}

#[derive(Clone, PartialEq, Debug)]
pub enum TypeDeclKind {
    /// Structural alias, expanded on use
    Alias(TypeExpr),
    /// Nominal type with supertypes and members
    Interface {
        extends: Vec<TypeExpr>,
        members: Vec<Property>,
    },
}

impl TypeDecl {
    pub fn alias(name: impl Into<String>, body: TypeExpr) -> Self {
        TypeDecl {
            name: name.into(),
            params: Vec::new(),
            kind: TypeDeclKind::Alias(body),
        }
    }

    pub fn interface(
        name: impl Into<String>,
        extends: Vec<TypeExpr>,
        members: Vec<Property>,
    ) -> Self {
        TypeDecl {
            name: name.into(),
            params: Vec::new(),
            kind: TypeDeclKind::Interface { extends, members },
        }
    }

    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Map the declaration's parameters to the supplied arguments
    ///
    /// Missing arguments default to `any`.
    pub fn bindings(&self, args: &[TypeExpr]) -> HashMap<String, TypeExpr> {
        self.params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), args.get(i).cloned().unwrap_or(TypeExpr::Any)))
            .collect()
    }
}

impl TypeExpr {
    /// Build a union, flattening nested unions and removing duplicates
    pub fn union(parts: Vec<TypeExpr>) -> TypeExpr {
        let mut flat: Vec<TypeExpr> = Vec::new();
        for part in parts {
            let members = match part {
                TypeExpr::Union(inner) => inner,
                other => vec![other],
            };
            for m in members {
                if !flat.contains(&m) {
                    flat.push(m);
                }
            }
        }
        match flat.len() {
            1 => flat.pop().unwrap_or(TypeExpr::Void),
            _ => TypeExpr::Union(flat),
        }
    }

    /// Build an intersection, flattening nested intersections
    pub fn intersection(parts: Vec<TypeExpr>) -> TypeExpr {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                TypeExpr::Intersection(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            1 => flat.pop().unwrap_or(TypeExpr::Mixed),
            _ => TypeExpr::Intersection(flat),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, TypeExpr::Number | TypeExpr::NumberLit(_))
    }

    pub fn is_stringy(&self) -> bool {
        matches!(self, TypeExpr::String | TypeExpr::StringLit(_))
    }

    /// Replace type variables according to `map`
    pub fn substitute(&self, map: &HashMap<String, TypeExpr>) -> TypeExpr {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            TypeExpr::Var(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeExpr::Maybe(inner) => TypeExpr::Maybe(Box::new(inner.substitute(map))),
            TypeExpr::Union(parts) => {
                TypeExpr::Union(parts.iter().map(|p| p.substitute(map)).collect())
            }
            TypeExpr::Intersection(parts) => {
                TypeExpr::Intersection(parts.iter().map(|p| p.substitute(map)).collect())
            }
            TypeExpr::Array(inner) => TypeExpr::Array(Box::new(inner.substitute(map))),
            TypeExpr::Class(inner) => TypeExpr::Class(Box::new(inner.substitute(map))),
            TypeExpr::Function(sig) => TypeExpr::Function(Arc::new(sig.substitute(map))),
            TypeExpr::Object(obj) => TypeExpr::Object(ObjectType {
                props: obj
                    .props
                    .iter()
                    .map(|p| Property {
                        name: p.name.clone(),
                        ty: p.ty.substitute(map),
                        optional: p.optional,
                    })
                    .collect(),
                exact: obj.exact,
            }),
            TypeExpr::Named(name, args) => TypeExpr::Named(
                name.clone(),
                args.iter().map(|a| a.substitute(map)).collect(),
            ),
            _ => self.clone(),
        }
    }

    /// Collect every named type this expression references
    pub fn named_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeExpr::Named(name, args) => {
                out.push(name);
                for a in args {
                    a.named_refs(out);
                }
            }
            TypeExpr::Maybe(inner) | TypeExpr::Array(inner) | TypeExpr::Class(inner) => {
                inner.named_refs(out)
            }
            TypeExpr::Union(parts) | TypeExpr::Intersection(parts) => {
                for p in parts {
                    p.named_refs(out);
                }
            }
            TypeExpr::Function(sig) => {
                for tp in &sig.type_params {
                    if let Some(bound) = &tp.bound {
                        bound.named_refs(out);
                    }
                }
                for p in &sig.params {
                    p.ty.named_refs(out);
                }
                if let Some(rest) = &sig.rest {
                    rest.named_refs(out);
                }
                sig.ret.named_refs(out);
            }
            TypeExpr::Object(obj) => {
                for p in &obj.props {
                    p.ty.named_refs(out);
                }
            }
            _ => {}
        }
    }
}

// ============================================================================
// Construction helpers
// ============================================================================

/// Required parameter
pub fn param(name: &str, ty: TypeExpr) -> Param {
    Param {
        name: Some(name.to_string()),
        ty,
        optional: false,
    }
}

/// Optional parameter
pub fn opt_param(name: &str, ty: TypeExpr) -> Param {
    Param {
        name: Some(name.to_string()),
        ty,
        optional: true,
    }
}

/// Function type from parameters and return type
pub fn arrow(params: Vec<Param>, ret: TypeExpr) -> TypeExpr {
    TypeExpr::Function(Arc::new(Signature::new(params, ret)))
}

pub fn named(name: &str) -> TypeExpr {
    TypeExpr::Named(name.to_string(), Vec::new())
}

pub fn generic(name: &str, args: Vec<TypeExpr>) -> TypeExpr {
    TypeExpr::Named(name.to_string(), args)
}

pub fn array(elem: TypeExpr) -> TypeExpr {
    TypeExpr::Array(Box::new(elem))
}

pub fn maybe(inner: TypeExpr) -> TypeExpr {
    TypeExpr::Maybe(Box::new(inner))
}

pub fn promise(inner: TypeExpr) -> TypeExpr {
    generic("Promise", vec![inner])
}

pub fn prop(name: &str, ty: TypeExpr) -> Property {
    Property {
        name: name.to_string(),
        ty,
        optional: false,
    }
}

pub fn opt_prop(name: &str, ty: TypeExpr) -> Property {
    Property {
        name: name.to_string(),
        ty,
        optional: true,
    }
}

pub fn exact_object(props: Vec<Property>) -> TypeExpr {
    TypeExpr::Object(ObjectType { props, exact: true })
}

pub fn object(props: Vec<Property>) -> TypeExpr {
    TypeExpr::Object(ObjectType { props, exact: false })
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Any => write!(f, "any"),
            TypeExpr::Mixed => write!(f, "mixed"),
            TypeExpr::Void => write!(f, "void"),
            TypeExpr::Null => write!(f, "null"),
            TypeExpr::Number => write!(f, "number"),
            TypeExpr::NumberLit(n) => write!(f, "{}", n),
            TypeExpr::String => write!(f, "string"),
            TypeExpr::StringLit(s) => write!(f, "'{}'", s),
            TypeExpr::Bool => write!(f, "boolean"),
            TypeExpr::Maybe(inner) => write!(f, "?{}", inner),
            TypeExpr::Union(parts) => write!(f, "{}", parts.iter().join(" | ")),
            TypeExpr::Intersection(parts) => write!(f, "{}", parts.iter().join(" & ")),
            TypeExpr::Array(inner) => write!(f, "Array<{}>", inner),
            TypeExpr::Function(sig) => write!(f, "{}", sig),
            TypeExpr::Object(obj) => write!(f, "{}", obj),
            TypeExpr::Named(name, args) if args.is_empty() => write!(f, "{}", name),
            TypeExpr::Named(name, args) => write!(f, "{}<{}>", name, args.iter().join(", ")),
            TypeExpr::Var(name) => write!(f, "{}", name),
            TypeExpr::Class(inner) => write!(f, "Class<{}>", inner),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_generic() {
            let params = self.type_params.iter().map(|tp| match &tp.bound {
                Some(bound) => format!("{}: {}", tp.name, bound),
                None => tp.name.clone(),
            });
            write!(f, "<{}>", params.format(", "))?;
        }
        let mut rendered: Vec<String> = self
            .params
            .iter()
            .map(|p| match &p.name {
                Some(name) => format!("{}{}: {}", name, if p.optional { "?" } else { "" }, p.ty),
                None => p.ty.to_string(),
            })
            .collect();
        if let Some(rest) = &self.rest {
            rendered.push(format!("...rest: Array<{}>", rest));
        }
        write!(f, "({}) => {}", rendered.join(", "), self.ret)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = self
            .props
            .iter()
            .map(|p| format!("{}{}: {}", p.name, if p.optional { "?" } else { "" }, p.ty))
            .join(", ");
        match (self.exact, props.is_empty()) {
            (true, true) => write!(f, "{{||}}"),
            (true, false) => write!(f, "{{| {} |}}", props),
            (false, true) => write!(f, "{{...}}"),
            (false, false) => write!(f, "{{ {}, ... }}", props),
        }
    }
}
