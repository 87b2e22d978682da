//! Signature catalog
//!
//! Registry of the declared API surface a fixture is checked against:
//! - callable symbols, each with an ordered overload set
//! - constructors reachable through `new`
//! - plain values (objects, namespaces, callables carrying properties)
//! - named type declarations (aliases and nominal interfaces)
//!
//! The catalog is append-only while it is being built and is shared read-only
//! (behind an `Arc`) once evaluation starts.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use super::subtyping::TypeEnv;
use super::types::{Signature, TypeDecl, TypeDeclKind, TypeExpr};

/// Errors raised while building or querying the catalog
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// No function, value or constructor with this name was declared
    UnknownSymbol(String),
    /// A declaration references a type name that nothing declares
    UnresolvedType { name: String, referenced_by: String },
    /// A declared signature is malformed
    InvalidSignature { name: String, reason: String },
    /// A declaration file entry could not be read
    Declaration { entry: String, reason: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::UnknownSymbol(name) => write!(f, "Unknown symbol: {}", name),
            CatalogError::UnresolvedType {
                name,
                referenced_by,
            } => write!(f, "Unresolved type '{}' referenced by '{}'", name, referenced_by),
            CatalogError::InvalidSignature { name, reason } => {
                write!(f, "Invalid signature for '{}': {}", name, reason)
            }
            CatalogError::Declaration { entry, reason } => {
                write!(f, "Invalid declaration '{}': {}", entry, reason)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Declared API surface
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    functions: HashMap<String, Vec<Arc<Signature>>>,
    /// Function names in first-registration order
    order: Vec<String>,
    constructors: HashMap<String, Vec<Arc<Signature>>>,
    values: HashMap<String, TypeExpr>,
    types: HashMap<String, TypeDecl>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an accepted call shape for `name`
    ///
    /// Repeated registrations form an overload set tried in registration order.
    pub fn register(&mut self, name: &str, signature: Signature) -> Result<(), CatalogError> {
        check_signature(name, &signature)?;
        trace!(target: "sigconform::catalog::register", name, %signature);
        match self.functions.get_mut(name) {
            Some(overloads) => overloads.push(Arc::new(signature)),
            None => {
                self.order.push(name.to_string());
                self.functions.insert(name.to_string(), vec![Arc::new(signature)]);
            }
        }
        Ok(())
    }

    /// Add a constructor overload reachable through `new name(...)`
    pub fn declare_constructor(
        &mut self,
        name: &str,
        signature: Signature,
    ) -> Result<(), CatalogError> {
        check_signature(name, &signature)?;
        trace!(target: "sigconform::catalog::constructor", name, %signature);
        self.constructors
            .entry(name.to_string())
            .or_default()
            .push(Arc::new(signature));
        Ok(())
    }

    /// Declare a non-function value; a later declaration replaces an earlier one
    pub fn declare_value(&mut self, name: &str, ty: TypeExpr) {
        trace!(target: "sigconform::catalog::value", name, %ty);
        self.values.insert(name.to_string(), ty);
    }

    /// Declare a named type; a later declaration replaces an earlier one
    pub fn declare_type(&mut self, decl: TypeDecl) {
        trace!(target: "sigconform::catalog::type", name = %decl.name);
        self.types.insert(decl.name.clone(), decl);
    }

    /// Overload set for a callable symbol
    pub fn lookup(&self, name: &str) -> Result<&[Arc<Signature>], CatalogError> {
        self.functions
            .get(name)
            .map(|overloads| overloads.as_slice())
            .ok_or_else(|| CatalogError::UnknownSymbol(name.to_string()))
    }

    /// Overload set for `new name(...)`
    pub fn constructor(&self, name: &str) -> Result<&[Arc<Signature>], CatalogError> {
        self.constructors
            .get(name)
            .map(|overloads| overloads.as_slice())
            .ok_or_else(|| CatalogError::UnknownSymbol(name.to_string()))
    }

    /// Type of a symbol used as a value
    ///
    /// Functions become a function type, or an intersection of function types
    /// when overloaded. Declared values take precedence over functions.
    pub fn value_type(&self, name: &str) -> Option<TypeExpr> {
        if let Some(ty) = self.values.get(name) {
            return Some(ty.clone());
        }
        let overloads = self.functions.get(name)?;
        let parts = overloads
            .iter()
            .map(|sig| TypeExpr::Function(Arc::clone(sig)))
            .collect();
        Some(TypeExpr::intersection(parts))
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.functions.contains_key(name)
            || self.values.contains_key(name)
            || self.constructors.contains_key(name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Callable symbol names in registration order
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of callable symbols
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.values.is_empty()
            && self.constructors.is_empty()
            && self.types.is_empty()
    }

    /// Append every declaration of `other`, keeping overload order
    pub fn merge(&mut self, other: Catalog) {
        let Catalog {
            mut functions,
            order,
            constructors,
            values,
            types,
        } = other;
        for name in order {
            let Some(overloads) = functions.remove(&name) else {
                continue;
            };
            match self.functions.get_mut(&name) {
                Some(existing) => existing.extend(overloads),
                None => {
                    self.order.push(name.clone());
                    self.functions.insert(name, overloads);
                }
            }
        }
        for (name, overloads) in constructors {
            self.constructors.entry(name).or_default().extend(overloads);
        }
        self.values.extend(values);
        self.types.extend(types);
    }

    /// Check that every named type referenced by a declaration resolves
    pub fn validate(&self) -> Result<(), CatalogError> {
        fn collect(owner: &str, ty: &TypeExpr, out: &mut Vec<(String, String)>) {
            let mut names = Vec::new();
            ty.named_refs(&mut names);
            out.extend(names.into_iter().map(|n| (n.to_string(), owner.to_string())));
        }

        let mut refs: Vec<(String, String)> = Vec::new();
        for (name, overloads) in self.functions.iter().chain(self.constructors.iter()) {
            for sig in overloads {
                collect(name, &TypeExpr::Function(Arc::clone(sig)), &mut refs);
            }
        }
        for (name, ty) in &self.values {
            collect(name, ty, &mut refs);
        }
        for (name, decl) in &self.types {
            match &decl.kind {
                TypeDeclKind::Alias(body) => collect(name, body, &mut refs),
                TypeDeclKind::Interface { extends, members } => {
                    for parent in extends {
                        collect(name, parent, &mut refs);
                    }
                    for member in members {
                        collect(name, &member.ty, &mut refs);
                    }
                }
            }
        }
        refs.sort_unstable();

        if let Some((name, owner)) = refs
            .into_iter()
            .find(|(name, _)| !self.types.contains_key(name))
        {
            return Err(CatalogError::UnresolvedType {
                name,
                referenced_by: owner,
            });
        }
        debug!(
            target: "sigconform::catalog",
            functions = self.functions.len(),
            values = self.values.len(),
            types = self.types.len(),
            "catalog validated"
        );
        Ok(())
    }
}

impl TypeEnv for Catalog {
    fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }
}

fn check_signature(name: &str, signature: &Signature) -> Result<(), CatalogError> {
    let mut seen_optional = false;
    for p in &signature.params {
        if p.optional {
            seen_optional = true;
        } else if seen_optional {
            return Err(CatalogError::InvalidSignature {
                name: name.to_string(),
                reason: "required parameter follows an optional one".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::*;

    fn string_sig() -> Signature {
        Signature::new(vec![param("text", TypeExpr::String)], TypeExpr::Void)
    }

    #[test]
    fn test_lookup_unknown_symbol() {
        let catalog = Catalog::new();
        assert_eq!(
            catalog.lookup("act").unwrap_err(),
            CatalogError::UnknownSymbol("act".to_string())
        );
    }

    #[test]
    fn test_overloads_keep_registration_order() {
        let mut catalog = Catalog::new();
        catalog.register("query", string_sig()).unwrap();
        let mut second = string_sig();
        second.params.push(opt_param("options", object(vec![])));
        catalog.register("query", second).unwrap();

        let overloads = catalog.lookup("query").unwrap();
        assert_eq!(overloads.len(), 2);
        assert_eq!(overloads[0].max_arity(), 1);
        assert_eq!(overloads[1].max_arity(), 2);
    }

    #[test]
    fn test_value_type_for_overloaded_function_is_intersection() {
        let mut catalog = Catalog::new();
        catalog.register("f", string_sig()).unwrap();
        assert!(matches!(catalog.value_type("f"), Some(TypeExpr::Function(_))));

        catalog.register("f", Signature::new(vec![], TypeExpr::Void)).unwrap();
        assert!(matches!(catalog.value_type("f"), Some(TypeExpr::Intersection(parts)) if parts.len() == 2));
        assert_eq!(catalog.value_type("g"), None);
    }

    #[test]
    fn test_rejects_required_after_optional() {
        let mut catalog = Catalog::new();
        let sig = Signature::new(
            vec![opt_param("a", TypeExpr::Number), param("b", TypeExpr::Number)],
            TypeExpr::Void,
        );
        assert!(matches!(
            catalog.register("bad", sig),
            Err(CatalogError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_validate_reports_unresolved_types() {
        let mut catalog = Catalog::new();
        catalog
            .register("within", Signature::new(vec![param("el", named("HTMLElement"))], TypeExpr::Void))
            .unwrap();
        assert_eq!(
            catalog.validate(),
            Err(CatalogError::UnresolvedType {
                name: "HTMLElement".to_string(),
                referenced_by: "within".to_string()
            })
        );

        catalog.declare_type(TypeDecl::interface("HTMLElement", vec![], vec![]));
        assert_eq!(catalog.validate(), Ok(()));
    }

    #[test]
    fn test_merge_appends_overloads() {
        let mut base = Catalog::new();
        base.register("f", string_sig()).unwrap();
        let mut extra = Catalog::new();
        extra.register("f", Signature::new(vec![], TypeExpr::Void)).unwrap();
        extra.register("g", string_sig()).unwrap();
        extra.declare_value("screen", object(vec![]));

        base.merge(extra);
        assert_eq!(base.lookup("f").unwrap().len(), 2);
        assert_eq!(base.function_names().collect::<Vec<_>>(), vec!["f", "g"]);
        assert!(base.has_symbol("screen"));
    }
}
