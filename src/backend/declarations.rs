//! Catalog declarations files
//!
//! External API surfaces are described in TOML; every type position is a
//! string in the fixture type language.
//!
//! ```toml
//! [[types]]
//! name = "HTMLElement"
//! extends = ["Element"]
//! members = { tagName = "string", "title?" = "string" }
//!
//! [[types]]
//! name = "Thenable"
//! alias = "{ then: (resolve: () => mixed, reject?: () => mixed) => mixed, ... }"
//!
//! [[types]]
//! name = "Promise"
//! params = ["T"]
//! members = { then = "<U>(onFulfill?: (value: T) => U) => Promise<U>" }
//!
//! [[functions]]
//! name = "act"
//! overloads = ["(callback: () => void | Thenable) => Thenable"]
//!
//! [[values]]
//! name = "screen"
//! type = "Screen"
//!
//! [[constructors]]
//! name = "MouseEvent"
//! overloads = ["(type: string, init?: { bubbles?: boolean, ... }) => MouseEvent"]
//! ```
//!
//! A member key ending in `?` declares an optional member.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::fixture::{parse_signature, parse_type_with_params};

use super::catalog::{Catalog, CatalogError};
use super::types::{Property, Signature, TypeDecl, TypeDeclKind, TypeExpr};

/// Contents of a declarations file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Declarations {
    #[serde(default)]
    pub types: Vec<TypeEntry>,
    #[serde(default)]
    pub functions: Vec<FunctionEntry>,
    #[serde(default)]
    pub values: Vec<ValueEntry>,
    #[serde(default)]
    pub constructors: Vec<FunctionEntry>,
}

/// A named type: either an alias or an interface with supertypes and members
#[derive(Debug, Clone, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub members: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionEntry {
    pub name: String,
    pub overloads: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValueEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Declarations {
    pub fn parse_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read and parse a declarations file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let entry = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| CatalogError::Declaration {
            entry: entry.clone(),
            reason: e.to_string(),
        })?;
        Self::parse_toml(&content).map_err(|e| CatalogError::Declaration {
            entry,
            reason: e.to_string(),
        })
    }

    /// Add every declaration to `catalog`, in file order
    pub fn apply(&self, catalog: &mut Catalog) -> Result<(), CatalogError> {
        for entry in &self.types {
            catalog.declare_type(entry.to_decl()?);
        }
        for entry in &self.functions {
            for overload in &entry.overloads {
                catalog.register(&entry.name, signature(&entry.name, overload)?)?;
            }
        }
        for entry in &self.constructors {
            for overload in &entry.overloads {
                catalog.declare_constructor(&entry.name, signature(&entry.name, overload)?)?;
            }
        }
        for entry in &self.values {
            catalog.declare_value(&entry.name, type_expr(&entry.name, &entry.ty, &[])?);
        }
        debug!(
            target: "sigconform::declarations",
            types = self.types.len(),
            functions = self.functions.len(),
            values = self.values.len(),
            constructors = self.constructors.len(),
            "declarations applied"
        );
        Ok(())
    }

    /// Build a catalog holding only these declarations
    pub fn into_catalog(self) -> Result<Catalog, CatalogError> {
        let mut catalog = Catalog::new();
        self.apply(&mut catalog)?;
        Ok(catalog)
    }
}

impl TypeEntry {
    fn to_decl(&self) -> Result<TypeDecl, CatalogError> {
        let kind = match &self.alias {
            Some(body) => {
                if !self.extends.is_empty() || !self.members.is_empty() {
                    return Err(CatalogError::Declaration {
                        entry: self.name.clone(),
                        reason: "an alias cannot also declare extends or members".to_string(),
                    });
                }
                TypeDeclKind::Alias(type_expr(&self.name, body, &self.params)?)
            }
            None => TypeDeclKind::Interface {
                extends: self
                    .extends
                    .iter()
                    .map(|parent| type_expr(&self.name, parent, &self.params))
                    .collect::<Result<_, _>>()?,
                members: self
                    .members
                    .iter()
                    .map(|(key, ty)| member(&self.name, key, ty, &self.params))
                    .collect::<Result<_, _>>()?,
            },
        };
        Ok(TypeDecl {
            name: self.name.clone(),
            params: self.params.clone(),
            kind,
        })
    }
}

/// Parse a type position of declaration `entry`
pub(crate) fn type_expr(entry: &str, src: &str, params: &[String]) -> Result<TypeExpr, CatalogError> {
    parse_type_with_params(src, params).map_err(|e| CatalogError::Declaration {
        entry: entry.to_string(),
        reason: format!("'{}': {}", src, e),
    })
}

/// Parse an overload of declaration `entry`
pub(crate) fn signature(entry: &str, src: &str) -> Result<Signature, CatalogError> {
    parse_signature(src).map_err(|e| CatalogError::Declaration {
        entry: entry.to_string(),
        reason: format!("'{}': {}", src, e),
    })
}

/// Parse a member; a key ending in `?` is optional
pub(crate) fn member(entry: &str, key: &str, src: &str, params: &[String]) -> Result<Property, CatalogError> {
    let (name, optional) = match key.strip_suffix('?') {
        Some(name) => (name, true),
        None => (key, false),
    };
    Ok(Property {
        name: name.to_string(),
        ty: type_expr(entry, src, params)?,
        optional,
    })
}
