//! Source-level type values (§3 Data Model / `type.h` in the donor implementation).
//!
//! `Type` is a small value type compared structurally, never by identity —
//! two `Type::Array` values are equal iff their element types are equal, two
//! `Type::Class` values are equal iff their names match.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeId {
    Int,
    Float,
    Bool,
    String,
    Array,
    Void,
    Class,
    Auto,
    /// `self` in a method signature; resolved to `Class` at decl time (§9).
    SelfTy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Type {
    pub id: TypeId,
    /// Only meaningful when `id == Class`.
    pub class_name: Option<String>,
    /// Only meaningful when `id == Array`; boxed element type. Never itself
    /// an `Array` — multi-dimensional arrays are rejected at the point of
    /// construction (see `Type::array`).
    pub subtype: Option<Box<Type>>,
}

impl Eq for Type {}

impl std::hash::Hash for Type {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.class_name.hash(state);
        self.subtype.as_deref().hash(state);
    }
}

impl Type {
    pub fn scalar(id: TypeId) -> Self {
        debug_assert!(!matches!(id, TypeId::Class | TypeId::Array));
        Type {
            id,
            class_name: None,
            subtype: None,
        }
    }

    pub fn int() -> Self {
        Self::scalar(TypeId::Int)
    }
    pub fn float() -> Self {
        Self::scalar(TypeId::Float)
    }
    pub fn bool() -> Self {
        Self::scalar(TypeId::Bool)
    }
    pub fn string() -> Self {
        Self::scalar(TypeId::String)
    }
    pub fn void() -> Self {
        Self::scalar(TypeId::Void)
    }
    pub fn auto() -> Self {
        Self::scalar(TypeId::Auto)
    }
    pub fn self_ty() -> Self {
        Self::scalar(TypeId::SelfTy)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Type {
            id: TypeId::Class,
            class_name: Some(name.into()),
            subtype: None,
        }
    }

    /// `array<T>`. Caller must ensure `element` is not itself `Array` —
    /// nested arrays are a `TypeError` at the construction site, not a
    /// representable `Type`.
    pub fn array(element: Type) -> Self {
        Type {
            id: TypeId::Array,
            class_name: None,
            subtype: Some(Box::new(element)),
        }
    }

    pub fn is(&self, id: TypeId) -> bool {
        self.id == id
    }

    pub fn is_one_of(&self, ids: &[TypeId]) -> bool {
        ids.contains(&self.id)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.id, TypeId::Int | TypeId::Float)
    }

    pub fn array_element(&self) -> Option<&Type> {
        self.subtype.as_deref()
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id {
            TypeId::Int => write!(f, "int"),
            TypeId::Float => write!(f, "float"),
            TypeId::Bool => write!(f, "bool"),
            TypeId::String => write!(f, "string"),
            TypeId::Void => write!(f, "void"),
            TypeId::Auto => write!(f, "auto"),
            TypeId::SelfTy => write!(f, "self"),
            TypeId::Class => write!(f, "{}", self.class_name.as_deref().unwrap_or("?")),
            TypeId::Array => write!(
                f,
                "[]{}",
                self.subtype.as_deref().map(ToString::to_string).unwrap_or_default()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessModifier {
    Public,
    Protected,
    Private,
}

/// Signature of a free function or a method (sans access/static-ness).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnType {
    pub args: Vec<Type>,
    pub return_type: Type,
}

impl FnType {
    pub fn new(args: Vec<Type>, return_type: Type) -> Self {
        FnType { args, return_type }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodType {
    pub fn_type: FnType,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropType {
    pub prop_type: Type,
    pub is_static: bool,
}
