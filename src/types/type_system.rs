//! Type System for koi
//!
//! A koi `Type` is an ordered union of single types. Most values carry a
//! single alternative; declared argument types may list several, as in
//! `(int | string)`.

use std::fmt;

use crate::types::signature::FunctionSignature;

/// One alternative of a union type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SingleType {
    /// Primitive (`int`, `float`, `string`, `bool`) or declared type name
    Named(String),
    /// `[]T`
    Array(Box<SingleType>),
    /// `map[K]V`
    Map(Box<SingleType>, Box<SingleType>),
    /// `func(label T, ...) R`
    Func(Box<FunctionSignature>),
    /// An imported package name used as a value
    Namespace(String),
    /// Generic numeric marker for results the compiler does not track
    Number,
    /// Placeholder for an identifier whose type could not be determined
    Unknown,
}

impl SingleType {
    pub fn named(name: &str) -> Self {
        Self::Named(name.to_string())
    }

    /// Name used to look up fields and methods of values of this type.
    /// Primitives and arrays map onto the builtin library owners.
    pub fn owner_name(&self) -> Option<String> {
        match self {
            Self::Named(n) => Some(match n.as_str() {
                "string" => "String".to_string(),
                "int" => "Int".to_string(),
                "float" => "Float".to_string(),
                "bool" => "Bool".to_string(),
                other => other.to_string(),
            }),
            Self::Array(_) => Some("Array".to_string()),
            Self::Map(..) => Some("Map".to_string()),
            Self::Func(_) | Self::Namespace(_) | Self::Number | Self::Unknown => None,
        }
    }

    /// Identifier-safe rendering used by name mangling
    pub fn mangle(&self) -> String {
        match self {
            Self::Named(n) => n.clone(),
            Self::Array(elem) => format!("arr_{}", elem.mangle()),
            Self::Map(k, v) => format!("map_{}_{}", k.mangle(), v.mangle()),
            Self::Func(_) => "func".to_string(),
            Self::Namespace(n) => n.clone(),
            Self::Number => "number".to_string(),
            Self::Unknown => "unknown".to_string(),
        }
    }
}

impl fmt::Display for SingleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(n) => write!(f, "{}", n),
            Self::Array(elem) => write!(f, "[]{}", elem),
            Self::Map(k, v) => write!(f, "map[{}]{}", k, v),
            Self::Func(sig) => write!(f, "{}", sig.as_func_type()),
            Self::Namespace(n) => write!(f, "namespace({})", n),
            Self::Number => write!(f, "number"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A union of one or more single types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type(Vec<SingleType>);

impl Type {
    /// Build a union. Returns `None` for an empty alternative list.
    pub fn union(alternatives: Vec<SingleType>) -> Option<Self> {
        if alternatives.is_empty() {
            None
        } else {
            Some(Self(alternatives))
        }
    }

    pub fn single(ty: SingleType) -> Self {
        Self(vec![ty])
    }

    pub fn named(name: &str) -> Self {
        Self::single(SingleType::named(name))
    }

    pub fn int() -> Self {
        Self::named("int")
    }

    pub fn float() -> Self {
        Self::named("float")
    }

    pub fn string() -> Self {
        Self::named("string")
    }

    pub fn bool() -> Self {
        Self::named("bool")
    }

    pub fn number() -> Self {
        Self::single(SingleType::Number)
    }

    pub fn unknown() -> Self {
        Self::single(SingleType::Unknown)
    }

    pub fn namespace(name: &str) -> Self {
        Self::single(SingleType::Namespace(name.to_string()))
    }

    pub fn array_of(elem: SingleType) -> Self {
        Self::single(SingleType::Array(Box::new(elem)))
    }

    /// The only alternative, if this is not a union
    pub fn as_single(&self) -> Option<&SingleType> {
        match self.0.as_slice() {
            [one] => Some(one),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.as_single(), Some(SingleType::Array(_)))
    }

    /// Element type of a single-alternative array
    pub fn element(&self) -> Option<Type> {
        match self.as_single() {
            Some(SingleType::Array(elem)) => Some(Type::single((**elem).clone())),
            _ => None,
        }
    }

    /// Package name when this is a namespace type
    pub fn namespace_name(&self) -> Option<&str> {
        match self.as_single() {
            Some(SingleType::Namespace(n)) => Some(n),
            _ => None,
        }
    }

    /// Owner name for method lookup; unions and markers have none
    pub fn owner_name(&self) -> Option<String> {
        self.as_single().and_then(SingleType::owner_name)
    }

    /// Whether a value of type `actual` may be passed where `self` is declared.
    /// Every alternative of `actual` must appear in `self`; `any` accepts all
    /// and the numeric marker is accepted by `int` and `float`.
    pub fn accepts(&self, actual: &Type) -> bool {
        if self.0.iter().any(|t| matches!(t, SingleType::Named(n) if n == "any")) {
            return true;
        }
        actual.0.iter().all(|a| match a {
            SingleType::Number => self
                .0
                .iter()
                .any(|t| matches!(t, SingleType::Named(n) if n == "int" || n == "float")),
            SingleType::Unknown => false,
            other => self.0.contains(other),
        })
    }

    pub fn mangle(&self) -> String {
        self.0.iter().map(SingleType::mangle).collect::<Vec<_>>().join("_or_")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(one) = self.as_single() {
            return write!(f, "{}", one);
        }
        let parts: Vec<String> = self.0.iter().map(|t| t.to_string()).collect();
        write!(f, "({})", parts.join(" | "))
    }
}
