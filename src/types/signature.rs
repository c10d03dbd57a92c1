//! Function signatures, prototype strings and name mangling.
//!
//! A signature is identified by its owner, its selector name and its ordered
//! argument labels. Two textual keys are derived from it:
//!
//! - the *loose* prototype, `circle.scale(by:)`, which only looks at labels;
//! - the *typed* prototype, `circle.scale(by:float)`, used to pick between
//!   overloads that share a loose prototype.
//!
//! The mangled identifier (`circle_scale_by_float`) is what the Go backend
//! emits, so distinct typed prototypes must never mangle to the same name.

use std::fmt;

use crate::types::type_system::Type;

/// Who a function belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// A free function
    Free,
    /// A method of a declared (or builtin) type
    Type(String),
    /// Call-site signatures whose receiver is only known at runtime
    Static,
}

impl Owner {
    /// Prefix used in prototype strings
    fn prototype_prefix(&self) -> String {
        match self {
            Owner::Free => String::new(),
            Owner::Type(name) => format!("{}.", name),
            Owner::Static => "static.".to_string(),
        }
    }

    pub fn type_name(&self) -> Option<&str> {
        match self {
            Owner::Type(name) => Some(name),
            _ => None,
        }
    }
}

/// One labeled argument of a signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuncArg {
    /// Label written at the call site (`by` in `scale(by: 2.0)`)
    pub label: String,
    /// Variable the value is bound to inside the body; defaults to the label
    pub name: Option<String>,
    /// Declared type; `None` accepts any argument
    pub ty: Option<Type>,
}

impl FuncArg {
    #[cfg(test)]
    pub fn new(label: &str, ty: Type) -> Self {
        Self {
            label: label.to_string(),
            name: None,
            ty: Some(ty),
        }
    }

    /// Name of the local variable bound to this argument
    pub fn binding(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.label)
    }

    fn type_key(&self) -> String {
        self.ty.as_ref().map(|t| t.to_string()).unwrap_or_else(|| "any".to_string())
    }

    fn type_mangle(&self) -> String {
        self.ty.as_ref().map(|t| t.mangle()).unwrap_or_else(|| "any".to_string())
    }
}

/// A declared function or method signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub owner: Owner,
    /// Selector: the label that carries no value
    pub name: String,
    pub args: Vec<FuncArg>,
    /// `None` when the function returns nothing meaningful
    pub ret: Option<Type>,
    /// koi package the declaration came from (`None` for the main file)
    pub package: Option<String>,
    /// Implemented by the runtime library rather than koi code
    pub is_extern: bool,
}

const GO_KEYWORDS: [&str; 25] = [
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for", "func", "go",
    "goto", "if", "import", "interface", "map", "package", "range", "return", "select", "struct", "switch", "type",
    "var",
];

/// Names the generated package claims for itself
const GO_RESERVED: [&str; 5] = ["args", "fmt", "init", "main", "math"];

/// Go identifier for a koi name. Keywords, reserved names and names in the
/// prelude's `Koi`/`koi` namespace get a trailing `_`.
pub fn go_ident(name: &str) -> String {
    if GO_KEYWORDS.contains(&name)
        || GO_RESERVED.contains(&name)
        || name.starts_with("Koi")
        || name.starts_with("koi")
    {
        format!("{}_", name)
    } else {
        name.to_string()
    }
}

/// Render a loose prototype from its parts
pub fn loose_prototype<'a>(owner: &Owner, name: &str, labels: impl IntoIterator<Item = &'a str>) -> String {
    let labels: String = labels.into_iter().map(|l| format!("{}:", l)).collect();
    format!("{}{}({})", owner.prototype_prefix(), name, labels)
}

/// Render a typed prototype from its parts
pub fn typed_prototype<'a>(
    owner: &Owner,
    name: &str,
    args: impl IntoIterator<Item = (&'a str, String)>,
) -> String {
    let args: Vec<String> = args.into_iter().map(|(l, t)| format!("{}:{}", l, t)).collect();
    format!("{}{}({})", owner.prototype_prefix(), name, args.join(" "))
}

/// Owner-less mangling shared by declarations and call sites
fn mangle_selector<'a>(name: &str, args: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let mut out = name.to_string();
    for (label, ty) in args {
        out.push('_');
        out.push_str(label);
        out.push('_');
        out.push_str(&ty);
    }
    out
}

impl FunctionSignature {
    pub fn new(owner: Owner, name: &str, args: Vec<FuncArg>, ret: Option<Type>) -> Self {
        Self {
            owner,
            name: name.to_string(),
            args,
            ret,
            package: None,
            is_extern: false,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.args.iter().map(|a| a.label.as_str())
    }

    pub fn typed_prototype(&self) -> String {
        typed_prototype(
            &self.owner,
            &self.name,
            self.args.iter().map(|a| (a.label.as_str(), a.type_key())),
        )
    }

    /// Same selector and label sequence
    pub fn matches_labels(&self, name: &str, labels: &[&str]) -> bool {
        self.name == name && self.args.len() == labels.len() && self.labels().zip(labels).all(|(a, b)| a == *b)
    }

    /// Whether every call-site argument type is accepted by the declared type
    pub fn accepts_types(&self, arg_types: &[Type]) -> bool {
        self.args.len() == arg_types.len()
            && self.args.iter().zip(arg_types).all(|(arg, actual)| match &arg.ty {
                Some(declared) => declared.accepts(actual),
                None => true,
            })
    }

    pub fn has_receiver(&self) -> bool {
        matches!(self.owner, Owner::Type(_))
    }

    /// Key used in runtime method tables: the mangling without owner
    pub fn selector(&self) -> String {
        mangle_selector(&self.name, self.args.iter().map(|a| (a.label.as_str(), a.type_mangle())))
    }

    /// Identifier emitted for this function. Externs name a prelude
    /// function; everything else is escaped with [`go_ident`].
    pub fn mangled(&self) -> String {
        let mut out = String::new();
        if let Some(pkg) = &self.package {
            out.push_str(pkg);
            out.push('_');
        }
        if let Owner::Type(owner) = &self.owner {
            out.push_str(owner);
            out.push('_');
        }
        out.push_str(&self.selector());
        if self.is_extern {
            format!("Koi_{}", out)
        } else {
            go_ident(&out)
        }
    }

    /// Typed prototype qualified with the declaring package
    pub fn qualified_prototype(&self) -> String {
        match &self.package {
            Some(pkg) => format!("{} in package {}", self.typed_prototype(), pkg),
            None => self.typed_prototype(),
        }
    }

    /// `func(label T, ...) R` rendering used when the signature is a type
    pub fn as_func_type(&self) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| format!("{} {}", a.label, a.type_key()))
            .collect();
        match &self.ret {
            Some(ret) => format!("func({}) {}", args.join(", "), ret),
            None => format!("func({})", args.join(", ")),
        }
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ret {
            Some(ret) => write!(f, "{} {}", self.typed_prototype(), ret),
            None => write!(f, "{}", self.typed_prototype()),
        }
    }
}
