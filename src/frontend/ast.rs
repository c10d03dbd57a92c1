//! Abstract Syntax Tree definitions for koi

use crate::types::signature::{go_ident, loose_prototype, typed_prototype};
use crate::types::{FunctionSignature, Owner, Type};
use crate::utils::Span;

/// A complete program (compilation unit), or the merge of several
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub imports: Vec<Import>,
    pub globals: Vec<GlobalVar>,
    pub functions: Vec<FuncDecl>,
    pub types: Vec<TypeDecl>,
}

impl Program {
    /// Tag every declaration with the package it came from
    pub fn set_package(&mut self, package: &str) {
        for f in &mut self.functions {
            f.sig.package = Some(package.to_string());
        }
        for g in &mut self.globals {
            g.package = Some(package.to_string());
        }
        for t in &mut self.types {
            t.package = Some(package.to_string());
            for field in &mut t.fields {
                field.package = Some(package.to_string());
            }
        }
    }

    /// Append another program's declarations after this one's
    pub fn extend(&mut self, other: Program) {
        self.imports.extend(other.imports);
        self.globals.extend(other.globals);
        self.functions.extend(other.functions);
        self.types.extend(other.types);
    }
}

/// `import name`
#[derive(Debug, Clone)]
pub struct Import {
    pub name: String,
    pub span: Span,
}

/// Top-level `const`/`mut` declaration
#[derive(Debug, Clone)]
pub struct GlobalVar {
    pub name: String,
    pub mutable: bool,
    pub value: Expr,
    pub package: Option<String>,
    pub span: Span,
}

impl GlobalVar {
    /// Go identifier of the global
    pub fn go_name(&self) -> String {
        match &self.package {
            Some(pkg) => go_ident(&format!("{}_{}", pkg, self.name)),
            None => go_ident(&self.name),
        }
    }
}

/// Function or method definition (extern declarations have no body)
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub sig: FunctionSignature,
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl FuncDecl {
    /// The program entry point: free, argument-less `main` of the main file
    pub fn is_entry_point(&self) -> bool {
        self.sig.owner == Owner::Free
            && self.sig.name == "main"
            && self.sig.args.is_empty()
            && self.sig.package.is_none()
    }
}

/// `type name { fields }`
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub fields: Vec<FunctionSignature>,
    pub package: Option<String>,
    pub span: Span,
}

/// Statement
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `const name = expr` / `mut name = expr`
    Var {
        name: String,
        mutable: bool,
        value: Expr,
        span: Span,
    },
    /// `name = expr`
    Assign { name: String, value: Expr, span: Span },
    /// Expression statement
    Expr(Expr),
    /// `if c {} else if c {} else {}`
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_block: Option<Vec<Stmt>>,
        span: Span,
    },
    /// `for cond {}` or `for {}`
    While {
        cond: Option<Expr>,
        body: Vec<Stmt>,
        span: Span,
    },
    /// `for name in from..to {}`
    ForRange {
        var: String,
        from: Expr,
        to: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    Break(Span),
    Continue(Span),
    Return { value: Option<Expr>, span: Span },
}

/// Part of a string literal
#[derive(Debug, Clone)]
pub enum StringPart {
    Text(String),
    /// `${expr}`
    Interpolation(Expr),
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// `not`
    Not,
    /// `-`
    Neg,
}

/// Expression
#[derive(Debug, Clone)]
pub enum Expr {
    String { parts: Vec<StringPart>, span: Span },
    /// Numeric literal, kept as written
    Number { text: String, span: Span },
    Bool { value: bool, span: Span },
    Ident { name: String, span: Span },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
        span: Span,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },
    /// `expr is TypeName`
    Is {
        expr: Box<Expr>,
        ty: String,
        span: Span,
    },
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    Call(CallExpr),
    /// `new T{field: expr, ...}`
    New {
        ty: String,
        fields: Vec<(String, Expr)>,
        span: Span,
    },
    /// `[a, b]` or `[]T{a, b}`
    Array {
        elem_ty: Option<Type>,
        elements: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::String { span, .. } => *span,
            Expr::Number { span, .. } => *span,
            Expr::Bool { span, .. } => *span,
            Expr::Ident { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Is { span, .. } => *span,
            Expr::Index { span, .. } => *span,
            Expr::Call(call) => call.span,
            Expr::New { span, .. } => *span,
            Expr::Array { span, .. } => *span,
        }
    }
}

/// A call: `name(label: expr)`, `target.name`, `target.name(label: expr)`
#[derive(Debug, Clone)]
pub struct CallExpr {
    /// Receiver or package; `None` for free calls
    pub on: Option<Box<Expr>>,
    /// Selector
    pub name: String,
    pub args: Vec<CallArg>,
    pub span: Span,
}

/// One labeled call argument
#[derive(Debug, Clone)]
pub struct CallArg {
    /// `_` when written without a label
    pub label: String,
    pub value: Expr,
    /// Filled in once by the type environment builder
    pub ty: Option<Type>,
}

impl CallExpr {
    pub fn labels(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.label.as_str()).collect()
    }

    pub fn loose_prototype(&self, owner: &Owner) -> String {
        loose_prototype(owner, &self.name, self.labels())
    }

    pub fn typed_prototype(&self, owner: &Owner, arg_types: &[Type]) -> String {
        typed_prototype(
            owner,
            &self.name,
            self.args
                .iter()
                .zip(arg_types)
                .map(|(a, t)| (a.label.as_str(), t.to_string())),
        )
    }
}
