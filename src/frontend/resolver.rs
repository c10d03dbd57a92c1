//! Signature resolution
//!
//! Every declaration that can be called is collected into a
//! [`SignatureTable`]. A call is matched by its loose prototype (selector and
//! labels) within the first search tier that has any match; when several
//! declarations in that tier match loosely, the annotated argument types
//! pick the one whose typed prototype accepts them.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::frontend::ast::{CallExpr, Program};
use crate::stdlib::builtins::{BuiltinRegistry, RuntimeFunc};
use crate::types::{FunctionSignature, Owner, Type};
use crate::utils::{Error, Result};

/// What kind of declaration a signature came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// Listed in a `type` block
    Field,
    /// A `func` declaration (possibly `extern`)
    Function,
}

/// A callable declaration
#[derive(Debug, Clone)]
pub struct DeclaredSignature {
    pub sig: FunctionSignature,
    pub kind: DeclKind,
}

impl DeclaredSignature {
    pub fn is_field(&self) -> bool {
        self.kind == DeclKind::Field
    }
}

/// A package-level `const`/`mut`
#[derive(Debug, Clone)]
pub struct PackageGlobal {
    pub package: String,
    pub name: String,
    pub go_name: String,
}

/// What a call site is made on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// `name(...)`, looked up among the free functions of a package
    /// (`None` for the main file)
    Free(Option<String>),
    /// `recv.name(...)`; the owner type name when it is statically known
    Receiver(Option<String>),
    /// `pkg.name(...)` on an imported package
    Package(String),
}

impl CallTarget {
    fn owner(&self) -> Owner {
        match self {
            CallTarget::Receiver(Some(owner)) => Owner::Type(owner.clone()),
            CallTarget::Receiver(None) => Owner::Static,
            CallTarget::Free(_) | CallTarget::Package(_) => Owner::Free,
        }
    }
}

/// Result of resolving a call
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Declared(&'a DeclaredSignature),
    /// Zero-argument member of a koi package naming one of its globals
    Global(&'a PackageGlobal),
    Runtime(&'a RuntimeFunc),
}

impl<'a> Resolved<'a> {
    /// Return type of the resolved callee; `None` when it has none
    pub fn ret(&self) -> Option<&'a Type> {
        match self {
            Resolved::Declared(decl) => decl.sig.ret.as_ref(),
            Resolved::Global(_) | Resolved::Runtime(_) => None,
        }
    }
}

/// All callable declarations of a program, in declaration order
pub struct SignatureTable {
    entries: Vec<DeclaredSignature>,
    globals: Vec<PackageGlobal>,
    registry: BuiltinRegistry,
}

impl SignatureTable {
    /// Collect the declarations of `program`, rejecting duplicate prototypes
    pub fn new(program: &Program) -> Result<Self> {
        let mut entries = Vec::new();
        let mut seen_fields = HashSet::new();
        let mut seen_functions = HashSet::new();

        for ty in &program.types {
            for field in &ty.fields {
                if !seen_fields.insert(field.typed_prototype()) {
                    return Err(Error::DuplicatePrototype {
                        prototype: field.typed_prototype(),
                    });
                }
                entries.push(DeclaredSignature {
                    sig: field.clone(),
                    kind: DeclKind::Field,
                });
            }
        }

        // Go identifier -> declaration that claimed it
        let mut go_names: HashMap<String, String> = HashMap::new();
        let mut claim = |name: String, owner: String| match go_names.get(&name) {
            Some(first) => Err(Error::NameCollision {
                name,
                first: first.clone(),
                second: owner,
            }),
            None => {
                go_names.insert(name, owner);
                Ok(())
            }
        };

        for func in &program.functions {
            let key = (func.sig.package.clone(), func.sig.typed_prototype());
            if !seen_functions.insert(key) {
                return Err(Error::DuplicatePrototype {
                    prototype: func.sig.typed_prototype(),
                });
            }
            if !func.is_entry_point() {
                claim(func.sig.mangled(), func.sig.qualified_prototype())?;
            }
            entries.push(DeclaredSignature {
                sig: func.sig.clone(),
                kind: DeclKind::Function,
            });
        }

        for global in &program.globals {
            let owner = match &global.package {
                Some(pkg) => format!("global {}.{}", pkg, global.name),
                None => format!("global {}", global.name),
            };
            claim(global.go_name(), owner)?;
        }

        let globals = program
            .globals
            .iter()
            .filter_map(|g| {
                g.package.as_ref().map(|pkg| PackageGlobal {
                    package: pkg.clone(),
                    name: g.name.clone(),
                    go_name: g.go_name(),
                })
            })
            .collect();

        debug!("Signature table holds {} declarations", entries.len());
        Ok(Self {
            entries,
            globals,
            registry: BuiltinRegistry::new(),
        })
    }

    /// Resolve a call site. Argument types are read from the call's
    /// annotations; unannotated arguments count as `unknown`.
    pub fn resolve_call(&self, call: &CallExpr, target: &CallTarget) -> Result<Resolved<'_>> {
        let labels = call.labels();
        let arg_types: Vec<Type> = call
            .args
            .iter()
            .map(|a| a.ty.clone().unwrap_or_else(Type::unknown))
            .collect();

        if let CallTarget::Package(pkg) = target {
            return self.resolve_package_call(pkg, call, &labels, &arg_types);
        }

        for tier in self.tiers(target) {
            let matches: Vec<&DeclaredSignature> = tier
                .into_iter()
                .filter(|d| d.sig.matches_labels(&call.name, &labels))
                .collect();
            if !matches.is_empty() {
                return Self::pick(call, &target.owner(), matches, &arg_types).map(Resolved::Declared);
            }
        }

        Err(Error::UnresolvedCall {
            prototype: call.loose_prototype(&target.owner()),
        })
    }

    /// Candidate lists in search order
    fn tiers(&self, target: &CallTarget) -> Vec<Vec<&DeclaredSignature>> {
        let mut tiers = Vec::new();
        match target {
            CallTarget::Receiver(Some(owner)) => {
                let owned = |kind: DeclKind| {
                    self.entries
                        .iter()
                        .filter(move |d| d.kind == kind && d.sig.owner.type_name() == Some(owner.as_str()))
                };
                tiers.push(owned(DeclKind::Field).chain(owned(DeclKind::Function)).collect());
            }
            CallTarget::Receiver(None) => {
                let fields = self.entries.iter().filter(|d| d.is_field());
                let methods = self
                    .entries
                    .iter()
                    .filter(|d| d.kind == DeclKind::Function && d.sig.has_receiver());
                tiers.push(fields.chain(methods).collect());
            }
            CallTarget::Free(_) | CallTarget::Package(_) => {}
        }

        let package = match target {
            CallTarget::Free(package) => package.clone(),
            _ => None,
        };
        tiers.push(
            self.entries
                .iter()
                .filter(|d| d.kind == DeclKind::Function && d.sig.owner == Owner::Free && d.sig.package == package)
                .collect(),
        );
        tiers
    }

    /// Choose among the loose matches of one tier. Entries sharing a runtime
    /// selector (a field and the method implementing it, or the same method
    /// on several owners) count once, first in declaration order.
    fn pick<'a>(
        call: &CallExpr,
        owner: &Owner,
        matches: Vec<&'a DeclaredSignature>,
        arg_types: &[Type],
    ) -> Result<&'a DeclaredSignature> {
        let mut selectors = HashSet::new();
        let distinct: Vec<&DeclaredSignature> = matches
            .into_iter()
            .filter(|d| selectors.insert(d.sig.selector()))
            .collect();

        if let [only] = distinct.as_slice() {
            return Ok(*only);
        }

        let accepted: Vec<&DeclaredSignature> = distinct
            .into_iter()
            .filter(|d| d.sig.accepts_types(arg_types))
            .collect();

        match accepted.as_slice() {
            [only] => Ok(*only),
            [] => Err(Error::UnresolvedCall {
                prototype: call.typed_prototype(owner, arg_types),
            }),
            many => Err(Error::AmbiguousOverload {
                prototype: call.typed_prototype(owner, arg_types),
                candidates: many.iter().map(|d| d.sig.typed_prototype()).collect(),
            }),
        }
    }

    fn resolve_package_call(
        &self,
        pkg: &str,
        call: &CallExpr,
        labels: &[&str],
        arg_types: &[Type],
    ) -> Result<Resolved<'_>> {
        let unresolved = || Error::UnresolvedCall {
            prototype: format!("{}.{}", pkg, call.loose_prototype(&Owner::Free)),
        };

        if self.registry.is_runtime_package(pkg) {
            return match self.registry.get(pkg, &call.name) {
                Some(func) if func.arity == call.args.len() => {
                    debug!("{}.{} is served by the runtime", func.package, func.member);
                    Ok(Resolved::Runtime(func))
                }
                _ => Err(unresolved()),
            };
        }

        let matches: Vec<&DeclaredSignature> = self
            .entries
            .iter()
            .filter(|d| {
                d.kind == DeclKind::Function
                    && d.sig.owner == Owner::Free
                    && d.sig.package.as_deref() == Some(pkg)
                    && d.sig.matches_labels(&call.name, labels)
            })
            .collect();
        if !matches.is_empty() {
            return Self::pick(call, &Owner::Free, matches, arg_types).map(Resolved::Declared);
        }

        if call.args.is_empty() {
            if let Some(global) = self.globals.iter().find(|g| g.package == pkg && g.name == call.name) {
                return Ok(Resolved::Global(global));
            }
        }

        Err(unresolved())
    }

    /// The function implementing `sig` for its owner, if one is declared
    pub fn implementation(&self, sig: &FunctionSignature) -> Option<&DeclaredSignature> {
        self.entries.iter().find(|d| {
            d.kind == DeclKind::Function
                && d.sig.owner == sig.owner
                && d.sig.selector() == sig.selector()
        })
    }

    /// Functions owned by a type, in declaration order
    pub fn methods_of<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a DeclaredSignature> + 'a {
        self.entries
            .iter()
            .filter(move |d| d.kind == DeclKind::Function && d.sig.owner.type_name() == Some(owner))
    }

    /// Declared field of a type by name, with no arguments
    pub fn property(&self, owner: &str, name: &str) -> Option<&DeclaredSignature> {
        self.entries.iter().find(|d| {
            d.is_field() && d.sig.owner.type_name() == Some(owner) && d.sig.name == name && d.sig.args.is_empty()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{CallArg, Expr};
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;
    use crate::utils::Span;

    fn table(source: &str) -> Result<SignatureTable> {
        let program = Parser::new(Lexer::new(source, 1)).parse_program()?;
        SignatureTable::new(&program)
    }

    fn call(name: &str, args: &[(&str, Option<Type>)]) -> CallExpr {
        CallExpr {
            on: None,
            name: name.to_string(),
            args: args
                .iter()
                .map(|(label, ty)| CallArg {
                    label: label.to_string(),
                    value: Expr::Number { text: "1".into(), span: Span::dummy() },
                    ty: ty.clone(),
                })
                .collect(),
            span: Span::dummy(),
        }
    }

    fn mangled(resolved: Resolved<'_>) -> String {
        match resolved {
            Resolved::Declared(decl) => decl.sig.mangled(),
            other => panic!("expected a declaration, got {:?}", other),
        }
    }

    const OVERLOADS: &str = "func foo(x int) {\n}\nfunc foo(x string) {\n}\n";

    #[test]
    fn test_overloads_pick_by_type() {
        let table = table(OVERLOADS).unwrap();
        let free = CallTarget::Free(None);

        let resolved = table.resolve_call(&call("foo", &[("x", Some(Type::string()))]), &free).unwrap();
        assert_eq!(mangled(resolved), "foo_x_string");

        let resolved = table.resolve_call(&call("foo", &[("x", Some(Type::int()))]), &free).unwrap();
        assert_eq!(mangled(resolved), "foo_x_int");
    }

    #[test]
    fn test_overloads_without_types() {
        let table = table(OVERLOADS).unwrap();
        let err = table
            .resolve_call(&call("foo", &[("x", None)]), &CallTarget::Free(None))
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedCall { prototype } if prototype == "foo(x:unknown)"));
    }

    #[test]
    fn test_ambiguous_overload() {
        let table = table("func foo(x any) {\n}\nfunc foo(x (int | string)) {\n}\n").unwrap();
        let err = table
            .resolve_call(&call("foo", &[("x", Some(Type::int()))]), &CallTarget::Free(None))
            .unwrap_err();
        match err {
            Error::AmbiguousOverload { prototype, candidates } => {
                assert_eq!(prototype, "foo(x:int)");
                assert_eq!(candidates, vec!["foo(x:any)", "foo(x:(int | string))"]);
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_single_loose_match_ignores_types() {
        let table = table("func foo(x int) {\n}\n").unwrap();
        let resolved = table
            .resolve_call(&call("foo", &[("x", Some(Type::string()))]), &CallTarget::Free(None))
            .unwrap();
        assert_eq!(mangled(resolved), "foo_x_int");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let table = table(OVERLOADS).unwrap();
        let c = call("foo", &[("x", Some(Type::string()))]);
        let first = mangled(table.resolve_call(&c, &CallTarget::Free(None)).unwrap());
        for _ in 0..10 {
            assert_eq!(mangled(table.resolve_call(&c, &CallTarget::Free(None)).unwrap()), first);
        }
    }

    #[test]
    fn test_duplicate_prototype() {
        let err = table("func foo(x int) {\n}\nfunc foo(x int) int {\n return x\n}\n")
            .err()
            .unwrap();
        assert!(matches!(err, Error::DuplicatePrototype { prototype } if prototype == "foo(x:int)"));

        // Argument names do not make declarations distinct
        let err = table("func foo(x a int) {\n}\nfunc foo(x b int) {\n}\n").err().unwrap();
        assert!(matches!(err, Error::DuplicatePrototype { .. }));
    }

    #[test]
    fn test_generated_names_must_be_distinct() {
        let collision = |source: &str| match table(source) {
            Err(Error::NameCollision { name, .. }) => name,
            other => panic!("expected a name collision, got {:?}", other.err()),
        };
        assert_eq!(collision("func foo(x int) {\n}\nfunc foo_x_int() {\n}\n"), "foo_x_int");
        assert_eq!(collision("func a.b_c() {\n}\nfunc a_b.c() {\n}\n"), "a_b_c");
        assert_eq!(collision("const helper = 1\nfunc helper() {\n}\n"), "helper");

        // A package function against a main-file method of a type named like the package
        let mut program = Parser::new(Lexer::new("func area() {\n}\n", 2)).parse_program().unwrap();
        program.set_package("geometry");
        program.extend(Parser::new(Lexer::new("func geometry.area() {\n}\n", 1)).parse_program().unwrap());
        match SignatureTable::new(&program) {
            Err(Error::NameCollision { name, first, second }) => {
                assert_eq!(name, "geometry_area");
                assert_eq!(first, "area() in package geometry");
                assert_eq!(second, "geometry.area()");
            }
            other => panic!("expected a name collision, got {:?}", other.err()),
        }

        assert!(table("func go() {\n}\nfunc init() {\n}\nfunc main() {\n go()\n}\n").is_ok());
    }

    #[test]
    fn test_static_owner_tier() {
        let source = "type circle {\n radius float\n area() float\n}\nfunc circle.area() float {\n return 1.0\n}\nfunc area() int {\n return 1\n}\n";
        let table = table(source).unwrap();

        let target = CallTarget::Receiver(Some("circle".into()));
        match table.resolve_call(&call("area", &[]), &target).unwrap() {
            Resolved::Declared(decl) => {
                assert!(decl.is_field());
                assert_eq!(decl.sig.ret, Some(Type::float()));
                let implementation = table.implementation(&decl.sig).unwrap();
                assert_eq!(implementation.sig.mangled(), "circle_area");
            }
            other => panic!("unexpected {:?}", other),
        }

        match table.resolve_call(&call("radius", &[]), &target).unwrap() {
            Resolved::Declared(decl) => assert!(table.implementation(&decl.sig).is_none()),
            other => panic!("unexpected {:?}", other),
        }

        // Free calls never see methods
        let free = table.resolve_call(&call("area", &[]), &CallTarget::Free(None)).unwrap();
        assert_eq!(mangled(free), "area");
    }

    #[test]
    fn test_unknown_receiver_searches_every_type() {
        let source = "type circle {\n area() float\n}\ntype square {\n area() float\n}\n";
        let table = table(source).unwrap();
        let resolved = table.resolve_call(&call("area", &[]), &CallTarget::Receiver(None)).unwrap();
        match resolved {
            Resolved::Declared(decl) => assert_eq!(decl.sig.owner, Owner::Type("circle".into())),
            other => panic!("unexpected {:?}", other),
        }

        let err = table.resolve_call(&call("perimeter", &[]), &CallTarget::Receiver(None)).unwrap_err();
        assert!(matches!(err, Error::UnresolvedCall { prototype } if prototype == "static.perimeter()"));
    }

    #[test]
    fn test_package_calls() {
        let mut program = Parser::new(Lexer::new("const unit = 1\nfunc area(r float) float {\n return r\n}\n", 1))
            .parse_program()
            .unwrap();
        program.set_package("geometry");
        let table = SignatureTable::new(&program).unwrap();
        let geometry = CallTarget::Package("geometry".into());

        let resolved = table.resolve_call(&call("area", &[("r", Some(Type::float()))]), &geometry).unwrap();
        assert_eq!(mangled(resolved), "geometry_area_r_float");

        match table.resolve_call(&call("unit", &[]), &geometry).unwrap() {
            Resolved::Global(global) => assert_eq!(global.go_name, "geometry_unit"),
            other => panic!("unexpected {:?}", other),
        }

        // Package functions are not visible as free functions of the main file
        assert!(table.resolve_call(&call("area", &[("r", None)]), &CallTarget::Free(None)).is_err());
    }

    #[test]
    fn test_runtime_package_calls() {
        let table = table("").unwrap();
        let io = CallTarget::Package("io".into());

        match table.resolve_call(&call("printLine", &[("_", None)]), &io).unwrap() {
            Resolved::Runtime(func) => assert_eq!(func.go_name, "Koi_io_printLine"),
            other => panic!("unexpected {:?}", other),
        }

        let err = table.resolve_call(&call("shout", &[("_", None)]), &io).unwrap_err();
        assert!(matches!(err, Error::UnresolvedCall { prototype } if prototype == "io.shout(_:)"));
    }
}
