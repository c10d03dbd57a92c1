//! Semantic Analysis for koi
//!
//! Builds the variable type environment of every function and fixes the
//! type of every call argument in place. Call resolution needs argument
//! types, so arguments are annotated innermost first, and an argument that
//! already carries a type is never retyped.

use std::collections::HashMap;

use log::{debug, warn};

use crate::frontend::ast::*;
use crate::frontend::resolver::{CallTarget, Resolved, SignatureTable};
use crate::types::{FunctionSignature, SingleType, Type};
use crate::utils::Result;

// ==================== Type Environment ====================

/// Variable name to type, for one function (or for the globals)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeEnv {
    vars: HashMap<String, Type>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: &str, ty: Type) {
        self.vars.insert(name.to_string(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }
}

/// Environments of a whole program, parallel to `Program::functions`
#[derive(Debug, Clone, Default)]
pub struct ProgramEnv {
    /// Every global, keyed by its Go name (`pkg_name` for package globals)
    pub globals: TypeEnv,
    /// Namespaces and the globals visible by bare name, per package
    /// (`None` for the main file)
    pub packages: HashMap<Option<String>, TypeEnv>,
    pub functions: Vec<TypeEnv>,
}

impl ProgramEnv {
    /// Scope that a package's global initializers were typed in
    pub fn package(&self, package: &Option<String>) -> Option<&TypeEnv> {
        self.packages.get(package)
    }
}

/// Where the code being typed lives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionContext {
    /// koi package of the enclosing declaration
    pub package: Option<String>,
    /// Owner type of the enclosing method
    pub owner: Option<String>,
}

impl FunctionContext {
    pub fn of(sig: &FunctionSignature) -> Self {
        Self {
            package: sig.package.clone(),
            owner: sig.owner.type_name().map(str::to_string),
        }
    }
}

// ==================== Expression Typing ====================

/// Read-only view used to type expressions and classify calls
pub struct Typer<'a> {
    pub table: &'a SignatureTable,
    pub env: &'a TypeEnv,
    pub globals: &'a TypeEnv,
    pub ctx: &'a FunctionContext,
}

impl<'a> Typer<'a> {
    /// How a call site is looked up
    pub fn target(&self, call: &CallExpr) -> Result<CallTarget> {
        let Some(on) = call.on.as_deref() else {
            return Ok(CallTarget::Free(self.ctx.package.clone()));
        };
        let ty = self.type_of(on)?;
        if let Some(pkg) = ty.namespace_name() {
            return Ok(CallTarget::Package(pkg.to_string()));
        }
        Ok(CallTarget::Receiver(ty.owner_name()))
    }

    pub fn resolve(&self, call: &CallExpr) -> Result<(CallTarget, Resolved<'a>)> {
        let target = self.target(call)?;
        let resolved = self.table.resolve_call(call, &target)?;
        Ok((target, resolved))
    }

    pub fn type_of(&self, expr: &Expr) -> Result<Type> {
        Ok(match expr {
            Expr::String { .. } => Type::string(),
            Expr::Bool { .. } => Type::bool(),
            Expr::Number { text, .. } => {
                if text.contains(['.', 'e', 'E']) {
                    Type::float()
                } else {
                    Type::int()
                }
            }
            Expr::Ident { name, .. } => self.ident_type(name),
            Expr::Unary { op: UnOp::Not, .. } => Type::bool(),
            Expr::Unary { op: UnOp::Neg, expr, .. } => self.type_of(expr)?,
            Expr::Binary { left, .. } => self.type_of(left)?,
            Expr::Is { .. } => Type::bool(),
            Expr::Index { expr, .. } => self.type_of(expr)?.element().unwrap_or_else(Type::unknown),
            Expr::Call(call) => {
                let (_, resolved) = self.resolve(call)?;
                match resolved {
                    Resolved::Global(global) => {
                        self.globals.get(&global.go_name).cloned().unwrap_or_else(Type::unknown)
                    }
                    other => other.ret().cloned().unwrap_or_else(Type::number),
                }
            }
            Expr::New { ty, .. } => Type::named(ty),
            Expr::Array { elem_ty, elements, .. } => {
                if let Some(elem) = elem_ty.as_ref().and_then(Type::as_single) {
                    Type::array_of(elem.clone())
                } else if let Some(first) = elements.first() {
                    match self.type_of(first)?.as_single() {
                        Some(elem) => Type::array_of(elem.clone()),
                        None => Type::unknown(),
                    }
                } else {
                    Type::array_of(SingleType::named("int"))
                }
            }
        })
    }

    fn ident_type(&self, name: &str) -> Type {
        if let Some(ty) = self.env.get(name) {
            return ty.clone();
        }
        if let Some(owner) = &self.ctx.owner {
            if let Some(field) = self.table.property(owner, name) {
                return field.sig.ret.clone().unwrap_or_else(Type::unknown);
            }
        }
        warn!("Unknown type for identifier '{}'", name);
        Type::unknown()
    }

    /// Fix the type of every call argument inside `expr`, innermost first
    pub fn annotate(&self, expr: &mut Expr) -> Result<()> {
        match expr {
            Expr::String { parts, .. } => {
                for part in parts {
                    if let StringPart::Interpolation(inner) = part {
                        self.annotate(inner)?;
                    }
                }
            }
            Expr::Number { .. } | Expr::Bool { .. } | Expr::Ident { .. } => {}
            Expr::Unary { expr, .. } | Expr::Is { expr, .. } => self.annotate(expr)?,
            Expr::Binary { left, right, .. } => {
                self.annotate(left)?;
                self.annotate(right)?;
            }
            Expr::Index { expr, index, .. } => {
                self.annotate(expr)?;
                self.annotate(index)?;
            }
            Expr::Call(call) => {
                if let Some(on) = call.on.as_deref_mut() {
                    self.annotate(on)?;
                }
                for arg in &mut call.args {
                    self.annotate(&mut arg.value)?;
                    if arg.ty.is_none() {
                        arg.ty = Some(self.type_of(&arg.value)?);
                    }
                }
                // A call matching nothing is fatal wherever it appears
                self.resolve(call)?;
            }
            Expr::New { fields, .. } => {
                for (_, value) in fields {
                    self.annotate(value)?;
                }
            }
            Expr::Array { elements, .. } => {
                for element in elements {
                    self.annotate(element)?;
                }
            }
        }
        Ok(())
    }
}

// ==================== Environment Builder ====================

/// Builds type environments for a program
pub struct TypeEnvBuilder<'a> {
    table: &'a SignatureTable,
    /// Imported package names, each seeded as a namespace
    imports: Vec<String>,
    /// Every global by Go name
    globals: TypeEnv,
    /// Namespaces plus the globals visible by bare name, per package
    packages: HashMap<Option<String>, TypeEnv>,
}

impl<'a> TypeEnvBuilder<'a> {
    pub fn new(table: &'a SignatureTable, program: &Program) -> Self {
        let mut imports: Vec<String> = Vec::new();
        for import in &program.imports {
            if !imports.contains(&import.name) {
                imports.push(import.name.clone());
            }
        }
        Self {
            table,
            imports,
            globals: TypeEnv::new(),
            packages: HashMap::new(),
        }
    }

    /// Type the globals, then every function
    pub fn build_program(&mut self, program: &mut Program) -> Result<ProgramEnv> {
        self.build_globals(&mut program.globals)?;

        let mut functions = Vec::with_capacity(program.functions.len());
        for func in &mut program.functions {
            functions.push(self.build_environment(func)?);
        }

        Ok(ProgramEnv {
            globals: self.globals.clone(),
            packages: self.packages.clone(),
            functions,
        })
    }

    /// Infer globals once, in declaration order. A global is visible by
    /// bare name only inside its own package.
    pub fn build_globals(&mut self, globals: &mut [GlobalVar]) -> Result<()> {
        for global in globals.iter_mut() {
            let ctx = FunctionContext {
                package: global.package.clone(),
                owner: None,
            };
            let mut env = match self.packages.get(&global.package) {
                Some(visible) => visible.clone(),
                None => self.seeded_env(),
            };
            let ty = {
                let typer = Typer {
                    table: self.table,
                    env: &env,
                    globals: &self.globals,
                    ctx: &ctx,
                };
                typer.annotate(&mut global.value)?;
                typer.type_of(&global.value)?
            };
            debug!("global {}: {}", global.go_name(), ty);
            env.bind(&global.name, ty.clone());
            self.packages.insert(global.package.clone(), env);
            self.globals.bind(&global.go_name(), ty);
        }
        Ok(())
    }

    fn seeded_env(&self) -> TypeEnv {
        let mut env = TypeEnv::new();
        for name in &self.imports {
            env.bind(name, Type::namespace(name));
        }
        env
    }

    /// Environment of one function; call arguments in its body are annotated
    pub fn build_environment(&self, func: &mut FuncDecl) -> Result<TypeEnv> {
        let decl = func.sig.typed_prototype();
        let ctx = FunctionContext::of(&func.sig);

        let mut env = match self.packages.get(&ctx.package) {
            Some(visible) => visible.clone(),
            None => self.seeded_env(),
        };
        if let Some(owner) = &ctx.owner {
            env.bind(owner, Type::named(owner));
        }
        for arg in &func.sig.args {
            if let Some(ty) = &arg.ty {
                env.bind(arg.binding(), ty.clone());
            }
        }

        self.walk_block(&mut func.body, &mut env, &ctx)
            .map_err(|e| e.in_declaration(decl.clone()))?;

        debug!("Type environment for {}: {} bindings", decl, env.len());
        Ok(env)
    }

    fn walk_block(&self, stmts: &mut [Stmt], env: &mut TypeEnv, ctx: &FunctionContext) -> Result<()> {
        for stmt in stmts {
            self.walk_stmt(stmt, env, ctx)?;
        }
        Ok(())
    }

    fn walk_stmt(&self, stmt: &mut Stmt, env: &mut TypeEnv, ctx: &FunctionContext) -> Result<()> {
        match stmt {
            Stmt::Var { name, value, .. } => {
                let ty = {
                    let typer = self.typer(env, ctx);
                    typer.annotate(value)?;
                    typer.type_of(value)?
                };
                env.bind(name, ty);
            }
            Stmt::Assign { value, .. } => self.typer(env, ctx).annotate(value)?,
            Stmt::Expr(expr) => self.typer(env, ctx).annotate(expr)?,
            Stmt::If { branches, else_block, .. } => {
                for (cond, block) in branches {
                    self.typer(env, ctx).annotate(cond)?;
                    self.walk_block(block, env, ctx)?;
                }
                if let Some(block) = else_block {
                    self.walk_block(block, env, ctx)?;
                }
            }
            Stmt::While { cond, body, .. } => {
                if let Some(cond) = cond {
                    self.typer(env, ctx).annotate(cond)?;
                }
                self.walk_block(body, env, ctx)?;
            }
            Stmt::ForRange { var, from, to, body, .. } => {
                {
                    let typer = self.typer(env, ctx);
                    typer.annotate(from)?;
                    typer.annotate(to)?;
                }
                env.bind(var, Type::int());
                self.walk_block(body, env, ctx)?;
            }
            Stmt::Return { value: Some(value), .. } => self.typer(env, ctx).annotate(value)?,
            Stmt::Return { value: None, .. } | Stmt::Break(_) | Stmt::Continue(_) => {}
        }
        Ok(())
    }

    fn typer<'t>(&'t self, env: &'t TypeEnv, ctx: &'t FunctionContext) -> Typer<'t> {
        Typer {
            table: self.table,
            env,
            globals: &self.globals,
            ctx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;
    use crate::stdlib::builtins::builtin_library;
    use crate::utils::Error;

    fn program(source: &str) -> Program {
        let mut program = builtin_library().unwrap();
        program.extend(Parser::new(Lexer::new(source, 1)).parse_program().unwrap());
        program
    }

    fn build(program: &mut Program) -> Result<ProgramEnv> {
        let table = SignatureTable::new(program)?;
        let mut builder = TypeEnvBuilder::new(&table, program);
        builder.build_program(program)
    }

    fn main_env<'p>(program: &Program, envs: &'p ProgramEnv) -> &'p TypeEnv {
        let index = program.functions.iter().position(|f| f.is_entry_point()).unwrap();
        &envs.functions[index]
    }

    #[test]
    fn test_literal_types() {
        let mut program = program(
            "func main() {\n const a = 3\n const b = 3.0\n const c = 3e2\n const d = \"s\"\n const e = true\n const f = -2\n const g = []\n const h = [1.5]\n}",
        );
        let envs = build(&mut program).unwrap();
        let env = main_env(&program, &envs);
        assert_eq!(env.get("a"), Some(&Type::int()));
        assert_eq!(env.get("b"), Some(&Type::float()));
        assert_eq!(env.get("c"), Some(&Type::float()));
        assert_eq!(env.get("d"), Some(&Type::string()));
        assert_eq!(env.get("e"), Some(&Type::bool()));
        assert_eq!(env.get("f"), Some(&Type::int()));
        assert_eq!(env.get("g"), Some(&Type::array_of(SingleType::named("int"))));
        assert_eq!(env.get("h"), Some(&Type::array_of(SingleType::named("float"))));
    }

    #[test]
    fn test_seeding_and_calls() {
        let source = "import io\nconst scale = 2.5\ntype circle {\n radius float\n area() float\n}\nfunc circle.area() float {\n const r = radius\n const s = scale\n const l = [1, 2].length\n for i in 0..3 {\n  const inner = i\n }\n return r * r\n}\nfunc main() {\n const c = new circle{radius: 5.0}\n const a = c.area\n const p = io.printLine(a)\n}";
        let mut program = program(source);
        let envs = build(&mut program).unwrap();

        let index = program.functions.iter().position(|f| f.sig.name == "area").unwrap();
        let env = &envs.functions[index];
        assert_eq!(env.get("circle"), Some(&Type::named("circle")));
        assert_eq!(env.get("r"), Some(&Type::float()));
        assert_eq!(env.get("s"), Some(&Type::float()));
        assert_eq!(env.get("l"), Some(&Type::int()));
        assert_eq!(env.get("inner"), Some(&Type::int()));
        assert_eq!(env.get("io"), Some(&Type::namespace("io")));

        let env = main_env(&program, &envs);
        assert_eq!(env.get("c"), Some(&Type::named("circle")));
        assert_eq!(env.get("a"), Some(&Type::float()));
        assert_eq!(env.get("p"), Some(&Type::number()));
    }

    #[test]
    fn test_call_arguments_are_annotated() {
        let mut program = program("func foo(x int) {\n}\nfunc foo(x string) {\n}\nfunc main() {\n const s = \"a\"\n foo(x: s)\n}");
        build(&mut program).unwrap();

        let main = program.functions.iter().find(|f| f.is_entry_point()).unwrap();
        let Stmt::Expr(Expr::Call(call)) = &main.body[1] else { panic!("expected call") };
        assert_eq!(call.args[0].ty, Some(Type::string()));
    }

    #[test]
    fn test_building_is_idempotent() {
        let mut program = program("func foo(x int) int {\n return x\n}\nfunc main() {\n const a = foo(x: 1)\n const b = foo(x: a + 1)\n}");
        let first = build(&mut program).unwrap();
        let snapshot = format!("{:?}", program.functions);
        let second = build(&mut program).unwrap();

        assert_eq!(first.functions, second.functions);
        assert_eq!(format!("{:?}", program.functions), snapshot);
    }

    #[test]
    fn test_existing_annotation_is_kept() {
        let mut program = program("func foo(x any) {\n}\nfunc main() {\n foo(x: 1)\n}");
        let index = program.functions.iter().position(|f| f.is_entry_point()).unwrap();
        if let Stmt::Expr(Expr::Call(call)) = &mut program.functions[index].body[0] {
            call.args[0].ty = Some(Type::string());
        }
        build(&mut program).unwrap();
        let Stmt::Expr(Expr::Call(call)) = &program.functions[index].body[0] else { panic!() };
        assert_eq!(call.args[0].ty, Some(Type::string()));
    }

    #[test]
    fn test_unknown_identifier_is_soft() {
        let mut program = program("func main() {\n const a = missing\n const b = a[0]\n}");
        let envs = build(&mut program).unwrap();
        let env = main_env(&program, &envs);
        assert_eq!(env.get("a"), Some(&Type::unknown()));
        assert_eq!(env.get("b"), Some(&Type::unknown()));
    }

    #[test]
    fn test_globals_stay_in_their_package() {
        let mut program = builtin_library().unwrap();
        let mut geometry = Parser::new(Lexer::new(
            "const unit = \"m\"\nfunc foo(x int) {\n}\nfunc foo(x string) {\n}\nfunc show() {\n foo(x: unit)\n}\n",
            2,
        ))
        .parse_program()
        .unwrap();
        geometry.set_package("geometry");
        program.extend(geometry);
        program.extend(
            Parser::new(Lexer::new("import geometry\nconst unit = 1\nfunc main() {\n const u = geometry.unit\n}\n", 1))
                .parse_program()
                .unwrap(),
        );
        let envs = build(&mut program).unwrap();

        assert_eq!(envs.globals.get("geometry_unit"), Some(&Type::string()));
        assert_eq!(envs.globals.get("unit"), Some(&Type::int()));

        let show = program.functions.iter().find(|f| f.sig.name == "show").unwrap();
        let Stmt::Expr(Expr::Call(call)) = &show.body[0] else { panic!("expected call") };
        assert_eq!(call.args[0].ty, Some(Type::string()));

        let env = main_env(&program, &envs);
        assert_eq!(env.get("unit"), Some(&Type::int()));
        assert_eq!(env.get("u"), Some(&Type::string()));
    }

    #[test]
    fn test_unresolved_call_names_declaration() {
        let mut program = program("func main() {\n nothing(x: 1)\n}");
        let err = build(&mut program).unwrap_err();
        assert_eq!(err.to_string(), "In main(): Unresolved call: no declaration matches nothing(x:)");
        assert!(matches!(err.root(), Error::UnresolvedCall { .. }));
    }
}
