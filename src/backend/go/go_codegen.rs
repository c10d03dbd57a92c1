//! Go Code Generator
//!
//! Translates a typed koi program to a single Go `main` package.

use std::collections::HashSet;

use log::{debug, warn};

use crate::backend::codegen::{CodeGen, CompileUnit};
use crate::backend::go::runtime::{PRELUDE, PRELUDE_IMPORTS};
use crate::frontend::ast::*;
use crate::frontend::resolver::{CallTarget, Resolved};
use crate::frontend::semantic::{FunctionContext, TypeEnv, Typer};
use crate::types::signature::go_ident;
use crate::types::FunctionSignature;
use crate::utils::Result;

/// Go interpreted string literal
pub fn go_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `fmt.Sprintf` format string of an interpolated literal and the
/// expressions filling its `%v` verbs, in order
pub fn format_string(parts: &[StringPart]) -> (String, Vec<&Expr>) {
    let mut format = String::new();
    let mut args = Vec::new();
    for part in parts {
        match part {
            StringPart::Text(text) => format.push_str(&text.replace('%', "%%")),
            StringPart::Interpolation(expr) => {
                format.push_str("%v");
                args.push(expr);
            }
        }
    }
    (format, args)
}

/// Go code generator
pub struct GoCodeGen {
    output: String,
    indent: usize,
    /// Counter for range loop variables
    loop_counter: usize,
}

/// Per-declaration state while lowering a body
struct Scope<'s> {
    env: &'s TypeEnv,
    ctx: FunctionContext,
    /// Variables declared so far (arguments, receiver, locals)
    locals: HashSet<String>,
    is_entry: bool,
}

impl GoCodeGen {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
            loop_counter: 0,
        }
    }

    /// Write indented line
    fn writeln(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push('\t');
        }
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn typer<'t>(unit: &CompileUnit<'t>, scope: &'t Scope<'_>) -> Typer<'t> {
        Typer {
            table: unit.table,
            env: scope.env,
            globals: &unit.env.globals,
            ctx: &scope.ctx,
        }
    }

    // ==================== Declarations ====================

    fn gen_globals(&mut self, unit: &CompileUnit<'_>) -> Result<()> {
        for global in &unit.program.globals {
            let scope = Scope {
                env: unit.env.package(&global.package).unwrap_or(&unit.env.globals),
                ctx: FunctionContext {
                    package: global.package.clone(),
                    owner: None,
                },
                locals: HashSet::new(),
                is_entry: false,
            };
            let value = self
                .gen_expr(unit, &scope, &global.value)
                .map_err(|e| e.in_declaration(global.go_name()))?;
            self.writeln(&format!("var {} = {}", global.go_name(), value));
        }
        if !unit.program.globals.is_empty() {
            self.writeln("");
        }
        Ok(())
    }

    fn gen_function(&mut self, unit: &CompileUnit<'_>, func: &FuncDecl, env: &TypeEnv) -> Result<()> {
        let sig = &func.sig;
        let mut scope = Scope {
            env,
            ctx: FunctionContext::of(sig),
            locals: HashSet::new(),
            is_entry: func.is_entry_point(),
        };

        if scope.is_entry {
            self.writeln("func main() {");
        } else {
            self.writeln(&format!("func {}(args ...KoiValue) KoiValue {{", sig.mangled()));
        }
        self.indent += 1;

        let mut bindings = Vec::new();
        if let Some(owner) = sig.owner.type_name() {
            bindings.push(owner.to_string());
        }
        bindings.extend(sig.args.iter().map(|a| a.binding().to_string()));
        for (i, name) in bindings.into_iter().enumerate() {
            let ident = go_ident(&name);
            self.writeln(&format!("{} := args[{}]", ident, i));
            self.writeln(&format!("_ = {}", ident));
            scope.locals.insert(name);
        }

        self.gen_block(unit, &mut scope, &func.body)?;

        if !scope.is_entry {
            self.writeln("return KoiValue{}");
        }
        self.indent -= 1;
        self.writeln("}");
        self.writeln("");
        Ok(())
    }

    // ==================== Statements ====================

    fn gen_block(&mut self, unit: &CompileUnit<'_>, scope: &mut Scope<'_>, stmts: &[Stmt]) -> Result<()> {
        for stmt in stmts {
            self.gen_stmt(unit, scope, stmt)?;
        }
        Ok(())
    }

    fn gen_stmt(&mut self, unit: &CompileUnit<'_>, scope: &mut Scope<'_>, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Var { name, mutable, value, .. } => {
                let value = self.gen_expr(unit, scope, value)?;
                let ident = go_ident(name);
                if *mutable {
                    self.writeln(&format!("var {} = {}", ident, value));
                } else {
                    self.writeln(&format!("{} := {}", ident, value));
                }
                self.writeln(&format!("_ = {}", ident));
                scope.locals.insert(name.clone());
            }
            Stmt::Assign { name, value, .. } => {
                let value = self.gen_expr(unit, scope, value)?;
                let target = self.variable(unit, scope, name).unwrap_or_else(|| go_ident(name));
                self.writeln(&format!("{} = {}", target, value));
            }
            Stmt::Expr(expr) => {
                let code = self.gen_expr(unit, scope, expr)?;
                if self.is_go_call(unit, scope, expr)? {
                    self.writeln(&code);
                } else {
                    self.writeln(&format!("_ = {}", code));
                }
            }
            Stmt::If { branches, else_block, .. } => {
                for (i, (cond, block)) in branches.iter().enumerate() {
                    let cond = self.gen_expr(unit, scope, cond)?;
                    if i == 0 {
                        self.writeln(&format!("if Koi_Truthy({}) {{", cond));
                    } else {
                        self.indent -= 1;
                        self.writeln(&format!("}} else if Koi_Truthy({}) {{", cond));
                    }
                    self.indent += 1;
                    self.gen_block(unit, scope, block)?;
                }
                if let Some(block) = else_block {
                    self.indent -= 1;
                    self.writeln("} else {");
                    self.indent += 1;
                    self.gen_block(unit, scope, block)?;
                }
                self.indent -= 1;
                self.writeln("}");
            }
            Stmt::While { cond, body, .. } => {
                match cond {
                    Some(cond) => {
                        let cond = self.gen_expr(unit, scope, cond)?;
                        self.writeln(&format!("for Koi_Truthy({}) {{", cond));
                    }
                    None => self.writeln("for {"),
                }
                self.indent += 1;
                self.gen_block(unit, scope, body)?;
                self.indent -= 1;
                self.writeln("}");
            }
            Stmt::ForRange { var, from, to, body, .. } => {
                let from = self.gen_expr(unit, scope, from)?;
                let to = self.gen_expr(unit, scope, to)?;
                let n = self.loop_counter;
                self.loop_counter += 1;
                self.writeln(&format!(
                    "for _i{n}, _n{n} := Koi_Int_of({}), Koi_Int_of({}); _i{n} < _n{n}; _i{n}++ {{",
                    from, to
                ));
                self.indent += 1;
                let ident = go_ident(var);
                self.writeln(&format!("{} := Koi_Int(_i{})", ident, n));
                self.writeln(&format!("_ = {}", ident));
                scope.locals.insert(var.clone());
                self.gen_block(unit, scope, body)?;
                self.indent -= 1;
                self.writeln("}");
            }
            Stmt::Break(_) => self.writeln("break"),
            Stmt::Continue(_) => self.writeln("continue"),
            Stmt::Return { value, .. } => match (value, scope.is_entry) {
                (Some(value), true) => {
                    let value = self.gen_expr(unit, scope, value)?;
                    self.writeln(&format!("_ = {}", value));
                    self.writeln("return");
                }
                (None, true) => self.writeln("return"),
                (Some(value), false) => {
                    let value = self.gen_expr(unit, scope, value)?;
                    self.writeln(&format!("return {}", value));
                }
                (None, false) => self.writeln("return KoiValue{}"),
            },
        }
        Ok(())
    }

    /// Whether the lowered expression is a Go call usable as a statement
    fn is_go_call(&self, unit: &CompileUnit<'_>, scope: &Scope<'_>, expr: &Expr) -> Result<bool> {
        match expr {
            Expr::Call(call) => {
                let (_, resolved) = Self::typer(unit, scope).resolve(call)?;
                Ok(!matches!(resolved, Resolved::Global(_)))
            }
            _ => Ok(false),
        }
    }

    // ==================== Expressions ====================

    fn gen_expr(&self, unit: &CompileUnit<'_>, scope: &Scope<'_>, expr: &Expr) -> Result<String> {
        Ok(match expr {
            Expr::String { parts, .. } => {
                let (format, args) = format_string(parts);
                if args.is_empty() {
                    let text: String = parts
                        .iter()
                        .map(|p| match p {
                            StringPart::Text(text) => text.as_str(),
                            StringPart::Interpolation(_) => "",
                        })
                        .collect();
                    format!("Koi_String({})", go_quote(&text))
                } else {
                    let args = args
                        .into_iter()
                        .map(|a| self.gen_expr(unit, scope, a))
                        .collect::<Result<Vec<_>>>()?;
                    format!("Koi_String(fmt.Sprintf({}, {}))", go_quote(&format), args.join(", "))
                }
            }
            Expr::Number { text, .. } => {
                if text.contains(['.', 'e', 'E']) {
                    format!("Koi_Float({})", text)
                } else {
                    format!("Koi_Int({})", text)
                }
            }
            Expr::Bool { value, .. } => format!("Koi_Bool({})", value),
            Expr::Ident { name, .. } => self.gen_ident(unit, scope, name),
            Expr::Unary { op, expr, .. } => {
                let inner = self.gen_expr(unit, scope, expr)?;
                match op {
                    UnOp::Not => format!("Koi_Not({})", inner),
                    UnOp::Neg => format!("Koi_Neg({})", inner),
                }
            }
            Expr::Binary { left, op, right, .. } => {
                let left = self.gen_expr(unit, scope, left)?;
                let right = self.gen_expr(unit, scope, right)?;
                format!("{}({}, {})", Self::binop_to_go(*op), left, right)
            }
            Expr::Is { expr, ty, .. } => {
                let inner = self.gen_expr(unit, scope, expr)?;
                format!("Koi_Bool({}.Tag() == {})", inner, go_quote(ty))
            }
            Expr::Index { expr, index, .. } => {
                let target = self.gen_expr(unit, scope, expr)?;
                let index = self.gen_expr(unit, scope, index)?;
                format!("Koi_Index({}, {})", target, index)
            }
            Expr::Call(call) => self.gen_call(unit, scope, call)?,
            Expr::New { ty, fields, .. } => self.gen_new(unit, scope, ty, fields)?,
            Expr::Array { elements, .. } => {
                let ty = Self::typer(unit, scope).type_of(expr)?;
                let tag = if ty.is_array() { ty.to_string() } else { "[]any".to_string() };
                let mut items = vec![go_quote(&tag)];
                for element in elements {
                    items.push(self.gen_expr(unit, scope, element)?);
                }
                format!("Koi_Array({})", items.join(", "))
            }
        })
    }

    fn binop_to_go(op: BinOp) -> &'static str {
        match op {
            BinOp::Add => "Koi_Add",
            BinOp::Sub => "Koi_Sub",
            BinOp::Mul => "Koi_Mul",
            BinOp::Div => "Koi_Div",
            BinOp::Mod => "Koi_Mod",
            BinOp::Eq => "Koi_Eq",
            BinOp::Ne => "Koi_Ne",
            BinOp::Lt => "Koi_Lt",
            BinOp::Le => "Koi_Le",
            BinOp::Gt => "Koi_Gt",
            BinOp::Ge => "Koi_Ge",
            BinOp::And => "Koi_And",
            BinOp::Or => "Koi_Or",
        }
    }

    /// Go name of a local or of a global visible from the scope's package
    fn variable(&self, unit: &CompileUnit<'_>, scope: &Scope<'_>, name: &str) -> Option<String> {
        if scope.locals.contains(name) {
            return Some(go_ident(name));
        }
        unit.program
            .globals
            .iter()
            .find(|g| g.name == name && g.package == scope.ctx.package)
            .map(GlobalVar::go_name)
    }

    fn gen_ident(&self, unit: &CompileUnit<'_>, scope: &Scope<'_>, name: &str) -> String {
        if let Some(var) = self.variable(unit, scope, name) {
            return var;
        }
        // Bare field of the receiver inside a method
        if let Some(owner) = &scope.ctx.owner {
            if unit.table.property(owner, name).is_some() {
                return format!("{}.Invoke({})", go_ident(owner), go_quote(name));
            }
        }
        warn!("Identifier '{}' is not declared in this scope", name);
        go_ident(name)
    }

    fn gen_call(&self, unit: &CompileUnit<'_>, scope: &Scope<'_>, call: &CallExpr) -> Result<String> {
        let (target, resolved) = Self::typer(unit, scope).resolve(call)?;
        let mut args = Vec::with_capacity(call.args.len() + 1);
        for arg in &call.args {
            args.push(self.gen_expr(unit, scope, &arg.value)?);
        }

        let decl = match resolved {
            Resolved::Runtime(func) => return Ok(format!("{}({})", func.go_name, args.join(", "))),
            Resolved::Global(global) => return Ok(global.go_name.clone()),
            Resolved::Declared(decl) => decl,
        };

        let receiver = match (&target, call.on.as_deref()) {
            (CallTarget::Receiver(owner), Some(on)) => Some((owner, self.gen_expr(unit, scope, on)?)),
            _ => None,
        };

        Ok(match receiver {
            None => format!("{}({})", decl.sig.mangled(), args.join(", ")),
            // Shape 1: the receiver's type is known statically
            Some((Some(_), recv)) if decl.sig.has_receiver() => match unit.table.implementation(&decl.sig) {
                Some(func) => {
                    args.insert(0, recv);
                    format!("{}({})", func.sig.mangled(), args.join(", "))
                }
                None => format!("{}.Invoke({})", recv, Self::call_args(&decl.sig, args)),
            },
            // Shape 3: runtime lookup by tag and method table
            Some((_, recv)) => format!("Koi_Dispatch({}, {})", recv, Self::call_args(&decl.sig, args)),
        })
    }

    /// Quoted selector followed by the lowered arguments
    fn call_args(sig: &FunctionSignature, args: Vec<String>) -> String {
        let mut all = vec![go_quote(&sig.selector())];
        all.extend(args);
        all.join(", ")
    }

    /// `KoiValue` literal tagged with the type name, carrying the given
    /// fields and every function declared for the type
    fn gen_new(
        &self,
        unit: &CompileUnit<'_>,
        scope: &Scope<'_>,
        ty: &str,
        fields: &[(String, Expr)],
    ) -> Result<String> {
        let mut entries = Vec::new();
        let mut keys = HashSet::new();
        for (name, value) in fields {
            let value = self.gen_expr(unit, scope, value)?;
            entries.push(format!("{}: Koi_Static({})", go_quote(name), value));
            keys.insert(name.clone());
        }
        for method in unit.table.methods_of(ty) {
            let selector = method.sig.selector();
            if keys.insert(selector.clone()) {
                entries.push(format!("{}: {}", go_quote(&selector), method.sig.mangled()));
            }
        }
        Ok(format!(
            "KoiValue{{Type: {}, Methods: map[string]KoiMethod{{{}}}}}",
            go_quote(ty),
            entries.join(", ")
        ))
    }
}

impl Default for GoCodeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGen for GoCodeGen {
    fn generate(&mut self, unit: CompileUnit<'_>) -> Result<String> {
        self.output.clear();
        self.indent = 0;
        self.loop_counter = 0;

        self.writeln("package main");
        self.writeln("");
        self.writeln("import (");
        let mut seen = HashSet::new();
        for import in PRELUDE_IMPORTS {
            if seen.insert(import) {
                self.writeln(&format!("\t{}", go_quote(import)));
            }
        }
        self.writeln(")");
        self.writeln("");
        self.output.push_str(PRELUDE);
        self.writeln("");

        self.gen_globals(&unit)?;

        // main goes last
        let mut entry = None;
        for (i, func) in unit.program.functions.iter().enumerate() {
            if func.sig.is_extern {
                continue;
            }
            if func.is_entry_point() {
                entry = Some(i);
                continue;
            }
            let env = unit.env.functions.get(i).unwrap_or(&unit.env.globals);
            self.gen_function(&unit, func, env)
                .map_err(|e| e.in_declaration(func.sig.typed_prototype()))?;
        }
        match entry {
            Some(i) => {
                let func = &unit.program.functions[i];
                let env = unit.env.functions.get(i).unwrap_or(&unit.env.globals);
                self.gen_function(&unit, func, env)
                    .map_err(|e| e.in_declaration(func.sig.typed_prototype()))?;
            }
            None => warn!("No entry point: the generated package has no main function"),
        }

        debug!("Generated {} bytes of Go", self.output.len());
        Ok(std::mem::take(&mut self.output))
    }

    fn name(&self) -> &str {
        "go"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::{split_interpolations, Parser};
    use crate::frontend::resolver::SignatureTable;
    use crate::frontend::semantic::TypeEnvBuilder;
    use crate::stdlib::builtins::builtin_library;
    use crate::utils::Error;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> Result<String> {
        let mut program = builtin_library()?;
        program.extend(Parser::new(Lexer::new(source, 1)).parse_program()?);
        let table = SignatureTable::new(&program)?;
        let env = TypeEnvBuilder::new(&table, &program).build_program(&mut program)?;
        GoCodeGen::new().generate(CompileUnit {
            program: &program,
            table: &table,
            env: &env,
        })
    }

    /// Compile a main file importing one koi package
    fn compile_with_package(package: &str, package_source: &str, source: &str) -> Result<String> {
        let mut program = builtin_library()?;
        let mut module = Parser::new(Lexer::new(package_source, 2)).parse_program()?;
        module.set_package(package);
        program.extend(module);
        program.extend(Parser::new(Lexer::new(source, 1)).parse_program()?);
        let table = SignatureTable::new(&program)?;
        let env = TypeEnvBuilder::new(&table, &program).build_program(&mut program)?;
        GoCodeGen::new().generate(CompileUnit {
            program: &program,
            table: &table,
            env: &env,
        })
    }

    /// Generated text after the prelude
    fn body(source: &str) -> String {
        let out = compile(source).unwrap();
        let start = out.find(PRELUDE).unwrap() + PRELUDE.len();
        out[start..].trim().to_string()
    }

    #[test]
    fn test_go_quote() {
        assert_eq!(go_quote("a\"b\\c\nd"), r#""a\"b\\c\nd""#);
        assert_eq!(go_quote("\u{1}"), r#""\u0001""#);
    }

    #[test]
    fn test_format_string() {
        let parts = split_interpolations("a=${x} b=${y} 100%", 0, 0).unwrap();
        let (format, args) = format_string(&parts);
        assert_eq!(format, "a=%v b=%v 100%%");
        let names: Vec<&str> = args
            .iter()
            .map(|e| match e {
                Expr::Ident { name, .. } => name.as_str(),
                _ => "?",
            })
            .collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_file_layout() {
        let out = compile("func helper() {\n}\nfunc main() {\n helper()\n}\n").unwrap();
        assert!(out.starts_with("package main\n\nimport (\n\t\"fmt\"\n\t\"math\"\n)\n\ntype KoiMethod"));
        let helper = out.find("func helper(args ...KoiValue) KoiValue {").unwrap();
        let main = out.find("func main() {").unwrap();
        assert!(helper < main);
        // externs live in the prelude only
        assert_eq!(out.matches("func Koi_Array_length(").count(), 1);
    }

    #[test]
    fn test_circle() {
        let source = r#"
type circle {
    radius float
}

func circle.area() float {
    return radius * radius * 3.14
}

func main() {
    const c = new circle{radius: 5}
    const a = c.area()
}
"#;
        let expected = r#"func circle_area(args ...KoiValue) KoiValue {
	circle := args[0]
	_ = circle
	return Koi_Mul(Koi_Mul(circle.Invoke("radius"), circle.Invoke("radius")), Koi_Float(3.14))
	return KoiValue{}
}

func main() {
	c := KoiValue{Type: "circle", Methods: map[string]KoiMethod{"radius": Koi_Static(Koi_Int(5)), "area": circle_area}}
	_ = c
	a := circle_area(c)
	_ = a
}"#;
        assert_eq!(body(source), expected);
    }

    #[test]
    fn test_statements() {
        let source = r#"
import io

mut total = 0

func main() {
    mut i = 1
    for i < 10 {
        i = i * 2
    }
    for k in 0..3 {
        if k == 1 {
            continue
        } else if k > 5 {
            break
        } else {
            total = total + k
        }
    }
    io.printLine("total=${total}")
}
"#;
        let expected = r#"var total = Koi_Int(0)

func main() {
	var i = Koi_Int(1)
	_ = i
	for Koi_Truthy(Koi_Lt(i, Koi_Int(10))) {
		i = Koi_Mul(i, Koi_Int(2))
	}
	for _i0, _n0 := Koi_Int_of(Koi_Int(0)), Koi_Int_of(Koi_Int(3)); _i0 < _n0; _i0++ {
		k := Koi_Int(_i0)
		_ = k
		if Koi_Truthy(Koi_Eq(k, Koi_Int(1))) {
			continue
		} else if Koi_Truthy(Koi_Gt(k, Koi_Int(5))) {
			break
		} else {
			total = Koi_Add(total, k)
		}
	}
	Koi_io_printLine(Koi_String(fmt.Sprintf("total=%v", total)))
}"#;
        assert_eq!(body(source), expected);
    }

    #[test]
    fn test_overloads_and_builtins() {
        let source = r#"
func foo(x int) {
}

func foo(x string) {
}

func main() {
    foo(x: "hi")
    foo(x: 1)
    const xs = [1, 2].append(value: 3)
    const n = xs.length
    const s = "abc".length
    const e = []
}
"#;
        let out = body(source);
        assert!(out.contains("func foo_x_int(args ...KoiValue) KoiValue {\n\tx := args[0]\n\t_ = x\n"));
        assert!(out.contains("\tfoo_x_string(Koi_String(\"hi\"))\n"));
        assert!(out.contains("\tfoo_x_int(Koi_Int(1))\n"));
        assert!(out.contains(
            "xs := Koi_Array_append_value_int(Koi_Array(\"[]int\", Koi_Int(1), Koi_Int(2)), Koi_Int(3))"
        ));
        assert!(out.contains("n := Koi_Array_length(xs)"));
        assert!(out.contains("s := Koi_String_length(Koi_String(\"abc\"))"));
        assert!(out.contains("e := Koi_Array(\"[]int\")"));
    }

    #[test]
    fn test_dynamic_dispatch() {
        let source = r#"
type shape {
    area() float
}

func describe(s) {
    const a = s.area
    const b = s is shape
}

func main() {
}
"#;
        let out = body(source);
        assert!(out.contains("a := Koi_Dispatch(s, \"area\")"));
        assert!(out.contains("b := Koi_Bool(s.Tag() == \"shape\")"));
    }

    #[test]
    fn test_data_field_on_known_type() {
        let source = "type point {\n x int\n}\nfunc main() {\n const p = new point{x: 1}\n const v = p.x\n}\n";
        let out = body(source);
        assert!(out.contains("v := p.Invoke(\"x\")"));
    }

    #[test]
    fn test_expression_statements() {
        let out = body("func main() {\n mut x = 1\n x + 1\n not x\n -x\n [1][0]\n}\n");
        assert!(out.contains("\t_ = Koi_Add(x, Koi_Int(1))\n"));
        assert!(out.contains("\t_ = Koi_Not(x)\n"));
        assert!(out.contains("\t_ = Koi_Neg(x)\n"));
        assert!(out.contains("\t_ = Koi_Index(Koi_Array(\"[]int\", Koi_Int(1)), Koi_Int(0))\n"));
    }

    #[test]
    fn test_go_keywords_are_escaped() {
        let out = body("func main() {\n const range = 1\n const args = range\n}\n");
        assert!(out.contains("range_ := Koi_Int(1)"));
        assert!(out.contains("args_ := range_"));
    }

    #[test]
    fn test_package_and_runtime_calls() {
        let geometry = r#"
const unit = "m"

func area(r float) float {
    return r * r
}

func foo(x int) {
}

func foo(x string) {
}

func show() {
    foo(x: unit)
}
"#;
        let source = r#"
import geometry
import math

const unit = 1

func main() {
    const a = geometry.area(r: 2.0)
    const u = geometry.unit
    const s = math.sin(a)
    geometry.show()
}
"#;
        let out = compile_with_package("geometry", geometry, source).unwrap();
        assert!(out.contains("var geometry_unit = Koi_String(\"m\")\nvar unit = Koi_Int(1)\n"));
        assert!(out.contains("func geometry_area_r_float(args ...KoiValue) KoiValue {"));
        assert!(out.contains("\ta := geometry_area_r_float(Koi_Float(2.0))\n"));
        assert!(out.contains("\tu := geometry_unit\n"));
        assert!(out.contains("\ts := Koi_math_sin(a)\n"));
        assert!(out.contains("\tgeometry_show()\n"));
        // The main file's `unit` does not leak into the package
        assert!(out.contains("\tgeometry_foo_x_string(geometry_unit)\n"));
    }

    #[test]
    fn test_reserved_function_names() {
        let out = body("func go() {\n}\nfunc init() {\n}\nfunc main() {\n go()\n init()\n}\n");
        assert!(out.contains("func go_(args ...KoiValue) KoiValue {"));
        assert!(out.contains("func init_(args ...KoiValue) KoiValue {"));
        assert!(out.contains("\tgo_()\n\tinit_()\n"));
    }

    #[test]
    fn test_no_overload_accepts_argument() {
        let source = "func foo(x int) {\n}\nfunc foo(x string) {\n}\nfunc main() {\n foo(x: true)\n}\n";
        let err = compile(source).unwrap_err();
        match err.root() {
            Error::UnresolvedCall { prototype } => assert_eq!(prototype, "foo(x:bool)"),
            other => panic!("expected an unresolved call, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_call_is_fatal() {
        let err = compile("func main() {\n foo(x: true)\n}\n").unwrap_err();
        assert!(matches!(err.root(), Error::UnresolvedCall { .. }));
    }
}
