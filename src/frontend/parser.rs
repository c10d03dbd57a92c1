//! Parser for koi
//!
//! Recursive descent parser with Pratt parsing for expressions.

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::types::{FuncArg, FunctionSignature, Owner, SingleType, Type};
use crate::utils::{Error, Result, Span};

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file_id: usize,
}

impl Parser {
    /// Create a new parser from a lexer
    pub fn new(mut lexer: Lexer) -> Self {
        let tokens = lexer.tokenize();
        let file_id = tokens.first().map(|t| t.span.file_id).unwrap_or(0);
        Self { tokens, pos: 0, file_id }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        // tokenize() always ends with Eof, so the fallback is never empty
        self.tokens.get(self.pos).unwrap_or_else(|| &self.tokens[self.tokens.len() - 1])
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::UnexpectedToken {
            expected: expected.to_string(),
            got: format!("{:?}", self.current_kind()),
            span: self.current().span,
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("{:?}", expected)))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// A statement or declaration must be followed by a separator or `}`
    fn end_of_statement(&mut self) -> Result<()> {
        match self.current_kind() {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name.clone())
            }
            _ => Err(Error::ExpectedIdent { span: token.span }),
        }
    }

    /// Report the first token the lexer could not make sense of
    fn check_lexical_errors(&self) -> Result<()> {
        for token in &self.tokens {
            match token.kind {
                TokenKind::Unknown(ch) => return Err(Error::UnexpectedChar { ch, span: token.span }),
                TokenKind::UnterminatedString => return Err(Error::UnterminatedString { span: token.span }),
                _ => {}
            }
        }
        Ok(())
    }

    // ==================== Declarations ====================

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program> {
        self.check_lexical_errors()?;
        let mut program = Program::default();

        loop {
            self.skip_newlines();
            if self.is_at_end() {
                break;
            }

            match self.current_kind() {
                TokenKind::Import => program.imports.push(self.parse_import()?),
                TokenKind::Const | TokenKind::Mut => program.globals.push(self.parse_global()?),
                TokenKind::Func => program.functions.push(self.parse_function(false)?),
                TokenKind::Extern => {
                    self.advance();
                    program.functions.push(self.parse_function(true)?);
                }
                TokenKind::Type => program.types.push(self.parse_type_decl()?),
                _ => return Err(self.unexpected("declaration (import, const, mut, func, extern, type)")),
            }
            self.end_of_statement()?;
        }

        Ok(program)
    }

    fn parse_import(&mut self) -> Result<Import> {
        let start = self.expect(TokenKind::Import)?.span;
        let name = self.parse_ident()?;
        Ok(Import {
            name,
            span: start.merge(&self.prev_span()),
        })
    }

    fn parse_global(&mut self) -> Result<GlobalVar> {
        let start = self.current().span;
        let mutable = self.advance().kind == TokenKind::Mut;
        let name = self.parse_ident()?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        Ok(GlobalVar {
            name,
            mutable,
            value,
            package: None,
            span: start.merge(&self.prev_span()),
        })
    }

    /// `func [Owner.]name(args) [ret] { body }`; extern functions stop after the signature
    fn parse_function(&mut self, is_extern: bool) -> Result<FuncDecl> {
        let start = self.expect(TokenKind::Func)?.span;

        let first = self.parse_ident()?;
        let (owner, name) = if self.consume(&TokenKind::Dot) {
            (Owner::Type(first), self.parse_ident()?)
        } else {
            (Owner::Free, first)
        };

        self.expect(TokenKind::LParen)?;
        let args = self.parse_func_args()?;
        self.expect(TokenKind::RParen)?;

        let ret = if self.starts_type() { Some(self.parse_type()?) } else { None };

        let mut sig = FunctionSignature::new(owner, &name, args, ret);
        sig.is_extern = is_extern;

        let body = if is_extern { Vec::new() } else { self.parse_block()? };

        Ok(FuncDecl {
            sig,
            body,
            span: start.merge(&self.prev_span()),
        })
    }

    /// `label [name] type, ...` up to (not including) `)`
    fn parse_func_args(&mut self) -> Result<Vec<FuncArg>> {
        let mut args = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            let label = self.parse_ident()?;

            let name = match (self.current_kind(), self.peek_kind()) {
                (TokenKind::Ident(name), Some(next))
                    if !matches!(next, TokenKind::Comma | TokenKind::RParen) =>
                {
                    let name = name.clone();
                    self.advance();
                    Some(name)
                }
                _ => None,
            };

            let ty = if matches!(self.current_kind(), TokenKind::Comma | TokenKind::RParen) {
                None
            } else {
                Some(self.parse_type()?)
            };

            args.push(FuncArg { label, name, ty });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        Ok(args)
    }

    /// `type name { field type; method(args) ret }`
    fn parse_type_decl(&mut self) -> Result<TypeDecl> {
        let start = self.expect(TokenKind::Type)?.span;
        let name = self.parse_ident()?;
        self.expect(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(&TokenKind::RBrace) || self.is_at_end() {
                break;
            }

            let field_name = self.parse_ident()?;
            let (args, ret) = if self.consume(&TokenKind::LParen) {
                let args = self.parse_func_args()?;
                self.expect(TokenKind::RParen)?;
                let ret = if self.starts_type() { Some(self.parse_type()?) } else { None };
                (args, ret)
            } else {
                (Vec::new(), Some(self.parse_type()?))
            };

            fields.push(FunctionSignature::new(Owner::Type(name.clone()), &field_name, args, ret));
            self.consume(&TokenKind::Comma);
            self.end_of_statement()?;
        }

        self.expect(TokenKind::RBrace)?;

        Ok(TypeDecl {
            name,
            fields,
            package: None,
            span: start.merge(&self.prev_span()),
        })
    }

    // ==================== Types ====================

    fn starts_type(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Ident(_) | TokenKind::LBracket | TokenKind::LParen | TokenKind::Map | TokenKind::Func
        )
    }

    /// A single type, or a parenthesized union `(A | B)`
    fn parse_type(&mut self) -> Result<Type> {
        let start = self.current().span;
        if self.consume(&TokenKind::LParen) {
            let mut alternatives = vec![self.parse_single_type()?];
            while self.consume(&TokenKind::Pipe) {
                alternatives.push(self.parse_single_type()?);
            }
            self.expect(TokenKind::RParen)?;
            return Type::union(alternatives).ok_or(Error::ExpectedType { span: start });
        }
        Ok(Type::single(self.parse_single_type()?))
    }

    fn parse_single_type(&mut self) -> Result<SingleType> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::LBracket => {
                self.advance();
                self.expect(TokenKind::RBracket)?;
                Ok(SingleType::Array(Box::new(self.parse_single_type()?)))
            }
            TokenKind::Map => {
                self.advance();
                self.expect(TokenKind::LBracket)?;
                let key = self.parse_single_type()?;
                self.expect(TokenKind::RBracket)?;
                let value = self.parse_single_type()?;
                Ok(SingleType::Map(Box::new(key), Box::new(value)))
            }
            TokenKind::Func => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let args = self.parse_func_args()?;
                self.expect(TokenKind::RParen)?;
                let ret = if self.starts_type() { Some(self.parse_type()?) } else { None };
                Ok(SingleType::Func(Box::new(FunctionSignature::new(Owner::Free, "func", args, ret))))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(SingleType::Named(name.clone()))
            }
            _ => Err(Error::ExpectedType { span: token.span }),
        }
    }

    // ==================== Statements ====================

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();

        loop {
            self.skip_newlines();
            if self.check(&TokenKind::RBrace) {
                break;
            }
            if self.is_at_end() {
                return Err(self.unexpected("}"));
            }
            stmts.push(self.parse_stmt()?);
            self.end_of_statement()?;
        }

        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let start = self.current().span;
        match self.current_kind() {
            TokenKind::Const | TokenKind::Mut => {
                let mutable = self.advance().kind == TokenKind::Mut;
                let name = self.parse_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expr()?;
                Ok(Stmt::Var {
                    name,
                    mutable,
                    value,
                    span: start.merge(&self.prev_span()),
                })
            }
            TokenKind::Ident(_) if self.peek_kind() == Some(&TokenKind::Eq) => {
                let name = self.parse_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expr()?;
                Ok(Stmt::Assign {
                    name,
                    value,
                    span: start.merge(&self.prev_span()),
                })
            }
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Break => {
                self.advance();
                Ok(Stmt::Break(start))
            }
            TokenKind::Continue => {
                self.advance();
                Ok(Stmt::Continue(start))
            }
            TokenKind::Return => {
                self.advance();
                let value = if matches!(
                    self.current_kind(),
                    TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
                ) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                Ok(Stmt::Return {
                    value,
                    span: start.merge(&self.prev_span()),
                })
            }
            _ => Ok(Stmt::Expr(self.parse_expr()?)),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.expect(TokenKind::If)?.span;
        let cond = self.parse_expr()?;
        let block = self.parse_block()?;

        let mut branches = vec![(cond, block)];
        let mut else_block = None;

        while self.consume(&TokenKind::Else) {
            if self.consume(&TokenKind::If) {
                let cond = self.parse_expr()?;
                let block = self.parse_block()?;
                branches.push((cond, block));
            } else {
                else_block = Some(self.parse_block()?);
                break;
            }
        }

        Ok(Stmt::If {
            branches,
            else_block,
            span: start.merge(&self.prev_span()),
        })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        let start = self.expect(TokenKind::For)?.span;

        if self.check(&TokenKind::LBrace) {
            let body = self.parse_block()?;
            return Ok(Stmt::While {
                cond: None,
                body,
                span: start.merge(&self.prev_span()),
            });
        }

        if matches!(self.current_kind(), TokenKind::Ident(_)) && self.peek_kind() == Some(&TokenKind::In) {
            let var = self.parse_ident()?;
            self.expect(TokenKind::In)?;
            let from = self.parse_expr()?;
            self.expect(TokenKind::DotDot)?;
            let to = self.parse_expr()?;
            let body = self.parse_block()?;
            return Ok(Stmt::ForRange {
                var,
                from,
                to,
                body,
                span: start.merge(&self.prev_span()),
            });
        }

        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        Ok(Stmt::While {
            cond: Some(cond),
            body,
            span: start.merge(&self.prev_span()),
        })
    }

    // ==================== Expression Parsing (Pratt) ====================

    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_expr_bp(0)
    }

    /// Parse a lone expression, e.g. the inside of `${...}`
    pub fn parse_standalone_expr(&mut self) -> Result<Expr> {
        self.check_lexical_errors()?;
        let expr = self.parse_expr()?;
        self.skip_newlines();
        if !self.is_at_end() {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expr)
    }

    /// Parse expression with binding power (Pratt parsing)
    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op_token = self.current().clone();
            let Some(bp) = op_token.kind.binary_precedence() else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.advance();

            if op_token.kind == TokenKind::Is {
                let ty = self.parse_ident()?;
                let span = left.span().merge(&self.prev_span());
                left = Expr::Is {
                    expr: Box::new(left),
                    ty,
                    span,
                };
                continue;
            }

            let op = Self::token_to_binop(&op_token)?;
            let right = self.parse_expr_bp(bp + 1)?;
            let span = left.span().merge(&right.span());
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Not => {
                self.advance();
                // `not a == b` negates the comparison
                let expr = self.parse_expr_bp(3)?;
                Ok(Expr::Unary {
                    op: UnOp::Not,
                    span: token.span.merge(&expr.span()),
                    expr: Box::new(expr),
                })
            }
            TokenKind::Minus => {
                self.advance();
                if let TokenKind::Number(text) = self.current_kind().clone() {
                    self.advance();
                    return self.parse_postfix(Expr::Number {
                        text: format!("-{}", text),
                        span: token.span.merge(&self.prev_span()),
                    });
                }
                let expr = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnOp::Neg,
                    span: token.span.merge(&expr.span()),
                    expr: Box::new(expr),
                })
            }
            _ => {
                let expr = self.parse_primary()?;
                self.parse_postfix(expr)
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        match &token.kind {
            TokenKind::Number(text) => {
                self.advance();
                Ok(Expr::Number {
                    text: text.clone(),
                    span: token.span,
                })
            }
            TokenKind::StringLit(text) => {
                self.advance();
                Ok(Expr::String {
                    parts: split_interpolations(text, self.file_id, token.span.start + 1)?,
                    span: token.span,
                })
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr::Bool {
                    value: token.kind == TokenKind::True,
                    span: token.span,
                })
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_call_args()?;
                    return Ok(Expr::Call(CallExpr {
                        on: None,
                        name: name.clone(),
                        args,
                        span: token.span.merge(&self.prev_span()),
                    }));
                }
                Ok(Expr::Ident {
                    name: name.clone(),
                    span: token.span,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::New => {
                self.advance();
                let ty = self.parse_ident()?;
                self.expect(TokenKind::LBrace)?;
                let mut fields = Vec::new();
                loop {
                    self.skip_newlines();
                    if self.check(&TokenKind::RBrace) || self.is_at_end() {
                        break;
                    }
                    let key = self.parse_ident()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.parse_expr()?;
                    fields.push((key, value));
                    self.consume(&TokenKind::Comma);
                }
                self.expect(TokenKind::RBrace)?;
                Ok(Expr::New {
                    ty,
                    fields,
                    span: token.span.merge(&self.prev_span()),
                })
            }
            TokenKind::LBracket => {
                self.advance();

                if self.consume(&TokenKind::RBracket) {
                    if !matches!(
                        self.current_kind(),
                        TokenKind::Ident(_) | TokenKind::LBracket | TokenKind::Map | TokenKind::Func
                    ) {
                        return Ok(Expr::Array {
                            elem_ty: None,
                            elements: Vec::new(),
                            span: token.span.merge(&self.prev_span()),
                        });
                    }

                    // `[]T{a, b}`
                    let elem = self.parse_single_type()?;
                    self.expect(TokenKind::LBrace)?;
                    let mut elements = Vec::new();
                    loop {
                        self.skip_newlines();
                        if self.check(&TokenKind::RBrace) || self.is_at_end() {
                            break;
                        }
                        elements.push(self.parse_expr()?);
                        self.consume(&TokenKind::Comma);
                    }
                    self.expect(TokenKind::RBrace)?;
                    return Ok(Expr::Array {
                        elem_ty: Some(Type::single(elem)),
                        elements,
                        span: token.span.merge(&self.prev_span()),
                    });
                }

                let mut elements = Vec::new();
                while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
                    elements.push(self.parse_expr()?);
                    if !self.consume(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Expr::Array {
                    elem_ty: None,
                    elements,
                    span: token.span.merge(&self.prev_span()),
                })
            }
            _ => Err(Error::ExpectedExpr { span: token.span }),
        }
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            if self.consume(&TokenKind::Dot) {
                let name = self.parse_ident()?;
                let args = if self.check(&TokenKind::LParen) {
                    self.parse_call_args()?
                } else {
                    Vec::new()
                };
                let span = expr.span().merge(&self.prev_span());
                expr = Expr::Call(CallExpr {
                    on: Some(Box::new(expr)),
                    name,
                    args,
                    span,
                });
            } else if self.consume(&TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                let span = expr.span().merge(&self.prev_span());
                expr = Expr::Index {
                    expr: Box::new(expr),
                    index: Box::new(index),
                    span,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// `(label: expr, expr, ...)`; unlabeled arguments get the label `_`
    fn parse_call_args(&mut self) -> Result<Vec<CallArg>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            let label = match (self.current_kind(), self.peek_kind()) {
                (TokenKind::Ident(label), Some(TokenKind::Colon)) => {
                    let label = label.clone();
                    self.advance();
                    self.advance();
                    label
                }
                _ => "_".to_string(),
            };
            let value = self.parse_expr()?;
            args.push(CallArg { label, value, ty: None });
            if !self.consume(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn token_to_binop(token: &Token) -> Result<BinOp> {
        match token.kind {
            TokenKind::Plus => Ok(BinOp::Add),
            TokenKind::Minus => Ok(BinOp::Sub),
            TokenKind::Star => Ok(BinOp::Mul),
            TokenKind::Slash => Ok(BinOp::Div),
            TokenKind::Percent => Ok(BinOp::Mod),
            TokenKind::EqEq => Ok(BinOp::Eq),
            TokenKind::Ne => Ok(BinOp::Ne),
            TokenKind::Lt => Ok(BinOp::Lt),
            TokenKind::Le => Ok(BinOp::Le),
            TokenKind::Gt => Ok(BinOp::Gt),
            TokenKind::Ge => Ok(BinOp::Ge),
            TokenKind::And => Ok(BinOp::And),
            TokenKind::Or => Ok(BinOp::Or),
            _ => Err(Error::UnexpectedToken {
                expected: "binary operator".to_string(),
                got: format!("{:?}", token.kind),
                span: token.span,
            }),
        }
    }
}

/// Split the raw text of a string literal on every `${...}` in one
/// left-to-right scan, resolving escapes in the text between them. `offset`
/// is the char position of `raw` in its file. `\$` is a literal `$` and an
/// unclosed `${` is kept as text.
pub fn split_interpolations(raw: &str, file_id: usize, offset: usize) -> Result<Vec<StringPart>> {
    let chars: Vec<char> = raw.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                match chars.get(i + 1).copied() {
                    Some('n') => literal.push('\n'),
                    Some('r') => literal.push('\r'),
                    Some('t') => literal.push('\t'),
                    Some(c) => literal.push(c),
                    None => literal.push('\\'),
                }
                i += 2;
            }
            '$' if chars.get(i + 1) == Some(&'{') => {
                let start = i + 2;
                let Some(len) = matching_brace(&chars[start..]) else {
                    literal.push('$');
                    i += 1;
                    continue;
                };
                if !literal.is_empty() {
                    parts.push(StringPart::Text(std::mem::take(&mut literal)));
                }

                // Quotes inside an interpolation are written `\"`
                let source = chars[start..start + len].iter().collect::<String>().replace("\\\"", "\"");
                let mut parser = Parser::new(Lexer::with_offset(&source, file_id, offset + start));
                parts.push(StringPart::Interpolation(parser.parse_standalone_expr()?));
                i = start + len + 1;
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }

    if !literal.is_empty() || parts.is_empty() {
        parts.push(StringPart::Text(literal));
    }
    Ok(parts)
}

/// Index of the `}` closing an interpolation, allowing nested braces
fn matching_brace(chars: &[char]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in chars.iter().enumerate() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Program> {
        let lexer = Lexer::new(source, 0);
        let mut parser = Parser::new(lexer);
        parser.parse_program()
    }

    #[test]
    fn test_empty_function() {
        let program = parse("func main() {}").unwrap();
        assert_eq!(program.functions.len(), 1);
        assert!(program.functions[0].is_entry_point());
    }

    #[test]
    fn test_function_signature() {
        let program = parse("func circle.scale(by factor float) circle {\n return circle\n}").unwrap();
        let sig = &program.functions[0].sig;
        assert_eq!(sig.owner, Owner::Type("circle".into()));
        assert_eq!(sig.name, "scale");
        assert_eq!(sig.args[0].label, "by");
        assert_eq!(sig.args[0].binding(), "factor");
        assert_eq!(sig.args[0].ty, Some(Type::float()));
        assert_eq!(sig.ret, Some(Type::named("circle")));
    }

    #[test]
    fn test_union_argument() {
        let program = parse("func show(v (int | string)) {\n}").unwrap();
        let ty = program.functions[0].sig.args[0].ty.as_ref().unwrap();
        assert_eq!(ty.to_string(), "(int | string)");
    }

    #[test]
    fn test_extern_has_no_body() {
        let program = parse("extern func Array.length() int\nfunc main() {}").unwrap();
        assert_eq!(program.functions.len(), 2);
        assert!(program.functions[0].sig.is_extern);
    }

    #[test]
    fn test_type_decl() {
        let program = parse("type circle {\n  radius float\n  area() float\n  scale(by float) circle\n}").unwrap();
        let ty = &program.types[0];
        assert_eq!(ty.name, "circle");
        assert_eq!(ty.fields.len(), 3);
        assert_eq!(ty.fields[0].typed_prototype(), "circle.radius()");
        assert_eq!(ty.fields[0].ret, Some(Type::float()));
        assert_eq!(ty.fields[2].typed_prototype(), "circle.scale(by:float)");
    }

    #[test]
    fn test_statements() {
        let source = r#"
import io

mut total = 0

func main() {
    const limit = 10
    for i in 0..limit {
        if i == 3 {
            continue
        } else if i > 8 {
            break
        } else {
            total = total + i
        }
    }
    for total < 100 {
        total = total * 2
    }
    io.printLine("total=${total}")
}
"#;
        let program = parse(source).unwrap();
        assert_eq!(program.imports[0].name, "io");
        assert!(program.globals[0].mutable);
        let body = &program.functions[0].body;
        assert_eq!(body.len(), 4);
        assert!(matches!(body[1], Stmt::ForRange { .. }));
        assert!(matches!(body[2], Stmt::While { cond: Some(_), .. }));
        match &body[1] {
            Stmt::ForRange { body, .. } => match &body[0] {
                Stmt::If { branches, else_block, .. } => {
                    assert_eq!(branches.len(), 2);
                    assert!(else_block.is_some());
                }
                other => panic!("expected if, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_calls() {
        let program = parse("func main() {\n foo(x: 1, y: \"a\")\n c.area\n c.scale(by: 2.0)\n}").unwrap();
        let body = &program.functions[0].body;

        let Stmt::Expr(Expr::Call(foo)) = &body[0] else { panic!("expected call") };
        assert!(foo.on.is_none());
        assert_eq!(foo.labels(), vec!["x", "y"]);

        let Stmt::Expr(Expr::Call(area)) = &body[1] else { panic!("expected call") };
        assert!(matches!(area.on.as_deref(), Some(Expr::Ident { name, .. }) if name == "c"));
        assert!(area.args.is_empty());

        let Stmt::Expr(Expr::Call(scale)) = &body[2] else { panic!("expected call") };
        assert_eq!(scale.labels(), vec!["by"]);
    }

    #[test]
    fn test_new_and_arrays() {
        let program = parse("func main() {\n const c = new circle{radius: 5}\n const a = []float{1.5, 2}\n const b = [1, 2]\n}").unwrap();
        let body = &program.functions[0].body;
        match &body[0] {
            Stmt::Var { value: Expr::New { ty, fields, .. }, mutable, .. } => {
                assert_eq!(ty, "circle");
                assert_eq!(fields[0].0, "radius");
                assert!(!mutable);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(&body[1], Stmt::Var { value: Expr::Array { elem_ty: Some(_), .. }, .. }));
        assert!(matches!(&body[2], Stmt::Var { value: Expr::Array { elem_ty: None, .. }, .. }));
    }

    #[test]
    fn test_precedence() {
        let program = parse("func main() {\n x = 1 + 2 * 3 == 7 and not y\n}").unwrap();
        let Stmt::Assign { value, .. } = &program.functions[0].body[0] else { panic!() };
        let Expr::Binary { op: BinOp::And, left, right, .. } = value else { panic!("expected and") };
        assert!(matches!(**left, Expr::Binary { op: BinOp::Eq, .. }));
        assert!(matches!(**right, Expr::Unary { op: UnOp::Not, .. }));
    }

    #[test]
    fn test_negative_literal() {
        let program = parse("func main() {\n x = -3.5\n}").unwrap();
        let Stmt::Assign { value: Expr::Number { text, .. }, .. } = &program.functions[0].body[0] else { panic!() };
        assert_eq!(text, "-3.5");
    }

    #[test]
    fn test_split_interpolations() {
        let parts = split_interpolations("a=${x} b=${y.length}", 0, 0).unwrap();
        assert_eq!(parts.len(), 4);
        assert!(matches!(&parts[0], StringPart::Text(t) if t == "a="));
        assert!(matches!(&parts[1], StringPart::Interpolation(Expr::Ident { name, .. }) if name == "x"));
        assert!(matches!(&parts[2], StringPart::Text(t) if t == " b="));
        assert!(matches!(&parts[3], StringPart::Interpolation(Expr::Call(_))));

        let plain = split_interpolations("cost ${", 0, 0).unwrap();
        assert!(matches!(&plain[..], [StringPart::Text(t)] if t == "cost ${"));
    }

    #[test]
    fn test_string_escapes() {
        let parts = split_interpolations(r"price \${x}\n${y}", 0, 0).unwrap();
        assert!(matches!(&parts[0], StringPart::Text(t) if t == "price ${x}\n"));
        assert!(matches!(&parts[1], StringPart::Interpolation(Expr::Ident { name, .. }) if name == "y"));

        let quoted = split_interpolations(r#"${f(s: \"a\")}"#, 0, 0).unwrap();
        let [StringPart::Interpolation(Expr::Call(call))] = &quoted[..] else { panic!("expected call") };
        assert!(matches!(&call.args[0].value, Expr::String { parts, .. } if matches!(&parts[..], [StringPart::Text(t)] if t == "a")));
    }

    #[test]
    fn test_interpolation_error_position() {
        let source = "func main() {\n x = \"a ${1 +} b\"\n}";
        let err = parse(source).unwrap_err();
        let span = err.span().unwrap();
        // the `}` closing the interpolation, on line 2
        assert_eq!(span.line_col(source), (2, 14));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse("func main() { x = }"), Err(Error::ExpectedExpr { .. })));
        assert!(matches!(parse("func main() {\n x = \"open\n}"), Err(Error::UnterminatedString { .. })));
        assert!(matches!(parse("func main() { $ }"), Err(Error::UnexpectedChar { ch: '$', .. })));
        assert!(matches!(parse("x = 1"), Err(Error::UnexpectedToken { .. })));
    }
}
