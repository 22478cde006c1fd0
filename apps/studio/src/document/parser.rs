//! Transpile step: document fragment source → [`Program`].
//!
//! A recursive-descent parser over the lexer in [`super::lexer`]. JSX is lowered
//! on the fly into [`Expr::CreateElement`] nodes, so nothing downstream ever
//! sees template syntax.

use std::rc::Rc;

use crate::document::ast::{
    BinaryOp, DeclKind, Expr, FunctionBody, FunctionDef, ListItem, LogicalOp, MemberProp,
    ObjectPatternProp, Pattern, PatternWithDefault, Program, PropItem, Stmt, UnaryOp,
};
use crate::document::compiler::CompileError;
use crate::document::lexer::{
    normalize_jsx_text, JsxChild, Lexer, LexerState, Position, Token, TokenKind,
};

/// Recursive constructs (groupings, elements, blocks, patterns) open at once.
const MAX_NESTING: u32 = 64;
/// Nesting plus operator and member links along one path of the tree.
const MAX_HEIGHT: u32 = 256;

/// Parses a whole fragment.
pub fn parse_program(source: &str) -> Result<Program, CompileError> {
    let mut parser = Parser::new(Lexer::new(source));
    let mut body = Vec::new();
    while !parser.at_eof()? {
        body.push(parser.parse_statement()?);
    }
    Ok(Program { body })
}

enum InfixOp {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

struct ParserState {
    lexer: LexerState,
    peeked: Option<Token>,
}

struct Parser {
    lexer: Lexer,
    peeked: Option<Token>,
    nesting: u32,
    height: u32,
}

impl Parser {
    fn new(lexer: Lexer) -> Self {
        Self {
            lexer,
            peeked: None,
            nesting: 0,
            height: 0,
        }
    }

    // ── token plumbing ──────────────────────────────────────────────────────

    fn peek(&mut self) -> Result<&Token, CompileError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn next(&mut self) -> Result<Token, CompileError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lexer.next_token(),
        }
    }

    fn at_eof(&mut self) -> Result<bool, CompileError> {
        Ok(self.peek()?.kind == TokenKind::Eof)
    }

    fn check_punct(&mut self, p: &str) -> Result<bool, CompileError> {
        Ok(self.peek()?.is_punct(p))
    }

    fn check_ident(&mut self, name: &str) -> Result<bool, CompileError> {
        Ok(self.peek()?.is_ident(name))
    }

    fn eat_punct(&mut self, p: &str) -> Result<bool, CompileError> {
        if self.check_punct(p)? {
            self.next()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn eat_ident(&mut self, name: &str) -> Result<bool, CompileError> {
        if self.check_ident(name)? {
            self.next()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expect_punct(&mut self, p: &str) -> Result<Token, CompileError> {
        let token = self.next()?;
        if token.is_punct(p) {
            Ok(token)
        } else {
            Err(error_at(
                token.pos,
                format!("expected '{p}' but found {}", token.describe()),
            ))
        }
    }

    fn expect_name(&mut self) -> Result<String, CompileError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Ident(name) => Ok(name),
            _ => Err(error_at(
                token.pos,
                format!("expected identifier but found {}", token.describe()),
            )),
        }
    }

    fn unexpected(token: &Token) -> CompileError {
        error_at(token.pos, format!("unexpected {}", token.describe()))
    }

    fn snapshot(&self) -> ParserState {
        ParserState {
            lexer: self.lexer.state(),
            peeked: self.peeked.clone(),
        }
    }

    fn restore(&mut self, state: ParserState) {
        self.lexer.restore(state.lexer);
        self.peeked = state.peeked;
    }

    /// Runs `parse` one level deeper, failing before the stack can run out.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if self.nesting >= MAX_NESTING {
            return Err(error_at(
                self.lexer.position(),
                format!("nesting deeper than {MAX_NESTING} levels"),
            ));
        }
        self.nesting += 1;
        self.height += 1;
        let result = match self.grown() {
            Ok(()) => parse(self),
            Err(err) => Err(err),
        };
        self.nesting -= 1;
        self.height -= 1;
        result
    }

    fn grown(&self) -> Result<(), CompileError> {
        if self.height > MAX_HEIGHT {
            return Err(error_at(
                self.lexer.position(),
                format!("expression chain deeper than {MAX_HEIGHT} levels"),
            ));
        }
        Ok(())
    }

    /// Counts one more operator or member link; the caller restores `height`.
    fn link(&mut self) -> Result<(), CompileError> {
        self.height += 1;
        self.grown()
    }

    fn eat_semicolons(&mut self) -> Result<(), CompileError> {
        while self.eat_punct(";")? {}
        Ok(())
    }

    // ── statements ──────────────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Stmt, CompileError> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, CompileError> {
        let token = self.peek()?.clone();
        let stmt = match &token.kind {
            TokenKind::Ident(word) => match word.as_str() {
                "import" => self.parse_import()?,
                "export" => self.parse_export()?,
                "const" | "let" | "var" => self.parse_var_decl()?,
                "function" => self.parse_function_decl()?,
                "return" => self.parse_return()?,
                "if" => self.parse_if()?,
                _ => Stmt::Expr(self.parse_expression()?),
            },
            TokenKind::Punct("{") => {
                self.next()?;
                Stmt::Block(self.parse_block_rest()?)
            }
            TokenKind::Punct(";") => {
                self.next()?;
                return Ok(Stmt::Empty);
            }
            TokenKind::Eof => return Err(Self::unexpected(&token)),
            _ => Stmt::Expr(self.parse_expression()?),
        };
        self.eat_semicolons()?;
        Ok(stmt)
    }

    /// Statements up to and including the closing `}` (opening `{` already consumed).
    fn parse_block_rest(&mut self) -> Result<Vec<Stmt>, CompileError> {
        let mut body = Vec::new();
        loop {
            if self.eat_punct("}")? {
                return Ok(body);
            }
            if self.at_eof()? {
                let token = self.peek()?.clone();
                return Err(error_at(token.pos, "expected '}' before end of input"));
            }
            body.push(self.parse_statement()?);
        }
    }

    fn parse_import(&mut self) -> Result<Stmt, CompileError> {
        self.next()?;
        let mut names = Vec::new();
        loop {
            let token = self.next()?;
            match token.kind {
                TokenKind::Str(module) => return Ok(Stmt::Import { names, module }),
                TokenKind::Ident(name) if name != "from" && name != "as" => names.push(name),
                TokenKind::Ident(_) | TokenKind::Punct("{" | "}" | "," | "*") => {}
                _ => return Err(Self::unexpected(&token)),
            }
        }
    }

    fn parse_export(&mut self) -> Result<Stmt, CompileError> {
        self.next()?;
        if self.eat_ident("default")? {
            if self.check_ident("function")? {
                let func = self.parse_function_expr()?;
                return Ok(match func.name.clone() {
                    Some(name) => Stmt::Export(Box::new(Stmt::FunctionDecl { name, func })),
                    None => Stmt::ExportDefault(Expr::Function(func)),
                });
            }
            return Ok(Stmt::ExportDefault(self.parse_expression()?));
        }
        Ok(Stmt::Export(Box::new(self.parse_statement()?)))
    }

    fn parse_var_decl(&mut self) -> Result<Stmt, CompileError> {
        let kind = match self.expect_name()?.as_str() {
            "const" => DeclKind::Const,
            "let" => DeclKind::Let,
            _ => DeclKind::Var,
        };
        let mut decls = Vec::new();
        loop {
            let pattern = self.parse_pattern()?;
            self.skip_type_annotation()?;
            let init = if self.eat_punct("=")? {
                Some(self.parse_expression()?)
            } else {
                None
            };
            decls.push((pattern, init));
            if !self.eat_punct(",")? {
                break;
            }
        }
        Ok(Stmt::VarDecl { kind, decls })
    }

    /// Skips a `: Type` annotation (fragments are sometimes emitted as TSX).
    fn skip_type_annotation(&mut self) -> Result<(), CompileError> {
        if !self.eat_punct(":")? {
            return Ok(());
        }
        let mut depth = 0i32;
        loop {
            let token = self.peek()?.clone();
            match &token.kind {
                TokenKind::Eof => return Err(Self::unexpected(&token)),
                TokenKind::Punct("<" | "(" | "[" | "{") => depth += 1,
                TokenKind::Punct(">" | ")" | "]" | "}") if depth > 0 => depth -= 1,
                TokenKind::Punct("=" | "," | ")") if depth == 0 => return Ok(()),
                _ => {}
            }
            self.next()?;
        }
    }

    fn parse_function_decl(&mut self) -> Result<Stmt, CompileError> {
        let pos = self.peek()?.pos;
        let func = self.parse_function_expr()?;
        match func.name.clone() {
            Some(name) => Ok(Stmt::FunctionDecl { name, func }),
            None => Err(error_at(pos, "function declaration requires a name")),
        }
    }

    /// `function [name](params) { body }`
    fn parse_function_expr(&mut self) -> Result<Rc<FunctionDef>, CompileError> {
        self.next()?;
        let name = match &self.peek()?.kind {
            TokenKind::Ident(_) => Some(self.expect_name()?),
            _ => None,
        };
        let params = self.parse_params()?;
        self.skip_type_annotation_before_body()?;
        self.expect_punct("{")?;
        let body = self.parse_block_rest()?;
        Ok(Rc::new(FunctionDef {
            name,
            params,
            body: FunctionBody::Block(body),
        }))
    }

    fn skip_type_annotation_before_body(&mut self) -> Result<(), CompileError> {
        if !self.eat_punct(":")? {
            return Ok(());
        }
        while !self.check_punct("{")? && !self.check_punct("=>")? {
            if self.at_eof()? {
                let token = self.peek()?.clone();
                return Err(Self::unexpected(&token));
            }
            self.next()?;
        }
        Ok(())
    }

    fn parse_params(&mut self) -> Result<Vec<PatternWithDefault>, CompileError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        loop {
            if self.eat_punct(")")? {
                return Ok(params);
            }
            params.push(self.parse_pattern_with_default()?);
            if !self.eat_punct(",")? {
                self.expect_punct(")")?;
                return Ok(params);
            }
        }
    }

    fn parse_return(&mut self) -> Result<Stmt, CompileError> {
        self.next()?;
        let token = self.peek()?;
        if token.is_punct(";") || token.is_punct("}") || token.kind == TokenKind::Eof {
            return Ok(Stmt::Return(None));
        }
        Ok(Stmt::Return(Some(self.parse_expression()?)))
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        self.next()?;
        self.expect_punct("(")?;
        let test = self.parse_expression()?;
        self.expect_punct(")")?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat_ident("else")? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    // ── patterns ────────────────────────────────────────────────────────────

    fn parse_pattern(&mut self) -> Result<Pattern, CompileError> {
        self.nested(Self::parse_pattern_inner)
    }

    fn parse_pattern_inner(&mut self) -> Result<Pattern, CompileError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Ident(name) => Ok(Pattern::Ident(name)),
            TokenKind::Punct("{") => {
                let mut props = Vec::new();
                let mut rest = None;
                loop {
                    if self.eat_punct("}")? {
                        break;
                    }
                    if self.eat_punct("...")? {
                        rest = Some(self.expect_name()?);
                    } else {
                        let key = self.expect_name()?;
                        let pattern = if self.eat_punct(":")? {
                            self.parse_pattern()?
                        } else {
                            Pattern::Ident(key.clone())
                        };
                        let default = if self.eat_punct("=")? {
                            Some(self.parse_expression()?)
                        } else {
                            None
                        };
                        props.push(ObjectPatternProp {
                            key,
                            value: PatternWithDefault { pattern, default },
                        });
                    }
                    if !self.eat_punct(",")? {
                        self.expect_punct("}")?;
                        break;
                    }
                }
                Ok(Pattern::Object { props, rest })
            }
            TokenKind::Punct("[") => {
                let mut items = Vec::new();
                loop {
                    if self.eat_punct("]")? {
                        break;
                    }
                    if self.eat_punct(",")? {
                        items.push(None);
                        continue;
                    }
                    items.push(Some(self.parse_pattern_with_default()?));
                    if !self.eat_punct(",")? {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Pattern::Array(items))
            }
            _ => Err(Self::unexpected(&token)),
        }
    }

    fn parse_pattern_with_default(&mut self) -> Result<PatternWithDefault, CompileError> {
        let pattern = self.parse_pattern()?;
        self.skip_type_annotation()?;
        let default = if self.eat_punct("=")? {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(PatternWithDefault { pattern, default })
    }

    // ── expressions ─────────────────────────────────────────────────────────

    fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        self.nested(Self::parse_conditional)
    }

    fn parse_conditional(&mut self) -> Result<Expr, CompileError> {
        let test = self.parse_binary(1)?;
        if !self.eat_punct("?")? {
            return Ok(test);
        }
        let consequent = self.parse_expression()?;
        self.expect_punct(":")?;
        let alternate = self.parse_expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    /// Returns the infix operator at the cursor, its precedence, and whether it
    /// is a `>=` composed from two tokens.
    fn peek_infix(&mut self) -> Result<Option<(InfixOp, u8, bool)>, CompileError> {
        let token = self.peek()?;
        let TokenKind::Punct(p) = token.kind else {
            return Ok(None);
        };
        let op = match p {
            "??" => (InfixOp::Logical(LogicalOp::Nullish), 1, false),
            "||" => (InfixOp::Logical(LogicalOp::Or), 2, false),
            "&&" => (InfixOp::Logical(LogicalOp::And), 3, false),
            "===" => (InfixOp::Binary(BinaryOp::StrictEq), 6, false),
            "!==" => (InfixOp::Binary(BinaryOp::StrictNe), 6, false),
            "==" => (InfixOp::Binary(BinaryOp::LooseEq), 6, false),
            "!=" => (InfixOp::Binary(BinaryOp::LooseNe), 6, false),
            "<" => (InfixOp::Binary(BinaryOp::Lt), 7, false),
            "<=" => (InfixOp::Binary(BinaryOp::Le), 7, false),
            ">" if self.lexer.next_char_is('=') => (InfixOp::Binary(BinaryOp::Ge), 7, true),
            ">" => (InfixOp::Binary(BinaryOp::Gt), 7, false),
            "+" => (InfixOp::Binary(BinaryOp::Add), 9, false),
            "-" => (InfixOp::Binary(BinaryOp::Sub), 9, false),
            "*" => (InfixOp::Binary(BinaryOp::Mul), 10, false),
            "/" => (InfixOp::Binary(BinaryOp::Div), 10, false),
            "%" => (InfixOp::Binary(BinaryOp::Rem), 10, false),
            _ => return Ok(None),
        };
        Ok(Some(op))
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr, CompileError> {
        let height = self.height;
        let result = self.parse_binary_chain(min_prec);
        self.height = height;
        result
    }

    fn parse_binary_chain(&mut self, min_prec: u8) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        while let Some((op, prec, composed)) = self.peek_infix()? {
            if prec < min_prec {
                break;
            }
            self.link()?;
            self.next()?;
            if composed {
                self.expect_punct("=")?;
            }
            let right = self.parse_binary(prec + 1)?;
            left = match op {
                InfixOp::Binary(op) => Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                InfixOp::Logical(op) => Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let op = {
            let token = self.peek()?;
            if token.is_punct("!") {
                Some(UnaryOp::Not)
            } else if token.is_punct("-") {
                Some(UnaryOp::Neg)
            } else if token.is_punct("+") {
                Some(UnaryOp::Plus)
            } else if token.is_ident("typeof") {
                Some(UnaryOp::TypeOf)
            } else {
                None
            }
        };
        match op {
            Some(op) => {
                self.next()?;
                let arg = self.nested(Self::parse_unary)?;
                Ok(Expr::Unary {
                    op,
                    arg: Box::new(arg),
                })
            }
            None => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let height = self.height;
        let result = self.parse_postfix_chain();
        self.height = height;
        result
    }

    fn parse_postfix_chain(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            self.link()?;
            if self.eat_punct(".")? {
                let name = self.expect_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: MemberProp::Name(name),
                    optional: false,
                };
            } else if self.eat_punct("?.")? {
                if self.check_punct("(")? {
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: true,
                    };
                } else if self.eat_punct("[")? {
                    let index = self.parse_expression()?;
                    self.expect_punct("]")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: MemberProp::Computed(Box::new(index)),
                        optional: true,
                    };
                } else {
                    let name = self.expect_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: MemberProp::Name(name),
                        optional: true,
                    };
                }
            } else if self.eat_punct("[")? {
                let index = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property: MemberProp::Computed(Box::new(index)),
                    optional: false,
                };
            } else if self.check_punct("(")? {
                let args = self.parse_arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    optional: false,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<ListItem>, CompileError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        loop {
            if self.eat_punct(")")? {
                return Ok(args);
            }
            if self.eat_punct("...")? {
                args.push(ListItem::Spread(self.parse_expression()?));
            } else {
                args.push(ListItem::Item(self.parse_expression()?));
            }
            if !self.eat_punct(",")? {
                self.expect_punct(")")?;
                return Ok(args);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let token = self.peek()?.clone();
        match &token.kind {
            TokenKind::Num(n) => {
                self.next()?;
                Ok(Expr::Num(*n))
            }
            TokenKind::Str(s) => {
                self.next()?;
                Ok(Expr::Str(s.clone()))
            }
            TokenKind::Template { quasis, exprs } => {
                self.next()?;
                let exprs = exprs
                    .iter()
                    .map(|(raw, pos)| self.parse_substitution(raw, *pos))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Template {
                    quasis: quasis.clone(),
                    exprs,
                })
            }
            TokenKind::Ident(name) => match name.as_str() {
                "true" => {
                    self.next()?;
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.next()?;
                    Ok(Expr::Bool(false))
                }
                "null" => {
                    self.next()?;
                    Ok(Expr::Null)
                }
                "undefined" => {
                    self.next()?;
                    Ok(Expr::Undefined)
                }
                "function" => Ok(Expr::Function(self.parse_function_expr()?)),
                _ => {
                    let name = self.expect_name()?;
                    if self.eat_punct("=>")? {
                        let params = vec![PatternWithDefault {
                            pattern: Pattern::Ident(name),
                            default: None,
                        }];
                        return self.parse_arrow_body(params);
                    }
                    Ok(Expr::Ident(name))
                }
            },
            TokenKind::Punct("(") => {
                if let Some(arrow) = self.try_parse_arrow()? {
                    return Ok(arrow);
                }
                self.next()?;
                let inner = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            TokenKind::Punct("[") => {
                self.next()?;
                self.parse_array_rest()
            }
            TokenKind::Punct("{") => {
                self.next()?;
                self.parse_object_rest()
            }
            TokenKind::Punct("<") => {
                self.next()?;
                self.parse_jsx_after_lt()
            }
            _ => Err(Self::unexpected(&token)),
        }
    }

    /// Attempts `(params) => body`; rewinds and returns `None` when the
    /// parenthesis turns out to be an ordinary grouping.
    fn try_parse_arrow(&mut self) -> Result<Option<Expr>, CompileError> {
        let snapshot = self.snapshot();
        let params = match self.parse_params() {
            Ok(params) => params,
            Err(_) => {
                self.restore(snapshot);
                return Ok(None);
            }
        };
        if self.skip_type_annotation_before_body().is_err() || !self.check_punct("=>")? {
            self.restore(snapshot);
            return Ok(None);
        }
        self.next()?;
        self.parse_arrow_body(params).map(Some)
    }

    fn parse_arrow_body(&mut self, params: Vec<PatternWithDefault>) -> Result<Expr, CompileError> {
        let body = if self.eat_punct("{")? {
            FunctionBody::Block(self.parse_block_rest()?)
        } else {
            FunctionBody::Expr(Box::new(self.parse_expression()?))
        };
        Ok(Expr::Function(Rc::new(FunctionDef {
            name: None,
            params,
            body,
        })))
    }

    fn parse_array_rest(&mut self) -> Result<Expr, CompileError> {
        let mut items = Vec::new();
        loop {
            if self.eat_punct("]")? {
                return Ok(Expr::Array(items));
            }
            if self.eat_punct(",")? {
                items.push(ListItem::Hole);
                continue;
            }
            if self.eat_punct("...")? {
                items.push(ListItem::Spread(self.parse_expression()?));
            } else {
                items.push(ListItem::Item(self.parse_expression()?));
            }
            if !self.eat_punct(",")? {
                self.expect_punct("]")?;
                return Ok(Expr::Array(items));
            }
        }
    }

    fn parse_object_rest(&mut self) -> Result<Expr, CompileError> {
        let mut props = Vec::new();
        loop {
            if self.eat_punct("}")? {
                return Ok(Expr::Object(props));
            }
            if self.eat_punct("...")? {
                props.push(PropItem::Spread(self.parse_expression()?));
            } else {
                let token = self.next()?;
                let (key, shorthand_ok) = match token.kind {
                    TokenKind::Ident(name) => (name, true),
                    TokenKind::Str(s) => (s, false),
                    TokenKind::Num(n) => (format_key(n), false),
                    _ => return Err(Self::unexpected(&token)),
                };
                if self.eat_punct(":")? {
                    props.push(PropItem::KeyValue(key, self.parse_expression()?));
                } else if self.check_punct("(")? {
                    let params = self.parse_params()?;
                    self.expect_punct("{")?;
                    let body = self.parse_block_rest()?;
                    props.push(PropItem::KeyValue(
                        key.clone(),
                        Expr::Function(Rc::new(FunctionDef {
                            name: Some(key),
                            params,
                            body: FunctionBody::Block(body),
                        })),
                    ));
                } else if shorthand_ok {
                    props.push(PropItem::KeyValue(key.clone(), Expr::Ident(key)));
                } else {
                    return Err(error_at(token.pos, "expected ':' after property key"));
                }
            }
            if !self.eat_punct(",")? {
                self.expect_punct("}")?;
                return Ok(Expr::Object(props));
            }
        }
    }

    /// A template `${...}` body, parsed at the current depth.
    fn parse_substitution(&self, raw: &str, origin: Position) -> Result<Expr, CompileError> {
        let mut parser = Parser::new(Lexer::with_origin(raw, origin));
        parser.nesting = self.nesting;
        parser.height = self.height;
        let expr = parser.parse_expression()?;
        if !parser.at_eof()? {
            let token = parser.peek()?.clone();
            return Err(Self::unexpected(&token));
        }
        Ok(expr)
    }

    // ── JSX ─────────────────────────────────────────────────────────────────

    /// Parses an element whose `<` has already been consumed.
    fn parse_jsx_after_lt(&mut self) -> Result<Expr, CompileError> {
        self.nested(Self::parse_jsx_element)
    }

    fn parse_jsx_element(&mut self) -> Result<Expr, CompileError> {
        if self.eat_punct(">")? {
            let children = self.parse_jsx_children(None)?;
            return Ok(Expr::CreateElement {
                tag: None,
                props: Vec::new(),
                children,
            });
        }

        let (name, tag) = self.parse_jsx_name()?;
        let mut props = Vec::new();
        loop {
            if self.eat_punct("/")? {
                self.expect_punct(">")?;
                return Ok(Expr::CreateElement {
                    tag: Some(Box::new(tag)),
                    props,
                    children: Vec::new(),
                });
            }
            if self.eat_punct(">")? {
                break;
            }
            if self.eat_punct("{")? {
                self.expect_punct("...")?;
                let spread = self.parse_expression()?;
                self.expect_punct("}")?;
                props.push(PropItem::Spread(spread));
                continue;
            }
            let attr = self.expect_name()?;
            let value = if self.eat_punct("=")? {
                let token = self.next()?;
                match token.kind {
                    TokenKind::Str(s) => Expr::Str(s),
                    TokenKind::Punct("{") => {
                        let value = self.parse_expression()?;
                        self.expect_punct("}")?;
                        value
                    }
                    TokenKind::Punct("<") => self.parse_jsx_after_lt()?,
                    _ => return Err(Self::unexpected(&token)),
                }
            } else {
                Expr::Bool(true)
            };
            props.push(PropItem::KeyValue(attr, value));
        }

        let children = self.parse_jsx_children(Some(&name))?;
        Ok(Expr::CreateElement {
            tag: Some(Box::new(tag)),
            props,
            children,
        })
    }

    /// `Name` or `Namespace.Name`. Lower-case single names are intrinsic
    /// tags and become string literals, mirroring JSX semantics.
    fn parse_jsx_name(&mut self) -> Result<(String, Expr), CompileError> {
        let first = self.expect_name()?;
        let mut full = first.clone();
        let mut expr = Expr::Ident(first.clone());
        let mut dotted = false;
        while self.eat_punct(".")? {
            let part = self.expect_name()?;
            full.push('.');
            full.push_str(&part);
            expr = Expr::Member {
                object: Box::new(expr),
                property: MemberProp::Name(part),
                optional: false,
            };
            dotted = true;
        }
        if !dotted && first.starts_with(|c: char| c.is_ascii_lowercase()) {
            expr = Expr::Str(first);
        }
        Ok((full, expr))
    }

    fn parse_jsx_children(&mut self, name: Option<&str>) -> Result<Vec<Expr>, CompileError> {
        debug_assert!(self.peeked.is_none(), "JSX children must start unbuffered");
        let mut children = Vec::new();
        loop {
            let pos = self.lexer.position();
            match self.lexer.read_jsx_child()? {
                JsxChild::Text(raw) => {
                    let text = normalize_jsx_text(&raw);
                    if !text.is_empty() {
                        children.push(Expr::Str(text));
                    }
                }
                JsxChild::OpenBrace => {
                    if self.eat_punct("}")? {
                        continue;
                    }
                    let expr = self.parse_expression()?;
                    self.expect_punct("}")?;
                    children.push(expr);
                }
                JsxChild::Lt => {
                    if self.eat_punct("/")? {
                        let closing = if self.check_punct(">")? {
                            None
                        } else {
                            Some(self.parse_jsx_name()?.0)
                        };
                        let token = self.expect_punct(">")?;
                        if closing.as_deref() != name {
                            return Err(error_at(
                                token.pos,
                                format!(
                                    "expected closing tag </{}> but found </{}>",
                                    name.unwrap_or(""),
                                    closing.as_deref().unwrap_or("")
                                ),
                            ));
                        }
                        return Ok(children);
                    }
                    children.push(self.parse_jsx_after_lt()?);
                }
                JsxChild::Eof => {
                    return Err(error_at(
                        pos,
                        format!("unterminated element <{}>", name.unwrap_or("")),
                    ));
                }
            }
        }
    }
}


fn format_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn error_at(pos: Position, message: impl Into<String>) -> CompileError {
    CompileError::Syntax {
        line: pos.line,
        col: pos.col,
        message: message.into(),
    }
}
