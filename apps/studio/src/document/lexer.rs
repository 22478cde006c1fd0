//! Tokenizer for document fragments (a JSX-flavoured script subset).
//!
//! The parser drives the lexer in two modes: ordinary script tokens via
//! [`Lexer::next_token`], and JSX child content via [`Lexer::read_jsx_child`].
//! Text between tags follows different rules than script, so the lexer never
//! decides on its own which mode it is in.
//!
//! `>` is always emitted as a single-character token. The parser composes
//! `>=` from adjacent tokens so that a closing `>` of a JSX tag is never
//! swallowed into an operator.

use crate::document::compiler::CompileError;

/// Line/column of a token start, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Num(f64),
    /// Template literal: `quasis.len() == exprs.len() + 1`.
    /// Expressions are kept as raw source and parsed by a nested parser.
    Template {
        quasis: Vec<String>,
        exprs: Vec<(String, Position)>,
    },
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
    /// Char offsets, used to detect adjacency (`>` `=` → `>=`).
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(&self.kind, TokenKind::Punct(q) if *q == p)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(n) if n == name)
    }

    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Ident(n) => format!("identifier '{n}'"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Num(n) => format!("number {n}"),
            TokenKind::Template { .. } => "template literal".to_string(),
            TokenKind::Punct(p) => format!("'{p}'"),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

/// What the lexer found while reading JSX children.
#[derive(Debug, Clone, PartialEq)]
pub enum JsxChild {
    /// Raw text up to the next `<` or `{` (entities decoded, whitespace not yet normalized).
    Text(String),
    /// A `{` opening an expression container (consumed).
    OpenBrace,
    /// A `<` opening a child or closing tag (consumed).
    Lt,
    Eof,
}

// Longest first.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "...", "=>", "==", "!=", "<=", "&&", "||", "??", "?.", "{", "}", "(", ")", "[",
    "]", ";", ",", "<", ">", "+", "-", "*", "/", "%", "!", "?", ":", ".", "=",
];

#[derive(Debug, Clone, Copy)]
pub struct LexerState {
    pos: usize,
    line: u32,
    col: u32,
}

#[derive(Debug, Clone)]
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Self::with_origin(src, Position { line: 1, col: 1 })
    }

    /// Lexer for a nested source (template literal expression) whose
    /// positions should be reported relative to the outer fragment.
    pub fn with_origin(src: &str, origin: Position) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: origin.line,
            col: origin.col,
        }
    }

    pub fn state(&self) -> LexerState {
        LexerState {
            pos: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    pub fn restore(&mut self, state: LexerState) {
        self.pos = state.pos;
        self.line = state.line;
        self.col = state.col;
    }

    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
        }
    }

    /// True when the character right after the last token is `c`, with no
    /// trivia in between.
    pub fn next_char_is(&self, c: char) -> bool {
        self.peek_char() == Some(c)
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error_at(&self, pos: Position, message: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            line: pos.line,
            col: pos.col,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), CompileError> {
        loop {
            match (self.peek_char(), self.peek_char_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.position();
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek_char(), self.peek_char_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(self.error_at(start, "unterminated comment"));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_trivia()?;
        let pos = self.position();
        let start = self.pos;

        let Some(c) = self.peek_char() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                pos,
                start,
                end: start,
            });
        };

        let kind = if is_ident_start(c) {
            TokenKind::Ident(self.lex_ident())
        } else if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).is_some_and(|d| d.is_ascii_digit()))
        {
            TokenKind::Num(self.lex_number(pos)?)
        } else if c == '\'' || c == '"' {
            TokenKind::Str(self.lex_string(c, pos)?)
        } else if c == '`' {
            self.lex_template(pos)?
        } else {
            TokenKind::Punct(self.lex_punct(pos)?)
        };

        Ok(Token {
            kind,
            pos,
            start,
            end: self.pos,
        })
    }

    fn lex_ident(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek_char() {
            if is_ident_part(c) {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    fn lex_number(&mut self, pos: Position) -> Result<f64, CompileError> {
        if self.peek_char() == Some('0')
            && matches!(self.peek_char_at(1), Some('x') | Some('X'))
        {
            self.bump();
            self.bump();
            let mut digits = String::new();
            while let Some(c) = self.peek_char() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.bump();
                } else if c == '_' {
                    self.bump();
                } else {
                    break;
                }
            }
            return u64::from_str_radix(&digits, 16)
                .map(|n| n as f64)
                .map_err(|_| self.error_at(pos, "invalid hex literal"));
        }

        let mut text = String::new();
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '_' {
                // numeric separator
            } else if c == '.' && !seen_dot && !seen_exp {
                seen_dot = true;
                text.push(c);
            } else if (c == 'e' || c == 'E') && !seen_exp {
                seen_exp = true;
                text.push(c);
                if let Some(sign @ ('+' | '-')) = self.peek_char_at(1) {
                    self.bump();
                    text.push(sign);
                }
            } else {
                break;
            }
            self.bump();
        }
        text.parse::<f64>()
            .map_err(|_| self.error_at(pos, format!("invalid number literal '{text}'")))
    }

    fn lex_escape(&mut self, out: &mut String, pos: Position) -> Result<(), CompileError> {
        let Some(c) = self.bump() else {
            return Err(self.error_at(pos, "unterminated escape sequence"));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            '\n' => {}
            'x' => {
                let hex: String = (0..2).filter_map(|_| self.bump()).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| self.error_at(pos, "invalid \\x escape"))?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let hex: String = if self.peek_char() == Some('{') {
                    self.bump();
                    let mut h = String::new();
                    while let Some(d) = self.bump() {
                        if d == '}' {
                            break;
                        }
                        h.push(d);
                    }
                    h
                } else {
                    (0..4).filter_map(|_| self.bump()).collect()
                };
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| self.error_at(pos, "invalid \\u escape"))?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn lex_string(&mut self, quote: char, pos: Position) -> Result<String, CompileError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.lex_escape(&mut out, pos)?,
                Some('\n') | None => return Err(self.error_at(pos, "unterminated string literal")),
                Some(c) => out.push(c),
            }
        }
    }

    fn lex_template(&mut self, pos: Position) -> Result<TokenKind, CompileError> {
        self.bump();
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut current = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.error_at(pos, "unterminated template literal")),
                Some('`') => {
                    self.bump();
                    quasis.push(current);
                    return Ok(TokenKind::Template { quasis, exprs });
                }
                Some('\\') => {
                    self.bump();
                    self.lex_escape(&mut current, pos)?;
                }
                Some('$') if self.peek_char_at(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    quasis.push(std::mem::take(&mut current));
                    let expr_pos = self.position();
                    let raw = self.lex_template_expr(pos)?;
                    exprs.push((raw, expr_pos));
                }
                Some(c) => {
                    current.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Reads raw source up to the `}` closing a `${` substitution.
    fn lex_template_expr(&mut self, pos: Position) -> Result<String, CompileError> {
        let mut raw = String::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error_at(pos, "unterminated template substitution"));
            };
            match quote {
                Some(q) => {
                    raw.push(c);
                    if c == '\\' {
                        if let Some(next) = self.bump() {
                            raw.push(next);
                        }
                    } else if c == q {
                        quote = None;
                    }
                }
                None => match c {
                    '\'' | '"' | '`' => {
                        quote = Some(c);
                        raw.push(c);
                    }
                    '{' => {
                        depth += 1;
                        raw.push(c);
                    }
                    '}' if depth == 0 => return Ok(raw),
                    '}' => {
                        depth -= 1;
                        raw.push(c);
                    }
                    _ => raw.push(c),
                },
            }
        }
    }

    fn lex_punct(&mut self, pos: Position) -> Result<&'static str, CompileError> {
        for &p in PUNCTUATORS {
            let matches = p
                .chars()
                .enumerate()
                .all(|(i, pc)| self.peek_char_at(i) == Some(pc));
            if !matches {
                continue;
            }
            // `a ?.5 : b` is a conditional, not optional chaining.
            if p == "?." && self.peek_char_at(2).is_some_and(|c| c.is_ascii_digit()) {
                continue;
            }
            for _ in 0..p.chars().count() {
                self.bump();
            }
            return Ok(p);
        }
        let c = self.peek_char().unwrap_or(' ');
        Err(self.error_at(pos, format!("unexpected character '{c}'")))
    }

    /// Reads the next piece of JSX child content.
    pub fn read_jsx_child(&mut self) -> Result<JsxChild, CompileError> {
        match self.peek_char() {
            None => return Ok(JsxChild::Eof),
            Some('<') => {
                self.bump();
                return Ok(JsxChild::Lt);
            }
            Some('{') => {
                self.bump();
                return Ok(JsxChild::OpenBrace);
            }
            Some(_) => {}
        }

        let mut raw = String::new();
        while let Some(c) = self.peek_char() {
            if c == '<' || c == '{' {
                break;
            }
            raw.push(c);
            self.bump();
        }
        Ok(JsxChild::Text(decode_entities(&raw)))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Applies JSX whitespace rules: lines are trimmed where they meet a line
/// break, blank lines vanish, and the remaining lines join with one space.
pub fn normalize_jsx_text(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len().saturating_sub(1);
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut line = line.trim_end_matches('\r');
        if i != 0 {
            line = line.trim_start();
        }
        if i != last {
            line = line.trim_end();
        }
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&line.replace('\t', " "));
    }
    out
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "bull" => '•',
        "middot" => '·',
        "ndash" => '–',
        "mdash" => '—',
        "lbrace" => '{',
        "rbrace" => '}',
        _ => return None,
    })
}
