//! Tree-walking evaluator for compiled fragments.
//!
//! Values are reference counted and single-threaded. A compiled document, its
//! interpreter and every value it produced live and die on one blocking
//! thread.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::document::ast::{
    BinaryOp, DeclKind, Expr, FunctionBody, FunctionDef, ListItem, LogicalOp, MemberProp, Pattern,
    PatternWithDefault, PropItem, Stmt, UnaryOp,
};
use crate::document::capabilities::{self, Primitive};

const DEFAULT_MAX_STEPS: u64 = 1_000_000;
const DEFAULT_MAX_DEPTH: u32 = 64;
/// Combined statement and expression frames, across calls.
const DEFAULT_MAX_NESTING: u32 = 256;
/// Arrays nested deeper than this print as empty.
const MAX_DISPLAY_DEPTH: u32 = 64;

pub const MAX_STRING_BYTES: usize = 1 << 20;
pub const MAX_ARRAY_LEN: usize = 100_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("ReferenceError: {0} is not defined")]
    Undefined(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("evaluation exceeded {0} steps")]
    StepLimit(u64),

    #[error("maximum call depth of {0} exceeded")]
    CallDepth(u32),

    #[error("evaluation nested deeper than {0} levels")]
    Nesting(u32),

    #[error("RangeError: {0} exceeds the maximum size")]
    TooLarge(&'static str),

    #[error("{0}")]
    Element(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Values
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<Object>),
    Function(Rc<Closure>),
    Builtin(Builtin),
    Element(Rc<Element>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Builtin(_) => "function",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Element(_) => "object",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// String conversion as template literals and `+` perform it.
    ///
    /// Output stops growing once it passes [`MAX_STRING_BYTES`]; callers that
    /// keep the result check its size.
    pub fn to_display_string(&self) -> String {
        let mut out = String::new();
        self.write_display(&mut out, 0);
        out
    }

    fn write_display(&self, out: &mut String, depth: u32) {
        match self {
            Value::Undefined => out.push_str("undefined"),
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&number_to_string(*n)),
            Value::Str(s) => out.push_str(s),
            Value::Array(items) => {
                if depth >= MAX_DISPLAY_DEPTH {
                    return;
                }
                for (i, v) in items.iter().enumerate() {
                    if out.len() > MAX_STRING_BYTES {
                        return;
                    }
                    if i > 0 {
                        out.push(',');
                    }
                    if !v.is_nullish() {
                        v.write_display(out, depth + 1);
                    }
                }
            }
            Value::Function(_) | Value::Builtin(_) => out.push_str("function"),
            Value::Object(_) | Value::Element(_) => out.push_str("[object Object]"),
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

/// Insertion-ordered property bag.
#[derive(Debug, Clone, Default)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

}

pub struct Closure {
    pub def: Rc<FunctionDef>,
    env: Rc<Scope>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function {}]", self.def.name.as_deref().unwrap_or("anonymous"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Map,
    Filter,
    Join,
    Concat,
    Slice,
    Includes,
    ToUpperCase,
    ToLowerCase,
    Trim,
    Split,
    ToString,
}

impl Method {
    fn for_array(name: &str) -> Option<Self> {
        Some(match name {
            "map" => Method::Map,
            "filter" => Method::Filter,
            "join" => Method::Join,
            "concat" => Method::Concat,
            "slice" => Method::Slice,
            "includes" => Method::Includes,
            "toString" => Method::ToString,
            _ => return None,
        })
    }

    fn for_string(name: &str) -> Option<Self> {
        Some(match name {
            "toUpperCase" => Method::ToUpperCase,
            "toLowerCase" => Method::ToLowerCase,
            "trim" => Method::Trim,
            "split" => Method::Split,
            "slice" => Method::Slice,
            "includes" => Method::Includes,
            "concat" => Method::Concat,
            "toString" => Method::ToString,
            _ => return None,
        })
    }
}

/// Host-implemented callables.
#[derive(Debug, Clone)]
pub enum Builtin {
    Primitive(Primitive),
    Fragment,
    CreateElement,
    StyleSheetCreate,
    Method { receiver: Rc<Value>, method: Method },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Primitive(Primitive),
    Fragment,
}

/// Output of `createElement` for host primitives. Component functions never
/// appear here; they are called when their element is created.
#[derive(Debug, Clone)]
pub struct Element {
    pub kind: ElementKind,
    pub props: Rc<Object>,
    pub children: Vec<Value>,
}

// ────────────────────────────────────────────────────────────────────────────
// Scopes
// ────────────────────────────────────────────────────────────────────────────

struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.vars.borrow().get(name) {
            return Some(v.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    fn define(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }
}

enum Flow {
    Normal,
    Return(Value),
}

// ────────────────────────────────────────────────────────────────────────────
// Interpreter
// ────────────────────────────────────────────────────────────────────────────

pub struct Interpreter {
    steps: Cell<u64>,
    max_steps: u64,
    depth: Cell<u32>,
    max_depth: u32,
    nesting: Cell<u32>,
    max_nesting: u32,
    // Every scope ever created, so closures' reference cycles can be broken on drop.
    scopes: RefCell<Vec<Rc<Scope>>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_STEPS, DEFAULT_MAX_DEPTH)
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        for scope in self.scopes.borrow().iter() {
            scope.vars.borrow_mut().clear();
        }
    }
}

impl Interpreter {
    pub fn with_limits(max_steps: u64, max_depth: u32) -> Self {
        Self {
            steps: Cell::new(0),
            max_steps,
            depth: Cell::new(0),
            max_depth,
            nesting: Cell::new(0),
            max_nesting: DEFAULT_MAX_NESTING,
            scopes: RefCell::new(Vec::new()),
        }
    }

    fn new_scope(&self, parent: Option<Rc<Scope>>) -> Rc<Scope> {
        let scope = Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent,
        });
        self.scopes.borrow_mut().push(Rc::clone(&scope));
        scope
    }

    /// Turns a function definition into a callable closed over an empty
    /// global scope. Nothing but its parameters is visible inside.
    pub fn instantiate(&self, def: Rc<FunctionDef>) -> Value {
        let env = self.new_scope(None);
        Value::Function(Rc::new(Closure { def, env }))
    }

    fn tick(&self) -> Result<(), EvalError> {
        let steps = self.steps.get() + 1;
        if steps > self.max_steps {
            return Err(EvalError::StepLimit(self.max_steps));
        }
        self.steps.set(steps);
        Ok(())
    }

    /// Runs `f` one frame deeper, failing instead of exhausting the stack.
    fn nested<T>(&self, f: impl FnOnce() -> Result<T, EvalError>) -> Result<T, EvalError> {
        let nesting = self.nesting.get() + 1;
        if nesting > self.max_nesting {
            return Err(EvalError::Nesting(self.max_nesting));
        }
        self.nesting.set(nesting);
        let result = f();
        self.nesting.set(nesting - 1);
        result
    }

    // ── calls ───────────────────────────────────────────────────────────────

    pub fn call(&self, callee: &Value, args: Vec<Value>) -> Result<Value, EvalError> {
        match callee {
            Value::Function(closure) => self.call_closure(closure, args),
            Value::Builtin(builtin) => self.call_builtin(builtin, args),
            other => Err(EvalError::Type(format!(
                "{} is not a function",
                describe_value(other)
            ))),
        }
    }

    fn call_closure(&self, closure: &Rc<Closure>, args: Vec<Value>) -> Result<Value, EvalError> {
        let depth = self.depth.get() + 1;
        if depth > self.max_depth {
            return Err(EvalError::CallDepth(self.max_depth));
        }
        self.depth.set(depth);
        let result = self.run_closure(closure, args);
        self.depth.set(depth - 1);
        result
    }

    fn run_closure(&self, closure: &Rc<Closure>, args: Vec<Value>) -> Result<Value, EvalError> {
        let scope = self.new_scope(Some(Rc::clone(&closure.env)));
        let mut args = args.into_iter();
        for param in &closure.def.params {
            let arg = args.next().unwrap_or(Value::Undefined);
            self.bind_with_default(&scope, param, arg)?;
        }
        match &closure.def.body {
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
            FunctionBody::Block(stmts) => match self.exec_block(stmts, &scope)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Undefined),
            },
        }
    }

    fn call_builtin(&self, builtin: &Builtin, args: Vec<Value>) -> Result<Value, EvalError> {
        match builtin {
            Builtin::CreateElement => {
                let mut args = args.into_iter();
                let tag = args.next().unwrap_or(Value::Undefined);
                let props = match args.next() {
                    Some(Value::Object(obj)) => (*obj).clone(),
                    Some(Value::Null | Value::Undefined) | None => Object::new(),
                    Some(other) => {
                        return Err(EvalError::Type(format!(
                            "createElement props must be an object, got {}",
                            describe_value(&other)
                        )))
                    }
                };
                self.create_element(tag, props, args.collect())
            }
            Builtin::StyleSheetCreate => capabilities::stylesheet_create(args),
            Builtin::Primitive(p) => Err(EvalError::Type(format!(
                "{} cannot be called as a function",
                p.name()
            ))),
            Builtin::Fragment => Err(EvalError::Type(
                "Fragment cannot be called as a function".to_string(),
            )),
            Builtin::Method { receiver, method } => self.call_method(receiver, *method, args),
        }
    }

    /// `React.createElement` semantics. Component functions run immediately
    /// with `children` folded into their props.
    pub fn create_element(
        &self,
        tag: Value,
        mut props: Object,
        children: Vec<Value>,
    ) -> Result<Value, EvalError> {
        match tag {
            Value::Function(_) => {
                match children.len() {
                    0 => {}
                    1 => props.set("children", children.into_iter().next().unwrap_or(Value::Undefined)),
                    _ => props.set("children", Value::Array(Rc::new(children))),
                }
                self.call(&tag, vec![Value::Object(Rc::new(props))])
            }
            Value::Builtin(Builtin::Primitive(p)) => Ok(Value::Element(Rc::new(Element {
                kind: ElementKind::Primitive(p),
                props: Rc::new(props),
                children,
            }))),
            Value::Builtin(Builtin::Fragment) => Ok(Value::Element(Rc::new(Element {
                kind: ElementKind::Fragment,
                props: Rc::new(props),
                children,
            }))),
            Value::Str(name) => Err(EvalError::Element(format!(
                "unsupported element type <{name}>"
            ))),
            other => Err(EvalError::Element(format!(
                "element type is invalid: expected a component but got {}",
                describe_value(&other)
            ))),
        }
    }

    fn call_method(
        &self,
        receiver: &Value,
        method: Method,
        args: Vec<Value>,
    ) -> Result<Value, EvalError> {
        match receiver {
            Value::Array(items) => self.call_array_method(items, method, args),
            Value::Str(s) => call_string_method(s, method, &args),
            other => match method {
                Method::ToString => checked_size(Value::str(&other.to_display_string())),
                _ => Err(EvalError::Type(format!(
                    "method is not available on {}",
                    describe_value(other)
                ))),
            },
        }
    }

    fn call_array_method(
        &self,
        items: &Rc<Vec<Value>>,
        method: Method,
        args: Vec<Value>,
    ) -> Result<Value, EvalError> {
        let arg0 = args.first().cloned().unwrap_or(Value::Undefined);
        match method {
            Method::Map => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    self.tick()?;
                    out.push(self.call(
                        &arg0,
                        vec![item.clone(), Value::Number(i as f64), Value::Array(Rc::clone(items))],
                    )?);
                }
                Ok(Value::Array(Rc::new(out)))
            }
            Method::Filter => {
                let mut out = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    self.tick()?;
                    let keep = self.call(
                        &arg0,
                        vec![item.clone(), Value::Number(i as f64), Value::Array(Rc::clone(items))],
                    )?;
                    if keep.truthy() {
                        out.push(item.clone());
                    }
                }
                Ok(Value::Array(Rc::new(out)))
            }
            Method::Join => {
                let sep = match &arg0 {
                    Value::Undefined => ",".to_string(),
                    other => other.to_display_string(),
                };
                let mut out = String::new();
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        push_bounded(&mut out, &sep)?;
                    }
                    if !v.is_nullish() {
                        push_bounded(&mut out, &v.to_display_string())?;
                    }
                }
                Ok(Value::str(&out))
            }
            Method::Concat => {
                let mut out: Vec<Value> = items.as_ref().clone();
                for arg in args {
                    match arg {
                        Value::Array(more) => out.extend(more.iter().cloned()),
                        other => out.push(other),
                    }
                    if out.len() > MAX_ARRAY_LEN {
                        return Err(EvalError::TooLarge("array"));
                    }
                }
                Ok(Value::Array(Rc::new(out)))
            }
            Method::Slice => {
                let (start, end) = slice_bounds(items.len(), &args);
                Ok(Value::Array(Rc::new(items[start..end].to_vec())))
            }
            Method::Includes => Ok(Value::Bool(
                items.iter().any(|item| strict_equals(item, &arg0)),
            )),
            Method::ToString => {
                checked_size(Value::str(&Value::Array(Rc::clone(items)).to_display_string()))
            }
            _ => Err(EvalError::Type("method is not available on arrays".to_string())),
        }
    }

    // ── statements ──────────────────────────────────────────────────────────

    fn exec_block(&self, stmts: &[Stmt], scope: &Rc<Scope>) -> Result<Flow, EvalError> {
        self.hoist_functions(stmts, scope);
        for stmt in stmts {
            if let Flow::Return(value) = self.exec(stmt, scope)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn hoist_functions(&self, stmts: &[Stmt], scope: &Rc<Scope>) {
        for stmt in stmts {
            let decl = match stmt {
                Stmt::Export(inner) => inner.as_ref(),
                other => other,
            };
            if let Stmt::FunctionDecl { name, func } = decl {
                scope.define(
                    name,
                    Value::Function(Rc::new(Closure {
                        def: Rc::clone(func),
                        env: Rc::clone(scope),
                    })),
                );
            }
        }
    }

    fn exec(&self, stmt: &Stmt, scope: &Rc<Scope>) -> Result<Flow, EvalError> {
        self.tick()?;
        self.nested(|| self.exec_stmt(stmt, scope))
    }

    fn exec_stmt(&self, stmt: &Stmt, scope: &Rc<Scope>) -> Result<Flow, EvalError> {
        match stmt {
            Stmt::Import { .. } | Stmt::ExportDefault(_) | Stmt::Empty | Stmt::FunctionDecl { .. } => {
                Ok(Flow::Normal)
            }
            Stmt::Export(inner) => self.exec(inner, scope),
            Stmt::VarDecl { kind, decls } => {
                for (pattern, init) in decls {
                    let value = match init {
                        Some(expr) => self.eval(expr, scope)?,
                        None if *kind == DeclKind::Const => {
                            return Err(EvalError::Type(
                                "missing initializer in const declaration".to_string(),
                            ))
                        }
                        None => Value::Undefined,
                    };
                    self.bind(scope, pattern, value)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.exec_nested(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec_nested(alternate, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(stmts) => {
                let inner = self.new_scope(Some(Rc::clone(scope)));
                self.exec_block(stmts, &inner)
            }
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_nested(&self, stmt: &Stmt, scope: &Rc<Scope>) -> Result<Flow, EvalError> {
        match stmt {
            Stmt::Block(_) => self.exec(stmt, scope),
            other => {
                let inner = self.new_scope(Some(Rc::clone(scope)));
                self.exec(other, &inner)
            }
        }
    }

    // ── patterns ────────────────────────────────────────────────────────────

    fn bind_with_default(
        &self,
        scope: &Rc<Scope>,
        target: &PatternWithDefault,
        value: Value,
    ) -> Result<(), EvalError> {
        let value = match (&value, &target.default) {
            (Value::Undefined, Some(default)) => self.eval(default, scope)?,
            _ => value,
        };
        self.bind(scope, &target.pattern, value)
    }

    fn bind(&self, scope: &Rc<Scope>, pattern: &Pattern, value: Value) -> Result<(), EvalError> {
        match pattern {
            Pattern::Ident(name) => {
                scope.define(name, value);
                Ok(())
            }
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    return Err(EvalError::Type(format!(
                        "cannot destructure properties of {}",
                        value.to_display_string()
                    )));
                }
                for prop in props {
                    let field = get_property(&value, &prop.key)?;
                    self.bind_with_default(scope, &prop.value, field)?;
                }
                if let Some(rest) = rest {
                    let mut remaining = Object::new();
                    if let Value::Object(obj) = &value {
                        for (k, v) in obj.iter() {
                            if !props.iter().any(|p| p.key == k) {
                                remaining.set(k, v.clone());
                            }
                        }
                    }
                    scope.define(rest, Value::Object(Rc::new(remaining)));
                }
                Ok(())
            }
            Pattern::Array(items) => {
                let values = match &value {
                    Value::Array(values) => Rc::clone(values),
                    other => {
                        return Err(EvalError::Type(format!(
                            "{} is not iterable",
                            describe_value(other)
                        )))
                    }
                };
                for (i, item) in items.iter().enumerate() {
                    if let Some(item) = item {
                        let v = values.get(i).cloned().unwrap_or(Value::Undefined);
                        self.bind_with_default(scope, item, v)?;
                    }
                }
                Ok(())
            }
        }
    }

    // ── expressions ─────────────────────────────────────────────────────────

    fn eval(&self, expr: &Expr, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        self.tick()?;
        self.nested(|| self.eval_expr(expr, scope))
    }

    fn eval_expr(&self, expr: &Expr, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        match expr {
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Num(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::str(s)),
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    push_bounded(&mut out, quasi)?;
                    if let Some(expr) = exprs.get(i) {
                        push_bounded(&mut out, &self.eval(expr, scope)?.to_display_string())?;
                    }
                }
                Ok(Value::str(&out))
            }
            Expr::Ident(name) => scope
                .lookup(name)
                .ok_or_else(|| EvalError::Undefined(name.clone())),
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        ListItem::Item(expr) => out.push(self.eval(expr, scope)?),
                        ListItem::Spread(expr) => out.extend(self.spread(expr, scope)?),
                        ListItem::Hole => out.push(Value::Undefined),
                    }
                    if out.len() > MAX_ARRAY_LEN {
                        return Err(EvalError::TooLarge("array"));
                    }
                }
                Ok(Value::Array(Rc::new(out)))
            }
            Expr::Object(props) => Ok(Value::Object(Rc::new(self.eval_props(props, scope)?))),
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let target = self.eval(object, scope)?;
                if *optional && target.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = match property {
                    MemberProp::Name(name) => name.clone(),
                    MemberProp::Computed(expr) => {
                        property_key(&self.eval(expr, scope)?)
                    }
                };
                get_property(&target, &key)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                let func = self.eval(callee, scope)?;
                if *optional && func.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    match arg {
                        ListItem::Item(expr) => values.push(self.eval(expr, scope)?),
                        ListItem::Spread(expr) => values.extend(self.spread(expr, scope)?),
                        ListItem::Hole => values.push(Value::Undefined),
                    }
                    if values.len() > MAX_ARRAY_LEN {
                        return Err(EvalError::TooLarge("argument list"));
                    }
                }
                self.call(&func, values).map_err(|e| match e {
                    EvalError::Type(msg) if msg.ends_with("is not a function") => {
                        EvalError::Type(format!("{} is not a function", callee_name(callee)))
                    }
                    other => other,
                })
            }
            Expr::Unary { op, arg } => {
                let value = self.eval(arg, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::str(value.type_of()),
                })
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left, scope)?;
                let r = self.eval(right, scope)?;
                binary(*op, &l, &r)
            }
            Expr::Logical { op, left, right } => {
                let l = self.eval(left, scope)?;
                match op {
                    LogicalOp::And if !l.truthy() => Ok(l),
                    LogicalOp::Or if l.truthy() => Ok(l),
                    LogicalOp::Nullish if !l.is_nullish() => Ok(l),
                    _ => self.eval(right, scope),
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Function(def) => Ok(Value::Function(Rc::new(Closure {
                def: Rc::clone(def),
                env: Rc::clone(scope),
            }))),
            Expr::CreateElement {
                tag,
                props,
                children,
            } => {
                let tag = match tag {
                    Some(tag) => self.eval(tag, scope)?,
                    None => Value::Builtin(Builtin::Fragment),
                };
                let props = self.eval_props(props, scope)?;
                let mut values = Vec::with_capacity(children.len());
                for child in children {
                    values.push(self.eval(child, scope)?);
                }
                self.create_element(tag, props, values)
            }
        }
    }

    fn eval_props(&self, props: &[PropItem], scope: &Rc<Scope>) -> Result<Object, EvalError> {
        let mut obj = Object::new();
        for prop in props {
            match prop {
                PropItem::KeyValue(key, expr) => obj.set(key.clone(), self.eval(expr, scope)?),
                PropItem::Spread(expr) => match self.eval(expr, scope)? {
                    Value::Object(src) => {
                        for (k, v) in src.iter() {
                            obj.set(k, v.clone());
                        }
                    }
                    Value::Array(items) => {
                        for (i, v) in items.iter().enumerate() {
                            obj.set(i.to_string(), v.clone());
                        }
                    }
                    _ => {}
                },
            }
        }
        Ok(obj)
    }

    fn spread(&self, expr: &Expr, scope: &Rc<Scope>) -> Result<Vec<Value>, EvalError> {
        match self.eval(expr, scope)? {
            Value::Array(items) => Ok(items.as_ref().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::str(&c.to_string())).collect()),
            other => Err(EvalError::Type(format!(
                "{} is not iterable",
                describe_value(&other)
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Operators and property access
// ────────────────────────────────────────────────────────────────────────────

fn describe_value(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("\"{s}\""),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
        Value::Element(_) => "element".to_string(),
        other => other.to_display_string(),
    }
}

fn callee_name(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object,
            property: MemberProp::Name(name),
            ..
        } => format!("{}.{name}", callee_name(object)),
        _ => "expression".to_string(),
    }
}

fn property_key(value: &Value) -> String {
    value.to_display_string()
}

pub fn get_property(target: &Value, key: &str) -> Result<Value, EvalError> {
    match target {
        Value::Undefined | Value::Null => Err(EvalError::Type(format!(
            "Cannot read properties of {} (reading '{key}')",
            target.to_display_string()
        ))),
        Value::Object(obj) => Ok(obj.get(key).cloned().unwrap_or(Value::Undefined)),
        Value::Array(items) => {
            if key == "length" {
                return Ok(Value::Number(items.len() as f64));
            }
            if let Ok(index) = key.parse::<usize>() {
                return Ok(items.get(index).cloned().unwrap_or(Value::Undefined));
            }
            Ok(match Method::for_array(key) {
                Some(method) => Value::Builtin(Builtin::Method {
                    receiver: Rc::new(target.clone()),
                    method,
                }),
                None => Value::Undefined,
            })
        }
        Value::Str(s) => {
            if key == "length" {
                return Ok(Value::Number(s.encode_utf16().count() as f64));
            }
            if let Ok(index) = key.parse::<usize>() {
                return Ok(s
                    .chars()
                    .nth(index)
                    .map(|c| Value::str(&c.to_string()))
                    .unwrap_or(Value::Undefined));
            }
            Ok(match Method::for_string(key) {
                Some(method) => Value::Builtin(Builtin::Method {
                    receiver: Rc::new(target.clone()),
                    method,
                }),
                None => Value::Undefined,
            })
        }
        Value::Element(el) => Ok(match key {
            "props" => Value::Object(Rc::clone(&el.props)),
            _ => Value::Undefined,
        }),
        Value::Number(_) | Value::Bool(_) if key == "toString" => {
            Ok(Value::Builtin(Builtin::Method {
                receiver: Rc::new(target.clone()),
                method: Method::ToString,
            }))
        }
        _ => Ok(Value::Undefined),
    }
}

/// Appends `piece`, failing once `out` would pass [`MAX_STRING_BYTES`].
fn push_bounded(out: &mut String, piece: &str) -> Result<(), EvalError> {
    if out.len() + piece.len() > MAX_STRING_BYTES {
        return Err(EvalError::TooLarge("string"));
    }
    out.push_str(piece);
    Ok(())
}

/// Rejects strings and arrays past the evaluator's size caps.
fn checked_size(value: Value) -> Result<Value, EvalError> {
    match &value {
        Value::Str(s) if s.len() > MAX_STRING_BYTES => Err(EvalError::TooLarge("string")),
        Value::Array(items) if items.len() > MAX_ARRAY_LEN => Err(EvalError::TooLarge("array")),
        _ => Ok(value),
    }
}

fn call_string_method(s: &str, method: Method, args: &[Value]) -> Result<Value, EvalError> {
    let arg0 = args.first().cloned().unwrap_or(Value::Undefined);
    let value = match method {
        Method::ToUpperCase => Value::str(&s.to_uppercase()),
        Method::ToLowerCase => Value::str(&s.to_lowercase()),
        Method::Trim => Value::str(s.trim()),
        Method::Split => {
            let parts: Vec<Value> = match &arg0 {
                Value::Undefined => vec![Value::str(s)],
                sep => {
                    let sep = sep.to_display_string();
                    if sep.is_empty() {
                        s.chars().map(|c| Value::str(&c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::str).collect()
                    }
                }
            };
            Value::Array(Rc::new(parts))
        }
        Method::Slice => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), args);
            Value::str(&chars[start..end].iter().collect::<String>())
        }
        Method::Includes => Value::Bool(s.contains(arg0.to_display_string().as_str())),
        Method::Concat => {
            let mut out = s.to_string();
            for arg in args {
                push_bounded(&mut out, &arg.to_display_string())?;
            }
            Value::str(&out)
        }
        _ => Value::str(s),
    };
    checked_size(value)
}

fn slice_bounds(len: usize, args: &[Value]) -> (usize, usize) {
    let resolve = |value: Option<&Value>, fallback: usize| -> usize {
        match value {
            None | Some(Value::Undefined) => fallback,
            Some(v) => {
                let n = v.to_number();
                if n.is_nan() {
                    0
                } else if n < 0.0 {
                    (len as f64 + n.trunc()).max(0.0) as usize
                } else {
                    (n.trunc() as usize).min(len)
                }
            }
        }
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len);
    (start, end.max(start))
}

pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Element(x), Value::Element(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (x, y) if x.is_nullish() && y.is_nullish() => true,
        (x, y) if x.is_nullish() || y.is_nullish() => false,
        (Value::Number(_) | Value::Str(_) | Value::Bool(_), Value::Number(_) | Value::Str(_) | Value::Bool(_))
            if std::mem::discriminant(a) != std::mem::discriminant(b) =>
        {
            a.to_number() == b.to_number()
        }
        _ => strict_equals(a, b),
    }
}

fn is_stringy(value: &Value) -> bool {
    matches!(
        value,
        Value::Str(_) | Value::Array(_) | Value::Object(_) | Value::Element(_) | Value::Function(_) | Value::Builtin(_)
    )
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    Ok(match op {
        BinaryOp::Add => {
            if is_stringy(l) || is_stringy(r) {
                let mut out = l.to_display_string();
                push_bounded(&mut out, &r.to_display_string())?;
                checked_size(Value::str(&out))?
            } else {
                Value::Number(l.to_number() + r.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::StrictEq => Value::Bool(strict_equals(l, r)),
        BinaryOp::StrictNe => Value::Bool(!strict_equals(l, r)),
        BinaryOp::LooseEq => Value::Bool(loose_equals(l, r)),
        BinaryOp::LooseNe => Value::Bool(!loose_equals(l, r)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (l, r) {
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => l.to_number().partial_cmp(&r.to_number()),
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parser::parse_program;

    /// Evaluates `src` as a function body with no parameters.
    fn run(src: &str) -> Result<Value, EvalError> {
        let program = parse_program(src).unwrap();
        let def = Rc::new(FunctionDef {
            name: None,
            params: Vec::new(),
            body: FunctionBody::Block(program.body),
        });
        let interp = Interpreter::default();
        let f = interp.instantiate(def);
        interp.call(&f, Vec::new())
    }

    fn run_str(src: &str) -> String {
        run(src).unwrap().to_display_string()
    }

    #[test]
    fn test_arithmetic_and_strings() {
        assert_eq!(run_str("return 1 + 2 * 3;"), "7");
        assert_eq!(run_str("return 'a' + 1;"), "a1");
        assert_eq!(run_str("return 7 / 2;"), "3.5");
        assert_eq!(run_str("return `x${1 + 1}y`;"), "x2y");
    }

    #[test]
    fn test_logical_and_nullish() {
        assert_eq!(run_str("return null ?? 'fallback';"), "fallback");
        assert_eq!(run_str("return 0 || 'or';"), "or");
        assert_eq!(run_str("return 0 && 'and';"), "0");
        assert_eq!(run_str("return 2 >= 2 ? 'yes' : 'no';"), "yes");
    }

    #[test]
    fn test_destructuring_with_defaults() {
        let src = "const f = ({ name, title = 'Engineer' }) => name + ', ' + title;\n\
                   return f({ name: 'Ada' });";
        assert_eq!(run_str(src), "Ada, Engineer");
        assert_eq!(run_str("const [a, , c] = [1, 2, 3]; return a + c;"), "4");
    }

    #[test]
    fn test_array_methods() {
        assert_eq!(run_str("return [1, 2, 3].map(x => x * 2).join('-');"), "2-4-6");
        assert_eq!(run_str("return [1, 2, 3, 4].filter(x => x % 2 === 0).length;"), "2");
        assert_eq!(run_str("return ['a'].concat(['b'], 'c').join('');"), "abc");
        assert_eq!(run_str("return [1, 2, 3].slice(-2).join();"), "2,3");
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(run_str("return ' Hi '.trim().toUpperCase();"), "HI");
        assert_eq!(run_str("return 'a,b'.split(',').length;"), "2");
    }

    #[test]
    fn test_function_hoisting_and_recursion() {
        let src = "return fact(5);\nfunction fact(n) { if (n <= 1) { return 1; } return n * fact(n - 1); }";
        assert_eq!(run_str(src), "120");
    }

    #[test]
    fn test_undefined_identifier_is_reference_error() {
        let err = run("return window.location;").unwrap_err();
        assert_eq!(err, EvalError::Undefined("window".to_string()));
    }

    #[test]
    fn test_reading_property_of_undefined() {
        let err = run("const a = {}; return a.b.c;").unwrap_err();
        assert!(matches!(err, EvalError::Type(msg) if msg.contains("reading 'c'")));
    }

    #[test]
    fn test_runaway_recursion_hits_depth_limit() {
        let err = run("function f() { return f(); } return f();").unwrap_err();
        assert_eq!(err, EvalError::CallDepth(DEFAULT_MAX_DEPTH));
    }

    #[test]
    fn test_step_budget_is_enforced() {
        let program = parse_program("return [1,2,3,4,5,6,7,8,9,10].map(x => x + 1).length;").unwrap();
        let def = Rc::new(FunctionDef {
            name: None,
            params: Vec::new(),
            body: FunctionBody::Block(program.body),
        });
        let interp = Interpreter::with_limits(10, 16);
        let f = interp.instantiate(def);
        assert_eq!(interp.call(&f, Vec::new()).unwrap_err(), EvalError::StepLimit(10));
    }

    #[test]
    fn test_deep_expressions_across_calls_hit_nesting_limit() {
        let src = format!(
            "const f = n => n === 0 ? 0 : f(n - 1){}; return f(50);",
            " + 1".repeat(40)
        );
        let err = run(&src).unwrap_err();
        assert_eq!(err, EvalError::Nesting(DEFAULT_MAX_NESTING));
    }

    #[test]
    fn test_moderate_chain_still_evaluates() {
        let src = format!("return {}1;", "1 + ".repeat(100));
        assert_eq!(run_str(&src), "101");
    }

    #[test]
    fn test_doubling_string_is_capped() {
        let src = "const f = (s, n) => n === 0 ? s : f(s + s, n - 1); return f('a', 30);";
        assert_eq!(run(src).unwrap_err(), EvalError::TooLarge("string"));
    }

    #[test]
    fn test_doubling_array_is_capped() {
        let src = "const f = (a, n) => n === 0 ? a : f([...a, ...a], n - 1); return f([0], 30);";
        assert_eq!(run(src).unwrap_err(), EvalError::TooLarge("array"));
        let src = "const f = (a, n) => n === 0 ? a : f(a.concat(a), n - 1); return f([0], 30);";
        assert_eq!(run(src).unwrap_err(), EvalError::TooLarge("array"));
    }

    #[test]
    fn test_join_of_large_strings_is_capped() {
        let src = "const f = (s, n) => n === 0 ? s : f(s + s, n - 1);\n\
                   const big = f('a', 19);\n\
                   return [big, big, big].join('');";
        assert_eq!(run(src).unwrap_err(), EvalError::TooLarge("string"));
    }

    #[test]
    fn test_calling_non_function_names_the_callee() {
        let err = run("const x = 3; return x();").unwrap_err();
        assert_eq!(err, EvalError::Type("x is not a function".to_string()));
    }

    #[test]
    fn test_intrinsic_tag_is_rejected() {
        let err = run("return <div>hi</div>;").unwrap_err();
        assert!(matches!(err, EvalError::Element(msg) if msg.contains("<div>")));
    }
}
