//! Runtime compilation of document sources.
//!
//! Two stages: [`parser::parse_program`] transpiles the fragment into an
//! expression tree, then the tree is wrapped in a module function whose
//! parameters are the capability names and evaluated with the host
//! capabilities as arguments.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::debug;

use crate::document::ast::{Expr, FunctionBody, FunctionDef, Pattern, PatternWithDefault, Stmt};
use crate::document::capabilities::{capability_values, CAPABILITY_NAMES};
use crate::document::eval::{EvalError, Interpreter, Object, Value};
use crate::document::parser;

/// Name the fragment must define.
pub const ROOT_SYMBOL: &str = "ResumeDocument";

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("syntax error at line {line}, column {col}: {message}")]
    Syntax { line: u32, col: u32, message: String },

    #[error("no `{0}` definition found in document source")]
    MissingRoot(String),

    #[error(transparent)]
    Evaluation(#[from] EvalError),
}

/// Invocable result of compiling one source. Not `Send`: it is built, used
/// and dropped on the same thread.
pub struct CompiledDocument {
    id: u64,
    root: Value,
    interpreter: Interpreter,
}

impl std::fmt::Debug for CompiledDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledDocument")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl CompiledDocument {
    /// Unique per compilation, never reused within the process.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Renders the root component with no props.
    pub fn invoke(&self) -> Result<Value, EvalError> {
        match &self.root {
            Value::Function(_) => {
                self.interpreter
                    .create_element(self.root.clone(), Object::new(), Vec::new())
            }
            Value::Element(_) => Ok(self.root.clone()),
            other => Err(EvalError::Type(format!(
                "{ROOT_SYMBOL} must be a component, got {}",
                other.type_of()
            ))),
        }
    }
}

pub fn compile(source: &str) -> Result<CompiledDocument, CompileError> {
    let program = parser::parse_program(source)?;
    let mut body = strip_module_syntax(program.body);
    if !declares_root(&body) {
        return Err(CompileError::MissingRoot(ROOT_SYMBOL.to_string()));
    }
    body.push(Stmt::Return(Some(Expr::Ident(ROOT_SYMBOL.to_string()))));

    let module = FunctionDef {
        name: Some("module".to_string()),
        params: CAPABILITY_NAMES
            .iter()
            .map(|name| PatternWithDefault {
                pattern: Pattern::Ident((*name).to_string()),
                default: None,
            })
            .collect(),
        body: FunctionBody::Block(body),
    };

    let interpreter = Interpreter::default();
    let module = interpreter.instantiate(Rc::new(module));
    let root = interpreter.call(&module, capability_values())?;

    let id = NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed);
    debug!(document_id = id, "Compiled document source");
    Ok(CompiledDocument {
        id,
        root,
        interpreter,
    })
}

/// Drops imports and `export default X`, and unwraps exported declarations.
fn strip_module_syntax(body: Vec<Stmt>) -> Vec<Stmt> {
    body.into_iter()
        .filter_map(|stmt| match stmt {
            Stmt::Import { .. } | Stmt::ExportDefault(_) => None,
            Stmt::Export(inner) => Some(*inner),
            other => Some(other),
        })
        .collect()
}

fn declares_root(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match stmt {
        Stmt::FunctionDecl { name, .. } => name == ROOT_SYMBOL,
        Stmt::VarDecl { decls, .. } => decls
            .iter()
            .any(|(pattern, _)| matches!(pattern, Pattern::Ident(name) if name == ROOT_SYMBOL)),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::eval::ElementKind;
    use crate::document::capabilities::Primitive;
    use crate::document::templates::{DEFAULT_TEMPLATE, RESUME_TEMPLATE};

    fn root_kind(source: &str) -> ElementKind {
        let doc = compile(source).unwrap();
        match doc.invoke().unwrap() {
            Value::Element(el) => el.kind,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_builtin_templates_compile_to_document() {
        assert_eq!(
            root_kind(DEFAULT_TEMPLATE),
            ElementKind::Primitive(Primitive::Document)
        );
        assert_eq!(
            root_kind(RESUME_TEMPLATE),
            ElementKind::Primitive(Primitive::Document)
        );
    }

    #[test]
    fn test_missing_root_symbol() {
        let err = compile(
            "import React from 'react';\nconst Resume = () => <Document></Document>;\nexport default Resume;",
        )
        .unwrap_err();
        assert_eq!(err, CompileError::MissingRoot(ROOT_SYMBOL.to_string()));
    }

    #[test]
    fn test_root_picked_among_several_definitions() {
        let source = "const Header = () => <Text>Hi</Text>;\n\
                      function ResumeDocument() { return <Document><Page><Header /></Page></Document>; }\n\
                      const Footer = () => null;";
        assert_eq!(root_kind(source), ElementKind::Primitive(Primitive::Document));
    }

    #[test]
    fn test_exported_function_declaration_is_root() {
        let source = "export default function ResumeDocument() { return <Document></Document>; }";
        assert_eq!(root_kind(source), ElementKind::Primitive(Primitive::Document));
    }

    #[test]
    fn test_syntax_error_is_reported_with_position() {
        let err = compile("const ResumeDocument = () => (\n  <Document>\n    <Page\n").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { .. }));
    }

    #[test]
    fn test_unknown_host_name_fails_at_invoke() {
        let doc = compile("const ResumeDocument = () => <Document><Image /></Document>;").unwrap();
        let err = doc.invoke().unwrap_err();
        assert_eq!(err, EvalError::Undefined("Image".to_string()));
    }

    #[test]
    fn test_module_level_failure_is_evaluation_error() {
        let err = compile("const x = fetch('http://x');\nconst ResumeDocument = () => null;")
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::Evaluation(EvalError::Undefined("fetch".to_string()))
        );
    }

    #[test]
    fn test_each_compilation_gets_fresh_identity() {
        let a = compile(DEFAULT_TEMPLATE).unwrap();
        let b = compile(DEFAULT_TEMPLATE).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
