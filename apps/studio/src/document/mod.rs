//! Document pipeline: validation, runtime compilation, layout and PDF output.

pub mod ast;
pub mod capabilities;
pub mod compiler;
pub mod eval;
pub mod export;
pub mod font_metrics;
pub mod handlers;
pub mod layout;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod style;
pub mod templates;
pub mod tree;
pub mod validator;
