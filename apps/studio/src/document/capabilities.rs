//! Host values injected into every compiled fragment.
//!
//! These six names are the entire surface a fragment can reach. Anything
//! else it references must be declared by the fragment itself.

use std::rc::Rc;

use crate::document::eval::{Builtin, EvalError, Object, Value};

/// Parameter names of the compiled module, in binding order.
pub const CAPABILITY_NAMES: [&str; 6] = ["React", "Document", "Page", "Text", "View", "StyleSheet"];

/// Host layout primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Document,
    Page,
    View,
    Text,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Document => "Document",
            Primitive::Page => "Page",
            Primitive::View => "View",
            Primitive::Text => "Text",
        }
    }
}

/// Values bound to [`CAPABILITY_NAMES`], in the same order.
pub fn capability_values() -> Vec<Value> {
    let mut react = Object::new();
    react.set("createElement", Value::Builtin(Builtin::CreateElement));
    react.set("Fragment", Value::Builtin(Builtin::Fragment));

    let mut stylesheet = Object::new();
    stylesheet.set("create", Value::Builtin(Builtin::StyleSheetCreate));

    vec![
        Value::Object(Rc::new(react)),
        Value::Builtin(Builtin::Primitive(Primitive::Document)),
        Value::Builtin(Builtin::Primitive(Primitive::Page)),
        Value::Builtin(Builtin::Primitive(Primitive::Text)),
        Value::Builtin(Builtin::Primitive(Primitive::View)),
        Value::Object(Rc::new(stylesheet)),
    ]
}

/// `StyleSheet.create(styles)` hands the style map back unchanged; styles are
/// resolved during layout.
pub fn stylesheet_create(args: Vec<Value>) -> Result<Value, EvalError> {
    match args.into_iter().next() {
        Some(styles @ Value::Object(_)) => Ok(styles),
        Some(other) => Err(EvalError::Type(format!(
            "StyleSheet.create expects an object, got {}",
            other.type_of()
        ))),
        None => Err(EvalError::Type(
            "StyleSheet.create expects an object, got undefined".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_values_align_with_names() {
        let values = capability_values();
        assert_eq!(values.len(), CAPABILITY_NAMES.len());
        assert!(matches!(
            values[2],
            Value::Builtin(Builtin::Primitive(Primitive::Page))
        ));
        assert!(matches!(
            values[3],
            Value::Builtin(Builtin::Primitive(Primitive::Text))
        ));
        let react = values[0].as_object().unwrap();
        assert!(react.get("createElement").is_some());
        assert!(react.get("Fragment").is_some());
    }

    #[test]
    fn test_stylesheet_create_rejects_non_objects() {
        assert!(stylesheet_create(vec![Value::Number(1.0)]).is_err());
        assert!(stylesheet_create(vec![Value::Object(Rc::new(Object::new()))]).is_ok());
    }
}
