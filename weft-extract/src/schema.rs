//! Structural schema inference.
//!
//! Maps a [`TypeDescriptor`] to a JSON-schema-shaped value. The mapping is
//! structural, not nominal: primitives tag themselves, arrays and tuples
//! carry item schemas, object-likes become `properties`/`required`. Named
//! references resolve through a [`TypeResolver`] and are cycle-guarded by a
//! seen-set: a repeated type within one inference run short-circuits to
//! no-schema instead of looping.
//!
//! Obtaining a `TypeDescriptor` from source is the language-specific front
//! end's job (see [`crate::types`]); this module stays language-agnostic.

use std::collections::HashSet;

use serde_json::{Map, Value, json};
use weft_core::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink};

/// A structural description of a declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    String,
    /// A union of string literals.
    StringEnum(Vec<String>),
    Number,
    Boolean,
    Array(Box<TypeDescriptor>),
    Tuple(Vec<TypeDescriptor>),
    Object(Vec<PropertyDescriptor>),
    /// A reference to a named type, resolved through the [`TypeResolver`].
    Reference(String),
    /// Anything inference cannot express; carries display text for the
    /// diagnostic.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub optional: bool,
}

/// Resolves named type references. The extractor backs this with the type
/// table collected from the scanned program; tests may use a map.
pub trait TypeResolver {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor>;
}

impl TypeResolver for std::collections::HashMap<String, TypeDescriptor> {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor> {
        self.get(name).cloned()
    }
}

/// One schema-inference run for a single tool's input or output.
pub struct Inferencer<'a> {
    resolver: &'a dyn TypeResolver,
    tool_id: &'a str,
    file: &'a str,
}

impl<'a> Inferencer<'a> {
    pub fn new(resolver: &'a dyn TypeResolver, tool_id: &'a str, file: &'a str) -> Self {
        Self {
            resolver,
            tool_id,
            file,
        }
    }

    /// Infer a schema rooted at `path` (`input` or `output`).
    ///
    /// Returns `None` when the type cannot be expressed; an unsupported shape
    /// also records a warning naming the offending path.
    pub fn infer(&self, descriptor: &TypeDescriptor, path: &str, sink: &mut DiagnosticSink) -> Option<Value> {
        let mut seen = HashSet::new();
        self.infer_at(descriptor, path, &mut seen, sink)
    }

    fn infer_at(
        &self,
        descriptor: &TypeDescriptor,
        path: &str,
        seen: &mut HashSet<String>,
        sink: &mut DiagnosticSink,
    ) -> Option<Value> {
        match descriptor {
            TypeDescriptor::String => Some(json!({"type": "string"})),
            TypeDescriptor::StringEnum(values) => {
                Some(json!({"type": "string", "enum": values}))
            }
            TypeDescriptor::Number => Some(json!({"type": "number"})),
            TypeDescriptor::Boolean => Some(json!({"type": "boolean"})),
            TypeDescriptor::Tuple(elements) => {
                let items: Vec<Value> = elements
                    .iter()
                    .enumerate()
                    .filter_map(|(idx, el)| {
                        self.infer_at(el, &format!("{path}[{idx}]"), seen, sink)
                    })
                    .collect();
                if items.len() == elements.len() && !items.is_empty() {
                    let identical = items.iter().all(|i| *i == items[0]);
                    let items = if identical {
                        items[0].clone()
                    } else {
                        json!({"anyOf": items})
                    };
                    Some(json!({"type": "array", "items": items}))
                } else {
                    Some(json!({"type": "array"}))
                }
            }
            TypeDescriptor::Array(element) => {
                match self.infer_at(element, &format!("{path}[]"), seen, sink) {
                    Some(items) => Some(json!({"type": "array", "items": items})),
                    None => Some(json!({"type": "array"})),
                }
            }
            TypeDescriptor::Object(properties) => {
                let mut props = Map::new();
                let mut required = Vec::new();
                for prop in properties {
                    let schema = self.infer_at(
                        &prop.descriptor,
                        &format!("{path}.{}", prop.name),
                        seen,
                        sink,
                    );
                    if let Some(schema) = schema {
                        props.insert(prop.name.clone(), schema);
                    }
                    if !prop.optional {
                        required.push(prop.name.clone());
                    }
                }
                let mut result = Map::new();
                result.insert("type".to_string(), json!("object"));
                result.insert("properties".to_string(), Value::Object(props));
                if !required.is_empty() {
                    result.insert("required".to_string(), json!(required));
                }
                Some(Value::Object(result))
            }
            TypeDescriptor::Reference(name) => {
                if !seen.insert(name.clone()) {
                    // Self-referential type: short-circuit instead of looping.
                    return None;
                }
                match self.resolver.resolve(name) {
                    Some(resolved) => self.infer_at(&resolved, path, seen, sink),
                    None => {
                        self.warn_unsupported(name, path, sink);
                        None
                    }
                }
            }
            TypeDescriptor::Unsupported(text) => {
                self.warn_unsupported(text, path, sink);
                None
            }
        }
    }

    fn warn_unsupported(&self, type_text: &str, path: &str, sink: &mut DiagnosticSink) {
        sink.push(
            Diagnostic::warning(
                DiagnosticCode::SchemaInferUnsupported,
                format!(
                    "Unsupported type \"{}\" while inferring schema for {} at {}. Provide an explicit schema in the annotation.",
                    type_text, self.tool_id, path
                ),
            )
            .at(self.file),
        );
    }
}
