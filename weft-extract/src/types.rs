//! Lowering of TypeScript type syntax into [`TypeDescriptor`]s.
//!
//! This is the language-specific front end for schema inference: it reads
//! declared type annotations off the tree-sitter CST and collects named
//! interface/type-alias declarations into a [`TypeTable`] so references can
//! be resolved structurally. No type checking happens here; anything beyond
//! the structural subset lowers to `Unsupported` and is reported by the
//! inference pass.

use std::collections::HashMap;

use tree_sitter::Node;

use crate::literal::{node_text, string_literal_contents};
use crate::schema::{PropertyDescriptor, TypeDescriptor, TypeResolver};

/// Named types collected from every file in the scanned program.
#[derive(Debug, Default)]
pub struct TypeTable {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect interface and type-alias declarations from a parsed file.
    /// First declaration of a name wins.
    pub fn collect(&mut self, root: Node<'_>, source: &str) {
        self.visit(root, source);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn visit(&mut self, node: Node<'_>, source: &str) {
        match node.kind() {
            "interface_declaration" => {
                if let (Some(name), Some(body)) = (
                    node.child_by_field_name("name"),
                    node.child_by_field_name("body"),
                ) {
                    let descriptor = TypeDescriptor::Object(lower_object_members(body, source));
                    self.types
                        .entry(node_text(name, source))
                        .or_insert(descriptor);
                }
            }
            "type_alias_declaration" => {
                if let (Some(name), Some(value)) = (
                    node.child_by_field_name("name"),
                    node.child_by_field_name("value"),
                ) {
                    let descriptor = lower_type(value, source);
                    self.types
                        .entry(node_text(name, source))
                        .or_insert(descriptor);
                }
            }
            _ => {}
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child, source);
        }
    }
}

impl TypeResolver for TypeTable {
    fn resolve(&self, name: &str) -> Option<TypeDescriptor> {
        self.types.get(name).cloned()
    }
}

/// Lower a type node (or a `type_annotation` wrapper) to a descriptor.
pub fn lower_type(node: Node<'_>, source: &str) -> TypeDescriptor {
    match node.kind() {
        "type_annotation" => match first_named_child(node) {
            Some(inner) => lower_type(inner, source),
            None => TypeDescriptor::Unsupported(node_text(node, source)),
        },
        "parenthesized_type" => match first_named_child(node) {
            Some(inner) => lower_type(inner, source),
            None => TypeDescriptor::Unsupported(node_text(node, source)),
        },
        "predefined_type" => match node_text(node, source).as_str() {
            "string" => TypeDescriptor::String,
            "number" | "bigint" => TypeDescriptor::Number,
            "boolean" => TypeDescriptor::Boolean,
            other => TypeDescriptor::Unsupported(other.to_string()),
        },
        "literal_type" => lower_literal_type(node, source),
        "union_type" => lower_union(node, source),
        "array_type" => match first_named_child(node) {
            Some(element) => TypeDescriptor::Array(Box::new(lower_type(element, source))),
            None => TypeDescriptor::Unsupported(node_text(node, source)),
        },
        "tuple_type" => {
            let mut cursor = node.walk();
            let elements = node
                .named_children(&mut cursor)
                .map(|el| match el.kind() {
                    "optional_type" => match first_named_child(el) {
                        Some(inner) => lower_type(inner, source),
                        None => TypeDescriptor::Unsupported(node_text(el, source)),
                    },
                    _ => lower_type(el, source),
                })
                .collect();
            TypeDescriptor::Tuple(elements)
        }
        "generic_type" => lower_generic(node, source),
        "type_identifier" => TypeDescriptor::Reference(node_text(node, source)),
        "object_type" | "interface_body" => {
            TypeDescriptor::Object(lower_object_members(node, source))
        }
        _ => TypeDescriptor::Unsupported(node_text(node, source)),
    }
}

fn lower_literal_type(node: Node<'_>, source: &str) -> TypeDescriptor {
    match first_named_child(node) {
        Some(inner) => match inner.kind() {
            "string" => TypeDescriptor::String,
            "number" | "unary_expression" => TypeDescriptor::Number,
            "true" | "false" => TypeDescriptor::Boolean,
            _ => TypeDescriptor::Unsupported(node_text(node, source)),
        },
        None => TypeDescriptor::Unsupported(node_text(node, source)),
    }
}

/// Unions lower to a string enum when every non-nullish member is a string
/// literal; anything else is unsupported.
fn lower_union(node: Node<'_>, source: &str) -> TypeDescriptor {
    let mut members = Vec::new();
    flatten_union(node, &mut members);

    let mut values = Vec::new();
    for member in members {
        if is_nullish(member, source) {
            continue;
        }
        match string_literal_member(member, source) {
            Some(value) => values.push(value),
            None => return TypeDescriptor::Unsupported(node_text(node, source)),
        }
    }
    if values.is_empty() {
        TypeDescriptor::Unsupported(node_text(node, source))
    } else {
        TypeDescriptor::StringEnum(values)
    }
}

fn flatten_union<'a>(node: Node<'a>, members: &mut Vec<Node<'a>>) {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).collect();
    for child in children {
        if child.kind() == "union_type" {
            flatten_union(child, members);
        } else {
            members.push(child);
        }
    }
}

fn is_nullish(node: Node<'_>, source: &str) -> bool {
    let text = node_text(node, source);
    text == "null" || text == "undefined"
}

fn string_literal_member(node: Node<'_>, source: &str) -> Option<String> {
    if node.kind() != "literal_type" {
        return None;
    }
    let inner = first_named_child(node)?;
    if inner.kind() != "string" {
        return None;
    }
    Some(string_literal_contents(inner, source))
}

fn lower_generic(node: Node<'_>, source: &str) -> TypeDescriptor {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source))
        .unwrap_or_default();
    let first_argument = node
        .child_by_field_name("type_arguments")
        .and_then(first_named_child);
    match (name.as_str(), first_argument) {
        ("Array" | "ReadonlyArray", Some(arg)) => {
            TypeDescriptor::Array(Box::new(lower_type(arg, source)))
        }
        // Return types are inferred as awaited.
        ("Promise", Some(arg)) => lower_type(arg, source),
        _ => TypeDescriptor::Unsupported(node_text(node, source)),
    }
}

fn lower_object_members(body: Node<'_>, source: &str) -> Vec<PropertyDescriptor> {
    let mut properties = Vec::new();
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        match member.kind() {
            "property_signature" => {
                let Some(name_node) = member.child_by_field_name("name") else {
                    continue;
                };
                let name = property_name(name_node, source);
                let descriptor = match member.child_by_field_name("type") {
                    Some(annotation) => lower_type(annotation, source),
                    None => TypeDescriptor::Unsupported(node_text(member, source)),
                };
                properties.push(PropertyDescriptor {
                    name,
                    descriptor,
                    optional: has_question_mark(member),
                });
            }
            "method_signature" => {
                let Some(name_node) = member.child_by_field_name("name") else {
                    continue;
                };
                properties.push(PropertyDescriptor {
                    name: property_name(name_node, source),
                    descriptor: TypeDescriptor::Unsupported(node_text(member, source)),
                    optional: has_question_mark(member),
                });
            }
            _ => {}
        }
    }
    properties
}

fn property_name(node: Node<'_>, source: &str) -> String {
    match node.kind() {
        "string" => string_literal_contents(node, source),
        _ => node_text(node, source),
    }
}

fn has_question_mark(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor).any(|c| c.kind() == "?")
}

fn first_named_child(node: Node<'_>) -> Option<Node<'_>> {
    node.named_child(0)
}
