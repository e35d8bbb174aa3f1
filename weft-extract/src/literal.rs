//! Restricted literal-expression evaluation.
//!
//! Annotation configuration objects are evaluated over the parsed syntax
//! tree. Only literals are captured: strings (including substitution-free
//! template strings), numbers, booleans, null, arrays, and nested objects.
//! Any computed expression yields no value; there is no partial evaluation
//! of an expression, only omission.

use serde_json::{Map, Number, Value};
use tree_sitter::Node;

/// Evaluate an expression node to a JSON value, or `None` when the
/// expression isn't a supported literal.
pub fn evaluate_literal(node: Node<'_>, source: &str) -> Option<Value> {
    match node.kind() {
        "string" => Some(Value::String(string_literal_contents(node, source))),
        "template_string" => template_contents(node, source).map(Value::String),
        "number" => parse_number(&node_text(node, source)),
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        "array" => {
            let mut cursor = node.walk();
            let items = node
                .named_children(&mut cursor)
                .filter(|child| child.kind() != "comment")
                // An unevaluable element degrades to null, keeping indices stable.
                .map(|child| evaluate_literal(child, source).unwrap_or(Value::Null))
                .collect();
            Some(Value::Array(items))
        }
        "object" => {
            let mut map = Map::new();
            let mut cursor = node.walk();
            for prop in node.named_children(&mut cursor) {
                match prop.kind() {
                    "pair" => {
                        let Some(key) = prop.child_by_field_name("key") else {
                            continue;
                        };
                        let name = match key.kind() {
                            "property_identifier" => node_text(key, source),
                            "string" => string_literal_contents(key, source),
                            _ => continue,
                        };
                        let Some(value_node) = prop.child_by_field_name("value") else {
                            continue;
                        };
                        // A computed value means the key is simply not captured.
                        if let Some(value) = evaluate_literal(value_node, source) {
                            map.insert(name, value);
                        }
                    }
                    "shorthand_property_identifier" => {
                        let name = node_text(prop, source);
                        map.insert(name.clone(), Value::String(name));
                    }
                    _ => {}
                }
            }
            Some(Value::Object(map))
        }
        _ => None,
    }
}

pub fn node_text(node: Node<'_>, source: &str) -> String {
    node.utf8_text(source.as_bytes()).unwrap_or("").to_string()
}

/// Collect the contents of a string literal, applying escape sequences.
pub(crate) fn string_literal_contents(node: Node<'_>, source: &str) -> String {
    let mut out = String::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_fragment" => out.push_str(&node_text(child, source)),
            "escape_sequence" => out.push_str(&unescape(&node_text(child, source))),
            _ => {}
        }
    }
    out
}

/// Template strings count as literals only without substitutions.
fn template_contents(node: Node<'_>, source: &str) -> Option<String> {
    let mut out = String::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "string_fragment" => out.push_str(&node_text(child, source)),
            "escape_sequence" => out.push_str(&unescape(&node_text(child, source))),
            "template_substitution" => return None,
            _ => {}
        }
    }
    Some(out)
}

fn unescape(sequence: &str) -> String {
    let mut chars = sequence.chars();
    if chars.next() != Some('\\') {
        return sequence.to_string();
    }
    match chars.next() {
        Some('n') => "\n".to_string(),
        Some('t') => "\t".to_string(),
        Some('r') => "\r".to_string(),
        Some('0') => "\0".to_string(),
        Some('b') => "\u{0008}".to_string(),
        Some('f') => "\u{000C}".to_string(),
        Some('v') => "\u{000B}".to_string(),
        Some('u') => {
            let rest: String = chars.collect();
            let hex = rest
                .trim_start_matches('{')
                .trim_end_matches('}')
                .to_string();
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        }
        Some('x') => {
            let hex: String = chars.collect();
            u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        }
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let cleaned = text.replace('_', "");
    let radix = |prefix: &str, radix: u32| -> Option<Value> {
        let digits = cleaned
            .strip_prefix(prefix)
            .or_else(|| cleaned.strip_prefix(&prefix.to_uppercase()))?;
        i64::from_str_radix(digits, radix).ok().map(Value::from)
    };
    if let Some(v) = radix("0x", 16).or_else(|| radix("0o", 8)).or_else(|| radix("0b", 2)) {
        return Some(v);
    }
    if !cleaned.contains(['.', 'e', 'E'])
        && let Ok(int) = cleaned.parse::<i64>()
    {
        return Some(Value::from(int));
    }
    cleaned
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}
