//! Annotation-site discovery.
//!
//! Locates `@tool({...})` and `@uiComponent(...)` decorator sites in
//! TypeScript sources and captures the declaration they are attached to.
//! Metadata is attached at declaration time and discoverable without
//! executing the target code; the literal evaluator captures the
//! configuration object.

use serde_json::{Map, Value};
use tree_sitter::{Node, Parser, Tree};
use weft_core::error::{Error, Result};

use crate::literal::{evaluate_literal, node_text};
use crate::schema::TypeDescriptor;
use crate::types::lower_type;

pub const TOOL_DECORATOR: &str = "tool";
pub const UI_DECORATOR: &str = "uiComponent";

/// One `@tool` annotation site.
#[derive(Debug)]
pub struct ToolSite {
    pub meta: Map<String, Value>,
    /// Declared name of the annotated function, when it is function-like.
    pub fn_name: Option<String>,
    pub has_params: bool,
    /// Declared type of the first parameter; `None` means no annotation.
    pub first_param_type: Option<TypeDescriptor>,
    /// Declared (awaited) return type.
    pub return_type: Option<TypeDescriptor>,
}

/// One `@uiComponent` annotation site.
#[derive(Debug)]
pub struct UiSite {
    pub meta: Map<String, Value>,
}

/// Thin wrapper owning the tree-sitter parser.
pub struct Scanner {
    parser: Parser,
}

impl Scanner {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .map_err(|e| {
                Box::new(Error::Internal {
                    message: format!("failed to load TypeScript grammar: {e}"),
                })
            })?;
        Ok(Self { parser })
    }

    pub fn parse(&mut self, source: &str) -> Option<Tree> {
        self.parser.parse(source, None)
    }
}

/// Collect all annotation sites in a parsed file, in document order.
pub fn scan_annotations(root: Node<'_>, source: &str) -> (Vec<ToolSite>, Vec<UiSite>) {
    let mut tools = Vec::new();
    let mut uis = Vec::new();
    visit(root, source, &mut tools, &mut uis);
    (tools, uis)
}

fn visit(node: Node<'_>, source: &str, tools: &mut Vec<ToolSite>, uis: &mut Vec<UiSite>) {
    if node.kind() == "decorator" {
        if let Some((name, argument)) = decorator_call(node, source) {
            match name.as_str() {
                TOOL_DECORATOR => {
                    if let Some(meta) = tool_meta(argument, source) {
                        let site = build_tool_site(meta, node, source);
                        tools.push(site);
                    }
                }
                UI_DECORATOR => {
                    if let Some(meta) = ui_meta(argument, source) {
                        uis.push(UiSite { meta });
                    }
                }
                _ => {}
            }
        }
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    for child in children {
        visit(child, source, tools, uis);
    }
}

/// Unpack `@name(arg)`; bare `@name` and member-expression decorators don't
/// qualify.
fn decorator_call<'a>(decorator: Node<'a>, source: &str) -> Option<(String, Option<Node<'a>>)> {
    let expr = decorator.named_child(0)?;
    if expr.kind() != "call_expression" {
        return None;
    }
    let function = expr.child_by_field_name("function")?;
    if function.kind() != "identifier" {
        return None;
    }
    let arguments = expr.child_by_field_name("arguments");
    let first_argument = arguments.and_then(|args| {
        let mut cursor = args.walk();
        args.named_children(&mut cursor)
            .find(|a| a.kind() != "comment")
    });
    Some((node_text(function, source), first_argument))
}

fn tool_meta(argument: Option<Node<'_>>, source: &str) -> Option<Map<String, Value>> {
    let argument = argument?;
    if argument.kind() != "object" {
        return None;
    }
    match evaluate_literal(argument, source) {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// The UI decorator accepts either a bare tool id string or a config object.
fn ui_meta(argument: Option<Node<'_>>, source: &str) -> Option<Map<String, Value>> {
    let argument = argument?;
    match argument.kind() {
        "string" | "template_string" => {
            let value = evaluate_literal(argument, source)?;
            let mut map = Map::new();
            map.insert("toolId".to_string(), value);
            Some(map)
        }
        "object" => match evaluate_literal(argument, source) {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

fn build_tool_site(meta: Map<String, Value>, decorator: Node<'_>, source: &str) -> ToolSite {
    let declaration = decorated_declaration(decorator);
    let mut site = ToolSite {
        meta,
        fn_name: None,
        has_params: false,
        first_param_type: None,
        return_type: None,
    };
    let Some(declaration) = declaration else {
        return site;
    };
    if !is_function_like(declaration) {
        return site;
    }

    site.fn_name = declaration
        .child_by_field_name("name")
        .map(|n| node_text(n, source));

    if let Some(parameters) = declaration.child_by_field_name("parameters") {
        let mut cursor = parameters.walk();
        let first = parameters.named_children(&mut cursor).find(|p| {
            matches!(p.kind(), "required_parameter" | "optional_parameter")
        });
        if let Some(first) = first {
            site.has_params = true;
            site.first_param_type = first
                .child_by_field_name("type")
                .map(|annotation| lower_type(annotation, source));
        }
    }

    site.return_type = declaration
        .child_by_field_name("return_type")
        .map(|annotation| lower_type(annotation, source));
    site
}

/// Find the declaration a decorator is attached to.
///
/// Depending on the grammar shape, decorators appear either as children of
/// the decorated declaration or as its preceding siblings; handle both.
fn decorated_declaration(decorator: Node<'_>) -> Option<Node<'_>> {
    let parent = decorator.parent()?;
    if is_declaration_kind(parent.kind()) {
        return Some(unwrap_export(parent));
    }
    let mut next = decorator.next_named_sibling();
    while let Some(sibling) = next {
        if sibling.kind() != "decorator" {
            return Some(unwrap_export(sibling));
        }
        next = sibling.next_named_sibling();
    }
    None
}

fn is_declaration_kind(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "abstract_class_declaration"
            | "method_definition"
            | "abstract_method_signature"
            | "function_declaration"
            | "generator_function_declaration"
            | "field_definition"
            | "public_field_definition"
            | "lexical_declaration"
            | "export_statement"
    )
}

fn unwrap_export(node: Node<'_>) -> Node<'_> {
    if node.kind() == "export_statement" {
        node.child_by_field_name("declaration").unwrap_or(node)
    } else {
        node
    }
}

fn is_function_like(node: Node<'_>) -> bool {
    matches!(
        node.kind(),
        "method_definition"
            | "function_declaration"
            | "generator_function_declaration"
            | "function_signature"
            | "abstract_method_signature"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> (Vec<ToolSite>, Vec<UiSite>) {
        let mut scanner = Scanner::new().unwrap();
        let tree = scanner.parse(source).unwrap();
        scan_annotations(tree.root_node(), source)
    }

    #[test]
    fn test_tool_decorator_on_method() {
        let (tools, uis) = scan(
            r#"
            export class WeatherTools {
                @tool({ id: "weather.getForecast", resourceUri: "ui://weather/forecast" })
                async getForecast(input: { location: string }) {
                    return { ok: true };
                }
            }
            "#,
        );
        assert_eq!(tools.len(), 1);
        assert!(uis.is_empty());
        let site = &tools[0];
        assert_eq!(
            site.meta.get("id").and_then(|v| v.as_str()),
            Some("weather.getForecast")
        );
        assert_eq!(site.fn_name.as_deref(), Some("getForecast"));
        assert!(site.has_params);
        assert!(site.first_param_type.is_some());
    }

    #[test]
    fn test_tool_without_id_keeps_function_name() {
        let (tools, _) = scan(
            r#"
            class T {
                @tool({ description: "anonymous" })
                lookupThing() { return 1; }
            }
            "#,
        );
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].fn_name.as_deref(), Some("lookupThing"));
        assert!(!tools[0].has_params);
    }

    #[test]
    fn test_non_object_argument_ignored() {
        let (tools, _) = scan(
            r#"
            class T {
                @tool(buildConfig())
                run(input: string) { return input; }
            }
            "#,
        );
        assert!(tools.is_empty());
    }

    #[test]
    fn test_untyped_parameter_detected() {
        let (tools, _) = scan(
            r#"
            class T {
                @tool({ id: "t" })
                run(input) { return input; }
            }
            "#,
        );
        assert_eq!(tools.len(), 1);
        assert!(tools[0].has_params);
        assert!(tools[0].first_param_type.is_none());
    }

    #[test]
    fn test_return_type_captured() {
        let (tools, _) = scan(
            r#"
            class T {
                @tool({ id: "t" })
                run(input: string): Promise<{ ok: boolean }> { return { ok: true }; }
            }
            "#,
        );
        assert!(tools[0].return_type.is_some());
    }

    #[test]
    fn test_ui_decorator_string_form() {
        let (_, uis) = scan(
            r#"
            @uiComponent("weather.getForecast")
            class ForecastView {}
            "#,
        );
        assert_eq!(uis.len(), 1);
        assert_eq!(
            uis[0].meta.get("toolId").and_then(|v| v.as_str()),
            Some("weather.getForecast")
        );
    }

    #[test]
    fn test_ui_decorator_object_form() {
        let (_, uis) = scan(
            r#"
            @uiComponent({ toolId: "weather.getForecast", resourceUri: "ui://weather/forecast" })
            class ForecastView {}
            "#,
        );
        assert_eq!(uis.len(), 1);
        assert_eq!(
            uis[0].meta.get("resourceUri").and_then(|v| v.as_str()),
            Some("ui://weather/forecast")
        );
    }

    #[test]
    fn test_unrelated_decorators_skipped() {
        let (tools, uis) = scan(
            r#"
            class T {
                @memoize()
                @tool({ id: "t" })
                run() {}
            }
            "#,
        );
        assert_eq!(tools.len(), 1);
        assert!(uis.is_empty());
    }
}
