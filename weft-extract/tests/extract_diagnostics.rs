//! End-to-end extraction runs against scratch projects on disk.

use std::path::Path;

use serde_json::json;
use weft_core::config::Config;
use weft_core::diagnostic::DiagnosticCode;
use weft_core::manifest::{ManifestLoad, ToolManifest, load_json, tool_manifest_path};
use weft_extract::{ExtractOptions, extract_tools};

fn base_config() -> Config {
    let mut config = Config::adhoc(vec!["tools/**/*.ts".to_string()]);
    config.name = "test".to_string();
    config.version = "0.0.0".to_string();
    config
}

async fn write_tool_source(root: &Path, name: &str, source: &str) {
    let dir = root.join("tools");
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join(name), source).await.unwrap();
}

fn strict() -> ExtractOptions {
    ExtractOptions { strict: true }
}

#[tokio::test]
async fn warns_when_tool_omits_resource_uri() {
    let dir = tempfile::tempdir().unwrap();
    write_tool_source(
        dir.path(),
        "weather.ts",
        r#"
        export class WeatherTool {
            @tool({ id: "weather.getForecast", inputSchema: { type: "object", properties: {} } })
            run(input: { city: string }) {
                return { city: input.city };
            }
        }
        "#,
    )
    .await;

    let result = extract_tools(&base_config(), dir.path(), strict())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.diagnostics.iter().any(|d| {
        d.code == DiagnosticCode::ResourceUriMissing && d.severity.is_warning()
    }));
    assert_eq!(result.manifest.tools.len(), 1);
}

#[tokio::test]
async fn fails_on_duplicate_tool_ids_and_keeps_first() {
    let dir = tempfile::tempdir().unwrap();
    write_tool_source(
        dir.path(),
        "dupe.ts",
        r#"
        export class First {
            @tool({ id: "dup.tool", inputSchema: { type: "object", properties: {} }, resourceUri: "ui://demo/one" })
            run() { return { ok: true }; }
        }

        export class Second {
            @tool({ id: "dup.tool", inputSchema: { type: "object", properties: {} }, resourceUri: "ui://demo/two" })
            run() { return { ok: true }; }
        }
        "#,
    )
    .await;

    let result = extract_tools(&base_config(), dir.path(), strict())
        .await
        .unwrap();

    assert!(!result.success);
    let duplicates: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::ToolIdDuplicate)
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(result.manifest.tools.len(), 1);
    assert_eq!(
        result.manifest.tools[0].resource_uri.as_deref(),
        Some("ui://demo/one")
    );
}

#[tokio::test]
async fn rejects_invalid_resource_uri() {
    let dir = tempfile::tempdir().unwrap();
    write_tool_source(
        dir.path(),
        "bad.ts",
        r#"
        export class Bad {
            @tool({ id: "bad.tool", inputSchema: {}, resourceUri: "ui://bad uri" })
            run() { return {}; }
        }
        "#,
    )
    .await;

    let result = extract_tools(&base_config(), dir.path(), strict())
        .await
        .unwrap();

    assert!(result.diagnostics.iter().any(|d| {
        d.code == DiagnosticCode::ResourceUriInvalid && d.severity.is_error()
    }));
}

#[tokio::test]
async fn infers_input_schema_from_parameter_type() {
    let dir = tempfile::tempdir().unwrap();
    write_tool_source(
        dir.path(),
        "typed.ts",
        r#"
        interface ForecastInput {
            location: string;
            days?: number;
        }

        export class WeatherTool {
            @tool({ id: "weather.getForecast", resourceUri: "ui://weather/forecast" })
            async getForecast(input: ForecastInput): Promise<{ summary: string }> {
                return { summary: "sunny" };
            }
        }
        "#,
    )
    .await;

    let result = extract_tools(&base_config(), dir.path(), strict())
        .await
        .unwrap();

    let tool = &result.manifest.tools[0];
    assert_eq!(
        tool.input_schema,
        json!({
            "type": "object",
            "properties": {
                "location": {"type": "string"},
                "days": {"type": "number"}
            },
            "required": ["location"]
        })
    );
    assert_eq!(
        tool.output_schema,
        Some(json!({
            "type": "object",
            "properties": {"summary": {"type": "string"}},
            "required": ["summary"]
        }))
    );
}

#[tokio::test]
async fn missing_schema_records_tool_with_empty_object() {
    let dir = tempfile::tempdir().unwrap();
    write_tool_source(
        dir.path(),
        "untyped.ts",
        r#"
        export class T {
            @tool({ id: "untyped.tool", resourceUri: "ui://demo/untyped" })
            run(input) { return input; }
        }
        "#,
    )
    .await;

    let result = extract_tools(&base_config(), dir.path(), strict())
        .await
        .unwrap();

    let codes: Vec<_> = result.diagnostics.iter().map(|d| d.code).collect();
    assert!(codes.contains(&DiagnosticCode::SchemaInferMissingType));
    assert!(codes.contains(&DiagnosticCode::ToolSchemaMissing));
    // Still recorded, with an empty schema, to keep the manifest valid.
    assert_eq!(result.manifest.tools.len(), 1);
    assert_eq!(result.manifest.tools[0].input_schema, json!({}));
}

#[tokio::test]
async fn ui_component_resolves_uri_from_tool() {
    let dir = tempfile::tempdir().unwrap();
    write_tool_source(
        dir.path(),
        "both.ts",
        r#"
        export class WeatherTool {
            @tool({ id: "weather.getForecast", inputSchema: {}, resourceUri: "ui://weather/forecast" })
            run() { return {}; }
        }

        @uiComponent("weather.getForecast")
        export class ForecastView {}
        "#,
    )
    .await;

    let result = extract_tools(&base_config(), dir.path(), strict())
        .await
        .unwrap();

    assert_eq!(result.manifest.ui_components.len(), 1);
    assert_eq!(
        result.manifest.ui_components[0].resource_uri,
        "ui://weather/forecast"
    );
}

#[tokio::test]
async fn unresolvable_ui_component_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_tool_source(
        dir.path(),
        "orphan.ts",
        r#"
        @uiComponent("nowhere.tool")
        export class OrphanView {}
        "#,
    )
    .await;

    let result = extract_tools(&base_config(), dir.path(), strict())
        .await
        .unwrap();

    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::ResourceUriUnresolved && d.severity.is_error()));
}

#[tokio::test]
async fn extraction_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_tool_source(
        dir.path(),
        "stable.ts",
        r#"
        export class Stable {
            @tool({ id: "stable.tool", inputSchema: {}, resourceUri: "ui://demo/stable" })
            run(input: { q: string }) { return input; }
        }
        "#,
    )
    .await;

    let config = base_config();
    let first = extract_tools(&config, dir.path(), strict()).await.unwrap();
    let second = extract_tools(&config, dir.path(), strict()).await.unwrap();

    assert_eq!(first.manifest.tools, second.manifest.tools);
    assert_eq!(first.manifest.ui_components, second.manifest.ui_components);
}

#[tokio::test]
async fn manifest_persisted_to_out_dir() {
    let dir = tempfile::tempdir().unwrap();
    write_tool_source(
        dir.path(),
        "persist.ts",
        r#"
        export class P {
            @tool({ id: "persist.tool", inputSchema: {}, resourceUri: "ui://demo/persist" })
            run() { return {}; }
        }
        "#,
    )
    .await;

    let config = base_config();
    extract_tools(&config, dir.path(), ExtractOptions::default())
        .await
        .unwrap();

    let path = tool_manifest_path(&config.out_dir_in(dir.path()));
    match load_json::<ToolManifest>(&path).await {
        ManifestLoad::Loaded(manifest) => {
            assert_eq!(manifest.generated_by, "weft-extract");
            assert_eq!(manifest.tools.len(), 1);
        }
        other => panic!("expected persisted manifest, got {other:?}"),
    }
}

#[tokio::test]
async fn explicit_missing_types_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_tool_source(
        dir.path(),
        "plain.ts",
        r#"
        export class P {
            @tool({ id: "plain.tool", inputSchema: {}, resourceUri: "ui://demo/plain" })
            run() { return {}; }
        }
        "#,
    )
    .await;

    let mut config = base_config();
    config.types_config = "custom.tsconfig.json".to_string();

    let result = extract_tools(&config, dir.path(), ExtractOptions::default())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::TypeConfigMissing));
    // Reduced capability, not an abort: the manifest still exists.
    assert_eq!(result.manifest.tools.len(), 1);
}

#[tokio::test]
async fn types_config_include_extends_type_program() {
    let dir = tempfile::tempdir().unwrap();
    let shared = dir.path().join("shared");
    tokio::fs::create_dir_all(&shared).await.unwrap();
    tokio::fs::write(
        shared.join("types.ts"),
        "export interface SharedInput { q: string; }",
    )
    .await
    .unwrap();
    tokio::fs::write(
        dir.path().join("tsconfig.json"),
        r#"{"include": ["shared/**/*.ts"]}"#,
    )
    .await
    .unwrap();
    write_tool_source(
        dir.path(),
        "uses_shared.ts",
        r#"
        export class S {
            @tool({ id: "shared.tool", resourceUri: "ui://demo/shared" })
            run(input: SharedInput) { return input; }
        }
        "#,
    )
    .await;

    let result = extract_tools(&base_config(), dir.path(), strict())
        .await
        .unwrap();

    let tool = &result.manifest.tools[0];
    assert_eq!(
        tool.input_schema,
        json!({
            "type": "object",
            "properties": {"q": {"type": "string"}},
            "required": ["q"]
        })
    );
}
