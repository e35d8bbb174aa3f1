//! Build-stage reconciliation runs with injected bundlers.

use std::path::Path;

use async_trait::async_trait;
use serde_json::json;
use weft_build::{BuildOptions, BuildRequest, Bundler, BundlerError, build_apps};
use weft_core::config::{AppResource, Config};
use weft_core::diagnostic::DiagnosticCode;
use weft_core::manifest::{
    TOOL_MANIFEST_VERSION, ToolDefinition, ToolManifest, generation_timestamp, save_json,
    tool_manifest_path,
};

/// Writes a plausible static asset tree without invoking a real bundler.
struct FakeBundler;

#[async_trait]
impl Bundler for FakeBundler {
    async fn build(&self, request: &BuildRequest) -> Result<(), BundlerError> {
        let assets = request.out_dir.join("assets");
        std::fs::create_dir_all(&assets).map_err(|e| BundlerError(e.to_string()))?;
        std::fs::write(request.out_dir.join("index.html"), "<html><div id=\"root\"></div></html>")
            .map_err(|e| BundlerError(e.to_string()))?;
        std::fs::write(assets.join("index-abc.js"), "console.log('ok');")
            .map_err(|e| BundlerError(e.to_string()))?;
        Ok(())
    }
}

struct FailingBundler;

#[async_trait]
impl Bundler for FailingBundler {
    async fn build(&self, _request: &BuildRequest) -> Result<(), BundlerError> {
        Err(BundlerError("vite exited with code 1".to_string()))
    }
}

fn base_config() -> Config {
    let mut config = Config::adhoc(vec!["tools/**/*.ts".to_string()]);
    config.name = "test".to_string();
    config.version = "0.0.0".to_string();
    config
}

fn tool(id: &str, resource_uri: Option<&str>) -> ToolDefinition {
    ToolDefinition {
        id: id.to_string(),
        name: id.to_string(),
        description: None,
        input_schema: json!({}),
        output_schema: None,
        resource_uri: resource_uri.map(str::to_string),
        preview_template: None,
    }
}

async fn write_tool_manifest(root: &Path, config: &Config, tools: Vec<ToolDefinition>) {
    let manifest = ToolManifest {
        manifest_version: TOOL_MANIFEST_VERSION.to_string(),
        name: "test".to_string(),
        version: "0.0.0".to_string(),
        generated_by: "test".to_string(),
        generated_at: generation_timestamp(),
        tools,
        ui_components: Vec::new(),
    };
    save_json(&tool_manifest_path(&config.out_dir_in(root)), &manifest)
        .await
        .unwrap();
}

async fn write_entry(root: &Path, relative: &str) -> String {
    let path = root.join(relative);
    tokio::fs::create_dir_all(path.parent().unwrap())
        .await
        .unwrap();
    tokio::fs::write(
        &path,
        "import { createRoot } from \"react-dom/client\";\ncreateRoot(document.getElementById(\"root\")).render(null);\n",
    )
    .await
    .unwrap();
    relative.to_string()
}

fn resource(tool_id: &str, uri: &str, entry: &str) -> AppResource {
    AppResource {
        tool_id: tool_id.to_string(),
        resource_uri: uri.to_string(),
        entry: entry.to_string(),
        standalone: None,
    }
}

fn strict() -> BuildOptions {
    BuildOptions { strict: true }
}

#[tokio::test]
async fn matching_binding_builds_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    write_tool_manifest(
        dir.path(),
        &config,
        vec![tool("weather.getForecast", Some("ui://weather/forecast"))],
    )
    .await;
    let entry = write_entry(dir.path(), "apps/weather/forecast/main.tsx").await;
    config.app_resources = vec![resource(
        "weather.getForecast",
        "ui://weather/forecast",
        &entry,
    )];

    let result = build_apps(&config, dir.path(), &FakeBundler, strict())
        .await
        .unwrap();

    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.manifest.resources.len(), 1);
    let entry = &result.manifest.resources[0];
    assert_eq!(entry.entry_file, "weather/forecast/index.html");
    assert_eq!(entry.assets, vec!["weather/forecast/assets/index-abc.js"]);

    // Everything the manifest claims exists on disk.
    let dist = config.dist_dir_in(dir.path());
    assert!(dist.join(&entry.entry_file).is_file());
    for asset in &entry.assets {
        assert!(dist.join(asset).is_file());
    }
}

#[tokio::test]
async fn mismatched_binding_reports_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    write_tool_manifest(
        dir.path(),
        &config,
        vec![tool("tool.one", Some("ui://demo/alpha"))],
    )
    .await;
    let entry = write_entry(dir.path(), "apps/demo/beta/main.tsx").await;
    config.app_resources = vec![resource("tool.one", "ui://demo/beta", &entry)];

    let result = build_apps(&config, dir.path(), &FakeBundler, strict())
        .await
        .unwrap();

    assert!(!result.success);
    let codes: Vec<_> = result.diagnostics.iter().map(|d| d.code).collect();
    assert!(codes.contains(&DiagnosticCode::ToolUiMismatch));
    assert!(codes.contains(&DiagnosticCode::ResourceUriUnmapped));
}

#[tokio::test]
async fn missing_entry_file_skips_build() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    write_tool_manifest(
        dir.path(),
        &config,
        vec![tool("tool.one", Some("ui://demo/alpha"))],
    )
    .await;
    config.app_resources = vec![resource("tool.one", "ui://demo/alpha", "apps/missing.tsx")];

    let result = build_apps(&config, dir.path(), &FakeBundler, strict())
        .await
        .unwrap();

    let missing: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::BuildEntryfileMissing)
        .collect();
    assert_eq!(missing.len(), 1);
    assert!(result.manifest.resources.is_empty());
}

#[tokio::test]
async fn duplicate_resource_uri_builds_at_most_one() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    write_tool_manifest(
        dir.path(),
        &config,
        vec![
            tool("tool.one", Some("ui://demo/shared")),
            tool("tool.two", None),
        ],
    )
    .await;
    let entry_a = write_entry(dir.path(), "apps/a/main.tsx").await;
    let entry_b = write_entry(dir.path(), "apps/b/main.tsx").await;
    config.app_resources = vec![
        resource("tool.one", "ui://demo/shared", &entry_a),
        resource("tool.two", "ui://demo/shared", &entry_b),
    ];

    let result = build_apps(&config, dir.path(), &FakeBundler, strict())
        .await
        .unwrap();

    let duplicates: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::ResourceUriDuplicate)
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(result.manifest.resources.len(), 1);
}

#[tokio::test]
async fn tool_mapped_twice_is_flagged_but_still_builds() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    write_tool_manifest(dir.path(), &config, vec![tool("tool.one", None)]).await;
    let entry_a = write_entry(dir.path(), "apps/a/main.tsx").await;
    let entry_b = write_entry(dir.path(), "apps/b/main.tsx").await;
    config.app_resources = vec![
        resource("tool.one", "ui://demo/first", &entry_a),
        resource("tool.one", "ui://demo/second", &entry_b),
    ];

    let result = build_apps(&config, dir.path(), &FakeBundler, strict())
        .await
        .unwrap();

    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::ToolUiDuplicate));
    // The run continues; both entries still build.
    assert_eq!(result.manifest.resources.len(), 2);
}

#[tokio::test]
async fn failing_bundler_continues_with_remaining_entries() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    write_tool_manifest(
        dir.path(),
        &config,
        vec![
            tool("tool.one", Some("ui://demo/one")),
            tool("tool.two", Some("ui://demo/two")),
        ],
    )
    .await;
    let entry_a = write_entry(dir.path(), "apps/one/main.tsx").await;
    let entry_b = write_entry(dir.path(), "apps/two/main.tsx").await;
    config.app_resources = vec![
        resource("tool.one", "ui://demo/one", &entry_a),
        resource("tool.two", "ui://demo/two", &entry_b),
    ];

    let result = build_apps(&config, dir.path(), &FailingBundler, strict())
        .await
        .unwrap();

    let failures: Vec<_> = result
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::BuildFailed)
        .collect();
    assert_eq!(failures.len(), 2);
    assert!(failures[0].message.contains("vite exited"));
    assert!(result.manifest.resources.is_empty());
}

#[tokio::test]
async fn missing_tool_manifest_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    let entry = write_entry(dir.path(), "apps/a/main.tsx").await;
    config.app_resources = vec![resource("tool.one", "ui://demo/one", &entry)];

    let result = build_apps(&config, dir.path(), &FakeBundler, BuildOptions::default())
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::ToolManifestMissing));
}

#[tokio::test]
async fn internal_resources_exempt_from_mapping_checks() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = base_config();
    write_tool_manifest(dir.path(), &config, vec![]).await;
    let entry = write_entry(dir.path(), "apps/preview/main.tsx").await;
    config.app_resources = vec![resource("_weft.preview", "ui://preview/demo", &entry)];

    let result = build_apps(&config, dir.path(), &FakeBundler, strict())
        .await
        .unwrap();

    assert!(result.success, "diagnostics: {:?}", result.diagnostics);
    assert_eq!(result.manifest.resources.len(), 1);
}
