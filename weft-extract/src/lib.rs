//! Tool Extractor: scans annotated TypeScript sources, infers or validates
//! schemas, and emits the tool manifest.
//!
//! The run is a sequential async pipeline. A failure scoped to one file or
//! one annotation becomes a diagnostic and the batch continues; only an
//! unwritable output directory aborts the run.

pub mod literal;
pub mod scan;
pub mod schema;
pub mod sources;
pub mod types;
pub mod types_config;

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tracing::{debug, info, warn};
use weft_core::config::Config;
use weft_core::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink, stage_success};
use weft_core::error::Result;
use weft_core::manifest::{
    TOOL_MANIFEST_VERSION, ToolDefinition, ToolManifest, UiComponentDeclaration,
    generation_timestamp, save_json, tool_manifest_path,
};
use weft_core::uri::is_valid_resource_uri;

use crate::scan::{Scanner, ToolSite, UiSite, scan_annotations};
use crate::schema::Inferencer;
use crate::sources::resolve_globs;
use crate::types::TypeTable;
use crate::types_config::load_types_config;

pub const GENERATOR: &str = "weft-extract";

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub strict: bool,
}

#[derive(Debug)]
pub struct ExtractResult {
    pub manifest: ToolManifest,
    pub diagnostics: Vec<Diagnostic>,
    pub success: bool,
}

struct ParsedFile {
    path: PathBuf,
    source: String,
    tree: tree_sitter::Tree,
}

/// Run the extraction stage and persist the tool manifest.
pub async fn extract_tools(
    config: &Config,
    root: &Path,
    options: ExtractOptions,
) -> Result<ExtractResult> {
    let mut sink = DiagnosticSink::new();

    let sources = resolve_globs(&config.tool_globs, root, &mut sink);
    debug!(files = sources.len(), "resolved tool globs");

    let types_config = load_types_config(
        &config.types_config_in(root),
        &config.types_config,
        &mut sink,
    )
    .await;
    let include_files = match &types_config {
        Some(tc) => resolve_globs(&tc.include, root, &mut sink),
        None => Vec::new(),
    };

    // The type program spans the globbed sources plus the types config's
    // include set; only globbed files are scanned for annotations.
    let annotated: BTreeSet<&PathBuf> = sources.iter().collect();
    let program: BTreeSet<&PathBuf> = sources.iter().chain(include_files.iter()).collect();

    let mut scanner = Scanner::new()?;
    let mut type_table = TypeTable::new();
    let mut parsed = Vec::new();
    for path in program {
        let source = match tokio::fs::read_to_string(path).await {
            Ok(source) => source,
            Err(err) => {
                sink.push(
                    Diagnostic::warning(
                        DiagnosticCode::SourceFileSkipped,
                        format!("Unable to read {}: {err}", path.display()),
                    )
                    .at(path.display().to_string()),
                );
                continue;
            }
        };
        let Some(tree) = scanner.parse(&source) else {
            sink.push(
                Diagnostic::warning(
                    DiagnosticCode::SourceFileSkipped,
                    format!("Unable to parse {}", path.display()),
                )
                .at(path.display().to_string()),
            );
            continue;
        };
        type_table.collect(tree.root_node(), &source);
        if annotated.contains(path) {
            parsed.push(ParsedFile {
                path: path.clone(),
                source,
                tree,
            });
        }
    }
    debug!(types = type_table.len(), "collected type table");

    let mut tools: Vec<ToolDefinition> = Vec::new();
    let mut ui_components: Vec<UiComponentDeclaration> = Vec::new();
    let mut seen_ids = HashSet::new();

    for file in &parsed {
        let location = file.path.display().to_string();
        let (tool_sites, ui_sites) = scan_annotations(file.tree.root_node(), &file.source);
        for site in tool_sites {
            if let Some(tool) =
                process_tool_site(site, &location, &mut seen_ids, &type_table, &mut sink)
            {
                tools.push(tool);
            }
        }
        for site in ui_sites {
            if let Some(ui) = process_ui_site(site, &location, &mut sink) {
                ui_components.push(ui);
            }
        }
    }

    // Resolve deferred UI resource URIs from the matching tool definitions.
    for ui in &mut ui_components {
        if !ui.resource_uri.is_empty() {
            continue;
        }
        let resolved = tools
            .iter()
            .find(|t| t.id == ui.tool_id)
            .and_then(|t| t.resource_uri.clone());
        match resolved {
            Some(uri) => ui.resource_uri = uri,
            None => sink.push(
                Diagnostic::error(
                    DiagnosticCode::ResourceUriUnresolved,
                    format!(
                        "UI component for tool {} is missing resourceUri and it could not be inferred from the tool definition.",
                        ui.tool_id
                    ),
                )
                .at(ui.entry.clone())
                .suggest(
                    "Ensure the tool has a resourceUri in its @tool annotation, or provide one in the @uiComponent annotation.",
                ),
            ),
        }
    }

    let manifest = ToolManifest {
        manifest_version: TOOL_MANIFEST_VERSION.to_string(),
        name: config.name.clone(),
        version: config.version.clone(),
        generated_by: GENERATOR.to_string(),
        generated_at: generation_timestamp(),
        tools,
        ui_components,
    };

    let manifest_path = tool_manifest_path(&config.out_dir_in(root));
    save_json(&manifest_path, &manifest).await?;

    let diagnostics = sink.into_vec();
    let success = stage_success(&diagnostics, options.strict);
    if success {
        info!(path = %manifest_path.display(), tools = manifest.tools.len(), "wrote tool manifest");
    } else {
        warn!(count = diagnostics.len(), "extraction emitted diagnostics");
    }

    Ok(ExtractResult {
        manifest,
        diagnostics,
        success,
    })
}

fn process_tool_site(
    site: ToolSite,
    file: &str,
    seen_ids: &mut HashSet<String>,
    type_table: &TypeTable,
    sink: &mut DiagnosticSink,
) -> Option<ToolDefinition> {
    let meta_id = site.meta.get("id").and_then(Value::as_str);
    let meta_name = site.meta.get("name").and_then(Value::as_str);
    let id = meta_id
        .or(meta_name)
        .map(str::to_string)
        .or_else(|| site.fn_name.clone());
    let Some(id) = id else {
        sink.push(
            Diagnostic::error(
                DiagnosticCode::ToolIdMissing,
                format!("Tool missing id in {file}"),
            )
            .at(file),
        );
        return None;
    };
    // First occurrence wins.
    if !seen_ids.insert(id.clone()) {
        sink.push(
            Diagnostic::error(
                DiagnosticCode::ToolIdDuplicate,
                format!("Duplicate tool id {id} in {file}"),
            )
            .at(file),
        );
        return None;
    }

    let input_schema = site
        .meta
        .get("inputSchema")
        .cloned()
        .or_else(|| infer_input_schema(&site, &id, file, type_table, sink));
    let output_schema = site.meta.get("outputSchema").cloned().or_else(|| {
        site.return_type.as_ref().and_then(|descriptor| {
            Inferencer::new(type_table, &id, file).infer(descriptor, "output", sink)
        })
    });

    if input_schema.is_none() {
        sink.push(
            Diagnostic::error(
                DiagnosticCode::ToolSchemaMissing,
                format!("inputSchema missing for tool {id}"),
            )
            .at(file)
            .suggest(
                "Add inputSchema to the @tool annotation or ensure the first parameter has a supported type annotation.",
            ),
        );
    }

    let resource_uri = site
        .meta
        .get("resourceUri")
        .and_then(Value::as_str)
        .map(str::to_string);
    match &resource_uri {
        None => sink.push(
            Diagnostic::warning(
                DiagnosticCode::ResourceUriMissing,
                format!("Tool {id} is missing resourceUri; ensure it maps to a ui:// namespace/resource"),
            )
            .at(file),
        ),
        Some(uri) if !is_valid_resource_uri(uri) => sink.push(
            Diagnostic::error(
                DiagnosticCode::ResourceUriInvalid,
                format!("Invalid resourceUri for tool {id}: {uri}"),
            )
            .at(file)
            .suggest("Expected format ui://namespace/resource"),
        ),
        Some(_) => {}
    }

    Some(ToolDefinition {
        name: meta_name.unwrap_or(&id).to_string(),
        description: site
            .meta
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        // The tool stays in the manifest even without a schema so the
        // manifest remains structurally valid.
        input_schema: input_schema.unwrap_or_else(|| json!({})),
        output_schema,
        resource_uri,
        preview_template: site
            .meta
            .get("previewTemplate")
            .and_then(Value::as_str)
            .map(str::to_string),
        id,
    })
}

fn infer_input_schema(
    site: &ToolSite,
    tool_id: &str,
    file: &str,
    type_table: &TypeTable,
    sink: &mut DiagnosticSink,
) -> Option<Value> {
    if !site.has_params {
        return Some(json!({"type": "object", "properties": {}}));
    }
    match &site.first_param_type {
        None => {
            sink.push(
                Diagnostic::warning(
                    DiagnosticCode::SchemaInferMissingType,
                    format!(
                        "Cannot infer input schema for {tool_id}; first parameter lacks a type annotation."
                    ),
                )
                .at(file),
            );
            None
        }
        Some(descriptor) => {
            Inferencer::new(type_table, tool_id, file).infer(descriptor, "input", sink)
        }
    }
}

fn process_ui_site(
    site: UiSite,
    file: &str,
    sink: &mut DiagnosticSink,
) -> Option<UiComponentDeclaration> {
    let Some(tool_id) = site.meta.get("toolId").and_then(Value::as_str) else {
        sink.push(
            Diagnostic::error(
                DiagnosticCode::UiToolIdMissing,
                format!("UI component missing toolId in {file}"),
            )
            .at(file),
        );
        return None;
    };
    Some(UiComponentDeclaration {
        tool_id: tool_id.to_string(),
        resource_uri: site
            .meta
            .get("resourceUri")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        entry: file.to_string(),
        preview_template: site
            .meta
            .get("previewTemplate")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}
