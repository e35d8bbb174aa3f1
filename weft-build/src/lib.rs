//! Resource Builder: reconciles the declarative resource mapping against the
//! tool manifest, drives UI builds, and emits the apps manifest.
//!
//! One bad entry never aborts the run: every per-resource failure becomes a
//! diagnostic and the remaining entries still build.

pub mod assets;
pub mod bundler;
pub mod scaffold;

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};
use weft_core::config::Config;
use weft_core::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink, stage_success};
use weft_core::error::Result;
use weft_core::manifest::{
    APPS_MANIFEST_VERSION, AppsManifest, AppsManifestEntry, ManifestLoad, ToolManifest,
    apps_manifest_path, generation_timestamp, load_json, save_json, tool_manifest_path,
};
use weft_core::uri::ResourceUri;

pub use crate::bundler::{BuildRequest, Bundler, BundlerError, bundler_from_config};
use crate::scaffold::prepare_scaffold;

pub const GENERATOR: &str = "weft-build";

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub strict: bool,
}

#[derive(Debug)]
pub struct BuildResult {
    pub manifest: AppsManifest,
    pub diagnostics: Vec<Diagnostic>,
    pub success: bool,
}

/// Run the build stage and persist the apps manifest.
pub async fn build_apps(
    config: &Config,
    root: &Path,
    bundler: &dyn Bundler,
    options: BuildOptions,
) -> Result<BuildResult> {
    let mut sink = DiagnosticSink::new();
    let out_dir = config.out_dir_in(root);
    let dist_dir = config.dist_dir_in(root);

    let manifest_path = tool_manifest_path(&out_dir);
    let tool_manifest: Option<ToolManifest> = match load_json(&manifest_path).await {
        ManifestLoad::Loaded(manifest) => Some(manifest),
        ManifestLoad::Missing => {
            sink.push(
                Diagnostic::error(
                    DiagnosticCode::ToolManifestMissing,
                    "tool.manifest.json not found",
                )
                .at(manifest_path.display().to_string()),
            );
            None
        }
        ManifestLoad::Invalid(detail) => {
            sink.push(
                Diagnostic::error(
                    DiagnosticCode::ToolManifestInvalid,
                    format!("Failed to parse {}", manifest_path.display()),
                )
                .at(manifest_path.display().to_string())
                .detail(detail),
            );
            None
        }
    };

    let mut seen_resources: HashSet<&str> = HashSet::new();
    let mut seen_tools: HashSet<&str> = HashSet::new();
    let mut resources = Vec::new();

    for resource in &config.app_resources {
        if !seen_resources.insert(resource.resource_uri.as_str()) {
            sink.push(Diagnostic::error(
                DiagnosticCode::ResourceUriDuplicate,
                format!("Duplicate resourceUri {} in config", resource.resource_uri),
            ));
            continue;
        }

        let internal = resource.is_internal();
        if seen_tools.contains(resource.tool_id.as_str()) && !internal {
            sink.push(
                Diagnostic::error(
                    DiagnosticCode::ToolUiDuplicate,
                    format!("Tool {} is mapped to multiple resources", resource.tool_id),
                )
                .at(out_dir.display().to_string()),
            );
        }
        seen_tools.insert(resource.tool_id.as_str());

        let tool_entry = tool_manifest
            .as_ref()
            .and_then(|m| m.tool(&resource.tool_id));
        match tool_entry {
            None if !internal => {
                sink.push(
                    Diagnostic::error(
                        DiagnosticCode::ToolIdMissing,
                        format!(
                            "Tool {} from config not found in tool.manifest.json",
                            resource.tool_id
                        ),
                    )
                    .at(manifest_path.display().to_string()),
                );
            }
            Some(tool) => {
                if let Some(manifest_uri) = tool
                    .resource_uri
                    .as_deref()
                    .filter(|uri| !uri.is_empty() && *uri != resource.resource_uri)
                    && !internal
                {
                    sink.push(
                        Diagnostic::error(
                            DiagnosticCode::ToolUiMismatch,
                            format!(
                                "Tool {} is mapped to {} in config but {} in tool.manifest.json",
                                resource.tool_id, resource.resource_uri, manifest_uri
                            ),
                        )
                        .at(manifest_path.display().to_string()),
                    );
                }
            }
            None => {}
        }

        let entry_path = if Path::new(&resource.entry).is_absolute() {
            Path::new(&resource.entry).to_path_buf()
        } else {
            root.join(&resource.entry)
        };
        if !entry_path.is_file() {
            sink.push(Diagnostic::error(
                DiagnosticCode::BuildEntryfileMissing,
                format!(
                    "Entry file missing for {}: {}",
                    resource.resource_uri, resource.entry
                ),
            ));
            continue;
        }

        let Some(uri) = ResourceUri::parse(&resource.resource_uri) else {
            sink.push(Diagnostic::error(
                DiagnosticCode::ResourceUriInvalid,
                format!(
                    "Invalid resourceUri {} (expected ui://namespace/resource)",
                    resource.resource_uri
                ),
            ));
            continue;
        };

        let resource_dist = dist_dir.join(&uri.namespace).join(&uri.resource);
        let scaffold = match prepare_scaffold(&out_dir, resource, &uri, &entry_path).await {
            Ok(scaffold) => scaffold,
            Err(err) => {
                sink.push(Diagnostic::error(
                    DiagnosticCode::BuildFailed,
                    format!("Failed to scaffold {}: {err}", resource.resource_uri),
                ));
                continue;
            }
        };

        let request = BuildRequest {
            scaffold_root: scaffold.root,
            entry_html: scaffold.entry_html,
            out_dir: resource_dist.clone(),
            base: config.base_path_for(&uri.namespace, &uri.resource),
            assets_inline_limit: config.bundler.assets_inline_limit,
        };
        if let Err(err) = bundler.build(&request).await {
            sink.push(Diagnostic::error(
                DiagnosticCode::BuildFailed,
                format!("Build failed for {}: {err}", resource.resource_uri),
            ));
            continue;
        }

        resources.push(AppsManifestEntry {
            resource_uri: resource.resource_uri.clone(),
            tool_id: resource.tool_id.clone(),
            entry_file: format!("{}/{}/index.html", uri.namespace, uri.resource),
            assets: assets::collect_assets(&resource_dist, &dist_dir),
        });
    }

    let manifest = AppsManifest {
        manifest_version: APPS_MANIFEST_VERSION.to_string(),
        name: config.name.clone(),
        version: config.version.clone(),
        generated_by: GENERATOR.to_string(),
        generated_at: generation_timestamp(),
        out_dir: dist_dir.display().to_string(),
        resources,
    };
    let apps_path = apps_manifest_path(&out_dir);
    save_json(&apps_path, &manifest).await?;

    // Reverse check: every tool-declared resource must be mapped in config.
    if let Some(tool_manifest) = &tool_manifest {
        let configured: HashSet<&str> = config
            .app_resources
            .iter()
            .map(|r| r.resource_uri.as_str())
            .collect();
        for tool in &tool_manifest.tools {
            if let Some(uri) = tool.resource_uri.as_deref()
                && !configured.contains(uri)
            {
                sink.push(
                    Diagnostic::error(
                        DiagnosticCode::ResourceUriUnmapped,
                        format!(
                            "Tool {} references {uri} but it is missing from config/app_resources",
                            tool.id
                        ),
                    )
                    .at(apps_path.display().to_string()),
                );
            }
        }
    }

    let diagnostics = sink.into_vec();
    let success = stage_success(&diagnostics, options.strict);
    if success {
        info!(path = %apps_path.display(), resources = manifest.resources.len(), "wrote apps manifest");
    } else {
        warn!(count = diagnostics.len(), "build emitted diagnostics");
    }

    Ok(BuildResult {
        manifest,
        diagnostics,
        success,
    })
}
