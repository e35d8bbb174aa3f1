//! Manifest Reconciler / Verifier: cross-checks the persisted manifests
//! against each other, the distribution tree, and a reachable dev server.
//!
//! Static checks need no network; live checks go through the injectable
//! [`HttpFetch`] capability and every fetch failure becomes a diagnostic,
//! never an early return.

pub mod fetch;
pub mod html;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::json;
use tracing::{info, warn};
use weft_core::config::Config;
use weft_core::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink, verify_success};
use weft_core::env_bool;
use weft_core::error::Result;
use weft_core::manifest::{
    AppsManifest, ManifestLoad, ToolManifest, VerifyReport, apps_manifest_path, load_json,
    save_json, tool_manifest_path, verify_report_path,
};
use weft_core::uri::ResourceUri;

pub use crate::fetch::{FetchResponse, HttpFetch, ReqwestFetch};
use crate::html::{extract_asset_links, has_root_element, looks_like_html};

#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub strict: bool,
    /// Deep asset/boot checking; defaults from `WEFT_VERIFY_HEADLESS`.
    pub headless: Option<bool>,
    /// Server to probe; defaults to the configured host and port.
    pub base_url: Option<String>,
}

#[derive(Debug)]
pub struct VerifyResult {
    pub diagnostics: Vec<Diagnostic>,
    pub success: bool,
    pub headless: bool,
}

/// Run the verify stage and persist the report.
pub async fn verify(
    config: &Config,
    root: &Path,
    fetch: &dyn HttpFetch,
    options: VerifyOptions,
) -> Result<VerifyResult> {
    let mut sink = DiagnosticSink::new();
    let out_dir = config.out_dir_in(root);
    let dist_dir = config.dist_dir_in(root);
    let headless = options.headless.unwrap_or_else(|| {
        env_bool(std::env::var("WEFT_VERIFY_HEADLESS").ok().as_deref(), false)
    });
    let base_url = options
        .base_url
        .unwrap_or_else(|| format!("http://{}:{}", config.server.host, config.server.port))
        .trim_end_matches('/')
        .to_string();

    let tool_path = tool_manifest_path(&out_dir);
    let apps_path = apps_manifest_path(&out_dir);
    let tool_manifest =
        load_manifest::<ToolManifest>(&tool_path, ManifestKind::Tool, &mut sink).await;
    let apps_manifest =
        load_manifest::<AppsManifest>(&apps_path, ManifestKind::Apps, &mut sink).await;

    if let (Some(tool_manifest), Some(apps_manifest)) = (&tool_manifest, &apps_manifest) {
        static_checks(
            tool_manifest,
            apps_manifest,
            &apps_path,
            &dist_dir,
            &mut sink,
        );
        live_checks(
            tool_manifest,
            apps_manifest,
            &base_url,
            headless,
            fetch,
            &mut sink,
        )
        .await;
    }

    let diagnostics = sink.into_vec();
    let report = VerifyReport {
        diagnostics: diagnostics.clone(),
        headless,
    };
    let report_path = verify_report_path(&out_dir);
    save_json(&report_path, &report).await?;

    let success = verify_success(&diagnostics, options.strict);
    if success {
        info!(path = %report_path.display(), "verify succeeded");
    } else {
        warn!(path = %report_path.display(), count = diagnostics.len(), "verify reported issues");
    }

    Ok(VerifyResult {
        diagnostics,
        success,
        headless,
    })
}

enum ManifestKind {
    Tool,
    Apps,
}

async fn load_manifest<T: serde::de::DeserializeOwned>(
    path: &Path,
    kind: ManifestKind,
    sink: &mut DiagnosticSink,
) -> Option<T> {
    let (missing_code, invalid_code, name) = match kind {
        ManifestKind::Tool => (
            DiagnosticCode::ToolManifestMissing,
            DiagnosticCode::ToolManifestInvalid,
            "tool.manifest.json",
        ),
        ManifestKind::Apps => (
            DiagnosticCode::AppsManifestMissing,
            DiagnosticCode::AppsManifestInvalid,
            "apps.manifest.json",
        ),
    };
    match load_json::<T>(path).await {
        ManifestLoad::Loaded(manifest) => Some(manifest),
        ManifestLoad::Missing => {
            sink.push(
                Diagnostic::error(missing_code, format!("{name} not found"))
                    .at(path.display().to_string()),
            );
            None
        }
        ManifestLoad::Invalid(detail) => {
            sink.push(
                Diagnostic::error(invalid_code, format!("Failed to parse {name}"))
                    .at(path.display().to_string())
                    .detail(detail),
            );
            None
        }
    }
}

fn static_checks(
    tool_manifest: &ToolManifest,
    apps_manifest: &AppsManifest,
    apps_path: &Path,
    dist_dir: &Path,
    sink: &mut DiagnosticSink,
) {
    let resource_uris: HashSet<&str> = apps_manifest
        .resources
        .iter()
        .map(|r| r.resource_uri.as_str())
        .collect();

    for tool in &tool_manifest.tools {
        if let Some(uri) = tool.resource_uri.as_deref()
            && !resource_uris.contains(uri)
        {
            sink.push(
                Diagnostic::error(
                    DiagnosticCode::ResourceUriUnmapped,
                    format!("Tool {} references {uri} but it is missing in apps manifest", tool.id),
                )
                .at(apps_path.display().to_string()),
            );
        }
    }

    let mut seen_uris: HashSet<&str> = HashSet::new();
    let mut tool_bindings: HashMap<&str, &str> = HashMap::new();
    for resource in &apps_manifest.resources {
        if ResourceUri::parse(&resource.resource_uri).is_none() {
            sink.push(
                Diagnostic::error(
                    DiagnosticCode::ResourceUriInvalid,
                    format!("Invalid resourceUri {} in apps manifest", resource.resource_uri),
                )
                .at(apps_path.display().to_string()),
            );
            continue;
        }
        if !seen_uris.insert(resource.resource_uri.as_str()) {
            sink.push(
                Diagnostic::error(
                    DiagnosticCode::ResourceUriDuplicate,
                    format!("Duplicate resourceUri {} in apps manifest", resource.resource_uri),
                )
                .at(apps_path.display().to_string()),
            );
        }

        // An orphaned build is tolerated, but worth flagging.
        if tool_manifest.tool(&resource.tool_id).is_none() {
            sink.push(Diagnostic::warning(
                DiagnosticCode::ToolIdMissing,
                format!(
                    "Tool {} from apps manifest not found in tool manifest",
                    resource.tool_id
                ),
            ));
        }

        let entry_path = dist_dir.join(&resource.entry_file);
        if !entry_path.is_file() {
            sink.push(Diagnostic::error(
                DiagnosticCode::BuildEntryfileMissing,
                format!(
                    "Entry file missing for {}: {}",
                    resource.resource_uri,
                    entry_path.display()
                ),
            ));
        }
        for asset in &resource.assets {
            let asset_path = dist_dir.join(asset);
            if !asset_path.is_file() {
                sink.push(Diagnostic::error(
                    DiagnosticCode::BuildAssetMissing,
                    format!(
                        "Asset missing for {}: {}",
                        resource.resource_uri,
                        asset_path.display()
                    ),
                ));
            }
        }

        match tool_bindings.get(resource.tool_id.as_str()) {
            Some(previous) if *previous != resource.resource_uri => {
                sink.push(Diagnostic::error(
                    DiagnosticCode::ToolUiDuplicate,
                    format!(
                        "Tool {} mapped to multiple resources ({previous} and {})",
                        resource.tool_id, resource.resource_uri
                    ),
                ));
            }
            _ => {
                tool_bindings.insert(resource.tool_id.as_str(), resource.resource_uri.as_str());
            }
        }
    }
}

async fn live_checks(
    tool_manifest: &ToolManifest,
    apps_manifest: &AppsManifest,
    base_url: &str,
    headless: bool,
    fetch: &dyn HttpFetch,
    sink: &mut DiagnosticSink,
) {
    for resource in &apps_manifest.resources {
        let Some(uri) = ResourceUri::parse(&resource.resource_uri) else {
            continue;
        };
        let url = format!("{base_url}{}", uri.route_prefix());
        match fetch.get(&url).await {
            Err(err) => {
                sink.push(
                    Diagnostic::error(
                        DiagnosticCode::ServerResourceResolveFail,
                        format!("Failed to fetch {}: {err}", resource.resource_uri),
                    )
                    .at(url.clone()),
                );
            }
            Ok(response) if !response.is_success() => {
                sink.push(
                    Diagnostic::error(
                        DiagnosticCode::ServerResourceResolveFail,
                        format!("Resource {} returned {}", resource.resource_uri, response.status),
                    )
                    .at(url.clone()),
                );
            }
            Ok(response) => {
                if !looks_like_html(&response.body) {
                    sink.push(
                        Diagnostic::warning(
                            DiagnosticCode::ResourceNotHtml,
                            format!("Resource {} did not return HTML", resource.resource_uri),
                        )
                        .at(url.clone()),
                    );
                }
                if headless {
                    boot_checks(resource.resource_uri.as_str(), &uri, &response.body, base_url, &url, fetch, sink)
                        .await;
                }
            }
        }
    }

    for tool in &tool_manifest.tools {
        let url = format!("{base_url}/tools/{}", tool.id);
        match fetch.post_json(&url, &json!({})).await {
            Err(err) => {
                sink.push(
                    Diagnostic::error(
                        DiagnosticCode::ServerToolcallFail,
                        format!("Failed to reach tool {}: {err}", tool.id),
                    )
                    .at(url.clone()),
                );
            }
            Ok(response) if !response.is_success() => {
                sink.push(
                    Diagnostic::error(
                        DiagnosticCode::ServerToolcallFail,
                        format!("Tool {} returned {}", tool.id, response.status),
                    )
                    .at(url.clone()),
                );
            }
            Ok(_) => {}
        }
    }
}

/// Deep check: fetch everything the served markup references and confirm the
/// mount point exists.
async fn boot_checks(
    resource_uri: &str,
    uri: &ResourceUri,
    body: &str,
    base_url: &str,
    page_url: &str,
    fetch: &dyn HttpFetch,
    sink: &mut DiagnosticSink,
) {
    for asset in extract_asset_links(body) {
        let asset_url = if asset.starts_with('/') {
            format!("{base_url}{asset}")
        } else {
            format!("{base_url}{}/{asset}", uri.route_prefix())
        };
        match fetch.get(&asset_url).await {
            Err(err) => {
                sink.push(
                    Diagnostic::error(
                        DiagnosticCode::UiBootFail,
                        format!("Headless check failed for {resource_uri}: {err}"),
                    )
                    .at(asset_url.clone()),
                );
            }
            Ok(response) if !response.is_success() => {
                sink.push(
                    Diagnostic::error(
                        DiagnosticCode::UiBootFail,
                        format!(
                            "Headless check failed fetching {asset} for {resource_uri}: {}",
                            response.status
                        ),
                    )
                    .at(asset_url.clone()),
                );
            }
            Ok(_) => {}
        }
    }
    if !has_root_element(body) {
        sink.push(
            Diagnostic::warning(
                DiagnosticCode::UiBootWarn,
                format!("Headless check: entry document for {resource_uri} missing root element"),
            )
            .at(page_url.to_string()),
        );
    }
}
