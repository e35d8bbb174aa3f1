//! Generated server artifacts.
//!
//! After a successful rebuild the orchestrator snapshots both manifests under
//! `server/src/generated/` and renders a typed route table plus one handler
//! stub per tool. Stubs are created once and never overwritten; the route
//! table is regenerated every run.

use std::path::Path;

use weft_core::error::{Error, Result};
use weft_core::manifest::{AppsManifest, ToolDefinition, ToolManifest, save_json};
use weft_core::uri::{ResourceUri, tool_id_to_filename};

pub async fn generate_server_artifacts(
    root: &Path,
    dist_dir: &Path,
    tool_manifest: &ToolManifest,
    apps_manifest: &AppsManifest,
) -> Result<()> {
    let generated_dir = root.join("server").join("src").join("generated");
    tokio::fs::create_dir_all(&generated_dir)
        .await
        .map_err(|e| Error::write(&generated_dir, e))?;

    save_json(&generated_dir.join("tool.manifest.json"), tool_manifest).await?;
    save_json(&generated_dir.join("apps.manifest.json"), apps_manifest).await?;

    let routes_path = generated_dir.join("routes.ts");
    tokio::fs::write(&routes_path, render_routes(dist_dir, tool_manifest, apps_manifest))
        .await
        .map_err(|e| Error::write(&routes_path, e))?;
    Ok(())
}

fn render_routes(
    dist_dir: &Path,
    tool_manifest: &ToolManifest,
    apps_manifest: &AppsManifest,
) -> String {
    let tool_routes = tool_manifest
        .tools
        .iter()
        .map(|tool| {
            format!(
                "  {{ toolId: \"{}\", handlerPath: \"../handlers/{}\" }}",
                tool.id,
                tool_id_to_filename(&tool.id)
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    let dist = dist_dir.display().to_string().replace('\\', "/");
    let resource_routes = apps_manifest
        .resources
        .iter()
        .map(|resource| {
            let dist_path = ResourceUri::parse(&resource.resource_uri)
                .map(|uri| format!("{dist}/{}/{}", uri.namespace, uri.resource))
                .unwrap_or_default();
            format!(
                "  {{ resourceUri: \"{}\", distPath: \"{}\", entryFile: \"{}\", assets: {} }}",
                resource.resource_uri,
                dist_path,
                resource.entry_file,
                serde_json::to_string(&resource.assets).unwrap_or_else(|_| "[]".to_string()),
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "// Auto-generated Weft server routes. Do not edit by hand.\n\
         export type ToolRoute = {{ toolId: string; handlerPath: string }};\n\
         export type ResourceRoute = {{ resourceUri: string; distPath: string; entryFile: string; assets: string[] }};\n\
         export const toolRoutes: ToolRoute[] = [\n{tool_routes}\n];\n\
         export const resourceRoutes: ResourceRoute[] = [\n{resource_routes}\n];\n"
    )
}

/// Write a create-once stub for every tool missing a handler.
pub async fn generate_handler_stubs(root: &Path, tools: &[ToolDefinition]) -> Result<()> {
    let handlers_dir = root.join("server").join("src").join("handlers");
    for tool in tools {
        let path = handlers_dir.join(format!("{}.ts", tool_id_to_filename(&tool.id)));
        if path.exists() {
            continue;
        }
        tokio::fs::create_dir_all(&handlers_dir)
            .await
            .map_err(|e| Error::write(&handlers_dir, e))?;
        let contents = format!(
            "// Auto-generated stub for the Weft dev server\n\
             export const handler = async (input: any) => {{\n\
             \x20\x20return {{ message: \"NotImplemented\", toolId: \"{}\", input }};\n\
             }};\n",
            tool.id
        );
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| Error::write(&path, e))?;
    }
    Ok(())
}
