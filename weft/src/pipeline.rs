//! Shared rebuild pipeline for the watch-driven commands.

use std::path::{Component, Path, PathBuf};

use serde_json::json;
use tracing::{error, info, warn};
use weft_build::{BuildOptions, build_apps, bundler_from_config};
use weft_core::manifest::{AppsManifest, ToolManifest};
use weft_core::{Config, Diagnostic};
use weft_extract::{ExtractOptions, extract_tools};
use weft_server::{ServerHandle, ServerOptions, create_server};

use crate::artifacts::{generate_handler_stubs, generate_server_artifacts};
use crate::browser::try_open_browser;
use crate::commands::GlobalArgs;
use crate::emit::{Emission, emit_diagnostics};

pub struct PipelineOutcome {
    pub tool_manifest: ToolManifest,
    pub apps_manifest: AppsManifest,
    pub diagnostics: Vec<Diagnostic>,
    pub success: bool,
}

/// Run extract then build, generating handler stubs on the way.
pub async fn run_pipeline(
    config: &Config,
    root: &Path,
    strict: bool,
) -> weft_core::Result<PipelineOutcome> {
    let extract = extract_tools(config, root, ExtractOptions { strict }).await?;
    let bundler = bundler_from_config(&config.bundler);
    let build = build_apps(config, root, bundler.as_ref(), BuildOptions { strict }).await?;
    generate_handler_stubs(root, &extract.manifest.tools).await?;

    let mut diagnostics = extract.diagnostics;
    diagnostics.extend(build.diagnostics);
    Ok(PipelineOutcome {
        tool_manifest: extract.manifest,
        apps_manifest: build.manifest,
        diagnostics,
        success: extract.success && build.success,
    })
}

/// Long-lived state for the watch loop: the running server and whether the
/// browser was already opened.
pub struct DevState {
    pub server: Option<ServerHandle>,
    pub browser_opened: bool,
}

impl DevState {
    pub fn new() -> Self {
        Self {
            server: None,
            browser_opened: false,
        }
    }
}

/// One rebuild cycle: pipeline, artifacts, server restart, browser.
pub async fn rebuild_and_serve(
    command: &str,
    config: &Config,
    root: &Path,
    globals: &GlobalArgs,
    state: &mut DevState,
) -> weft_core::Result<()> {
    let outcome = run_pipeline(config, root, globals.strict).await?;
    let out_dir = config.out_dir_in(root);
    let dist_dir = config.dist_dir_in(root);

    if globals.json || !outcome.diagnostics.is_empty() {
        emit_diagnostics(Emission {
            command,
            diagnostics: &outcome.diagnostics,
            success: outcome.success,
            json: globals.json,
            context: json!({
                "toolManifestPath": weft_core::manifest::tool_manifest_path(&out_dir),
                "appsManifestPath": weft_core::manifest::apps_manifest_path(&out_dir),
                "server": {"host": config.server.host, "port": config.server.port},
            }),
        });
    }

    if !outcome.success {
        error!("skipping server restart due to diagnostics");
        return Ok(());
    }

    if let Some(server) = state.server.take() {
        server.stop().await;
    }
    generate_server_artifacts(root, &dist_dir, &outcome.tool_manifest, &outcome.apps_manifest)
        .await?;

    let options = ServerOptions {
        out_dir,
        dist_dir,
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let server = match create_server(options.clone()).await {
        Ok(server) => Some(server),
        Err(err) if port_access_error(&err) && config.server.port != 0 => {
            warn!(port = config.server.port, %err, "port unavailable; retrying on a random port");
            match create_server(ServerOptions { port: 0, ..options }).await {
                Ok(server) => Some(server),
                Err(retry_err) => {
                    error!(%retry_err, "dev server failed to start");
                    None
                }
            }
        }
        Err(err) => {
            error!(%err, "dev server failed to start");
            None
        }
    };

    let Some(server) = server else {
        return Ok(());
    };
    let addr = server.addr();
    info!(%addr, "dev server running");

    if config.server.open_browser && !state.browser_opened {
        let first_uri = config
            .app_resources
            .first()
            .and_then(|r| weft_core::ResourceUri::parse(&r.resource_uri));
        if let Some(uri) = first_uri {
            let url = format!("http://{}:{}{}", config.server.host, addr.port(), uri.route_prefix());
            try_open_browser(&url).await;
            state.browser_opened = true;
        }
    }
    state.server = Some(server);
    Ok(())
}

fn port_access_error(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::AddrInUse | std::io::ErrorKind::PermissionDenied
    )
}

/// Directory prefix of a glob pattern, for the file watcher.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if text.contains(['*', '?', '[', '{']) {
            break;
        }
        if matches!(component, Component::Normal(_) | Component::RootDir | Component::CurDir) {
            base.push(component);
        }
    }
    if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base
    }
}
