//! Dev server: static hosting for built UI resources plus tool invocation
//! stubs, assembled from the persisted manifests.
//!
//! Tools respond with a NotImplemented stub payload
//! until a real backend takes over the routes; resources are served straight
//! from the distribution tree.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use weft_core::manifest::{
    AppsManifest, ManifestLoad, ToolManifest, apps_manifest_path, load_json, tool_manifest_path,
};
use weft_core::uri::ResourceUri;

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub out_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

struct AppState {
    tools: ToolManifest,
}

/// A running dev server; dropping the handle leaves it running, `stop`
/// shuts it down gracefully.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

/// Load the persisted manifests and start serving. Missing manifests serve
/// an empty catalogue rather than failing; the pipeline may not have run yet.
pub async fn create_server(options: ServerOptions) -> std::io::Result<ServerHandle> {
    let tools = match load_json::<ToolManifest>(&tool_manifest_path(&options.out_dir)).await {
        ManifestLoad::Loaded(manifest) => manifest,
        _ => empty_tool_manifest(),
    };
    let apps = match load_json::<AppsManifest>(&apps_manifest_path(&options.out_dir)).await {
        ManifestLoad::Loaded(manifest) => manifest,
        _ => empty_apps_manifest(&options.dist_dir),
    };

    let router = build_router(tools, &apps, &options.dist_dir);
    let listener =
        tokio::net::TcpListener::bind((options.host.as_str(), options.port)).await?;
    let addr = listener.local_addr()?;

    let (shutdown, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = rx.await;
            })
            .await;
        if let Err(err) = result {
            warn!(%err, "dev server terminated");
        }
    });
    info!(%addr, "dev server started");

    Ok(ServerHandle {
        addr,
        shutdown,
        task,
    })
}

/// Assemble the router: health, tool catalogue, tool invocation stubs, and
/// one static mount per built resource.
pub fn build_router(tools: ToolManifest, apps: &AppsManifest, dist_dir: &Path) -> Router {
    let state = Arc::new(AppState { tools });
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route("/tools/{tool_id}", post(call_tool))
        .with_state(state);

    for resource in &apps.resources {
        let Some(uri) = ResourceUri::parse(&resource.resource_uri) else {
            continue;
        };
        let resource_root = dist_dir.join(&uri.namespace).join(&uri.resource);
        if !resource_root.is_dir() {
            warn!(root = %resource_root.display(), "skipping resource route; dist path missing");
            continue;
        }
        router = router.nest_service(&uri.route_prefix(), ServeDir::new(resource_root));
    }

    router.layer(CorsLayer::permissive())
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.tools.tools))
}

async fn call_tool(
    State(state): State<Arc<AppState>>,
    UrlPath(tool_id): UrlPath<String>,
    input: Result<Json<Value>, axum::extract::rejection::JsonRejection>,
) -> impl IntoResponse {
    let input = input.map(|Json(v)| v).unwrap_or_else(|_| json!({}));
    if state.tools.tool(&tool_id).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("Unknown tool {tool_id}")})),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "message": "NotImplemented",
            "toolId": tool_id,
            "input": input,
        })),
    )
}

fn empty_tool_manifest() -> ToolManifest {
    ToolManifest {
        manifest_version: weft_core::manifest::TOOL_MANIFEST_VERSION.to_string(),
        name: "weft".to_string(),
        version: "0.0.0".to_string(),
        generated_by: "weft-server".to_string(),
        generated_at: weft_core::manifest::generation_timestamp(),
        tools: Vec::new(),
        ui_components: Vec::new(),
    }
}

fn empty_apps_manifest(dist_dir: &Path) -> AppsManifest {
    AppsManifest {
        manifest_version: weft_core::manifest::APPS_MANIFEST_VERSION.to_string(),
        name: "weft".to_string(),
        version: "0.0.0".to_string(),
        generated_by: "weft-server".to_string(),
        generated_at: weft_core::manifest::generation_timestamp(),
        out_dir: dist_dir.display().to_string(),
        resources: Vec::new(),
    }
}
