use std::path::{Path, PathBuf};

use clap::Args;
use eyre::Result;
use weft_core::config::AppResource;
use weft_core::uri::sanitize_resource_segment;
use weft_core::Config;

use super::dev::watch_loop;
use super::{GlobalArgs, UnwrapOrExit};

const PREVIEW_TEMPLATE: &str = r##"import React, { useEffect, useState } from "react";
import { createRoot } from "react-dom/client";

const PREVIEW_TOOL_ID = "__TOOL_ID__";
const PREVIEW_RESOURCE_URI = "__RESOURCE_URI__";

const App = () => {
  const [result, setResult] = useState<any>(null);
  const [error, setError] = useState<string | null>(null);

  useEffect(() => {
    fetch(`/tools/${PREVIEW_TOOL_ID}`, {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify({}),
    })
      .then((res) => res.json())
      .then(setResult)
      .catch(() => setError("Failed to reach the dev server."));
  }, []);

  return (
    <div style={{ fontFamily: "Inter, system-ui, sans-serif", padding: 24, maxWidth: 720, margin: "0 auto" }}>
      <h1 style={{ marginBottom: 4 }}>{PREVIEW_TOOL_ID}</h1>
      <p style={{ color: "#555", marginBottom: 16 }}>{PREVIEW_RESOURCE_URI}</p>
      {error && <div style={{ color: "#b91c1c" }}>{error}</div>}
      <pre style={{ background: "#f4f6fb", padding: 16, borderRadius: 8, overflow: "auto" }}>
        {result ? JSON.stringify(result, null, 2) : "Calling tool..."}
      </pre>
    </div>
  );
};

const container = document.getElementById("root");
if (container) {
  createRoot(container).render(<App />);
}
"##;

#[derive(Args)]
pub struct PreviewCommand {
    /// Tool id to preview
    #[arg(long = "tool")]
    pub tool: String,

    /// Resource URI to use (default ui://preview/<tool>)
    #[arg(long)]
    pub resource: Option<String>,

    /// Entry file for the preview UI (default <out_dir>/preview-ui/main.tsx)
    #[arg(long)]
    pub entry: Option<PathBuf>,

    /// Open the browser when ready
    #[arg(long)]
    pub open: bool,
}

impl PreviewCommand {
    pub async fn run(&self, globals: &GlobalArgs) -> Result<()> {
        let (base, root) = globals.load_config().unwrap_or_exit();

        let resource_uri = self.resource.clone().unwrap_or_else(|| {
            let segment = sanitize_resource_segment(&self.tool);
            let segment = if segment.is_empty() {
                "resource".to_string()
            } else {
                segment
            };
            format!("ui://preview/{segment}")
        });
        let entry = self
            .entry
            .clone()
            .unwrap_or_else(|| base.out_dir.join("preview-ui").join("main.tsx"));

        self.materialize_preview_ui(&root.join(&entry), &resource_uri)
            .await?;

        let load = || -> weft_core::Result<(Config, PathBuf)> {
            let (base, root) = globals.load_config()?;
            Ok((self.preview_config(base, &resource_uri, &entry), root))
        };
        watch_loop("preview", globals, &load).await
    }

    /// Derive a single-resource config pointed at the preview outputs.
    fn preview_config(&self, mut base: Config, resource_uri: &str, entry: &Path) -> Config {
        base.name = format!("{}-preview", base.name);
        base.app_resources = vec![AppResource {
            tool_id: self.tool.clone(),
            resource_uri: resource_uri.to_string(),
            entry: entry.display().to_string(),
            standalone: Some(true),
        }];
        base.out_dir = base.out_dir.join("preview");
        base.dist_dir = base.dist_dir.join("preview");
        base.server.open_browser = base.server.open_browser || self.open;
        base
    }

    async fn materialize_preview_ui(&self, entry: &Path, resource_uri: &str) -> Result<()> {
        if entry.exists() {
            return Ok(());
        }
        if let Some(parent) = entry.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = PREVIEW_TEMPLATE
            .replace("__TOOL_ID__", &self.tool)
            .replace("__RESOURCE_URI__", resource_uri);
        tokio::fs::write(entry, contents).await?;
        Ok(())
    }
}
