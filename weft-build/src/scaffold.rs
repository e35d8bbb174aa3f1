//! Per-resource build scaffolding.
//!
//! Every resource gets a scratch directory under `<out_dir>/.scaffold/` with
//! an `index.html` entry document. Entries that don't mount themselves into
//! the DOM additionally get a generated wrapper that renders the component
//! and fetches the bound tool for initial data.

use std::path::{Component, Path, PathBuf};

use weft_core::config::AppResource;
use weft_core::uri::ResourceUri;

/// Markers for the standalone-entry heuristic. Used only when the resource
/// doesn't carry an explicit `standalone` flag; textual detection is fragile
/// and a config flag should be preferred.
const ROOT_MOUNT_MARKERS: [&str; 2] = ["createRoot(", "ReactDOM.render("];

pub struct Scaffold {
    pub root: PathBuf,
    pub entry_html: PathBuf,
}

/// Materialize the scaffold for one resource. Returns the entry document to
/// hand to the bundler.
pub async fn prepare_scaffold(
    out_dir: &Path,
    resource: &AppResource,
    uri: &ResourceUri,
    entry_path: &Path,
) -> std::io::Result<Scaffold> {
    let root = out_dir
        .join(".scaffold")
        .join(format!("{}-{}", uri.namespace, uri.resource));
    tokio::fs::create_dir_all(&root).await?;

    let entry_content = tokio::fs::read_to_string(entry_path).await?;
    let standalone = resource
        .standalone
        .unwrap_or_else(|| ROOT_MOUNT_MARKERS.iter().any(|m| entry_content.contains(m)));

    let script_src = if standalone {
        relative_path(&root, entry_path)
    } else {
        let wrapper = root.join("wrapper.tsx");
        tokio::fs::write(
            &wrapper,
            wrapper_source(&relative_path(&root, entry_path), resource),
        )
        .await?;
        "./wrapper.tsx".to_string()
    };

    let entry_html = root.join("index.html");
    tokio::fs::write(&entry_html, index_html(&resource.resource_uri, &script_src)).await?;
    Ok(Scaffold { root, entry_html })
}

fn index_html(title: &str, script_src: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <title>{title}</title>
</head>
<body>
  <div id="root"></div>
  <script type="module" src="{script_src}"></script>
</body>
</html>
"#
    )
}

fn wrapper_source(relative_entry: &str, resource: &AppResource) -> String {
    let import_path = relative_entry
        .trim_end_matches(".tsx")
        .trim_end_matches(".ts");
    format!(
        r##"import React, {{ useEffect, useState }} from "react";
import {{ createRoot }} from "react-dom/client";
import Component from "{import_path}";

const Wrapper = () => {{
  const [data, setData] = useState<any>(null);
  const [error, setError] = useState<string | null>(null);

  useEffect(() => {{
    let aborted = false;
    fetch("/tools/{tool_id}", {{
      method: "POST",
      headers: {{ "Content-Type": "application/json" }},
      body: JSON.stringify({{}}),
    }})
      .then((res) => res.json())
      .then((json) => {{
        if (!aborted) {{
          setData({{ data: json, toolId: "{tool_id}", resourceUri: "{resource_uri}" }});
        }}
      }})
      .catch(() => {{
        if (!aborted) {{
          setError("Failed to load data from dev server.");
        }}
      }});
    return () => {{
      aborted = true;
    }};
  }}, []);

  if (error) return <div style={{{{ padding: 20, color: "#b91c1c" }}}}>{{error}}</div>;
  if (!data) return <div style={{{{ padding: 20, color: "#64748b" }}}}>Loading tool data...</div>;
  return <Component data={{data.data}} toolId={{data.toolId}} resourceUri={{data.resourceUri}} />;
}};

const container = document.getElementById("root");
if (container) {{
  createRoot(container).render(<Wrapper />);
}}
"##,
        tool_id = resource.tool_id,
        resource_uri = resource.resource_uri,
    )
}

/// Compute a relative path from `from_dir` to `to`, both assumed absolute.
pub fn relative_path(from_dir: &Path, to: &Path) -> String {
    let from: Vec<Component> = from_dir.components().collect();
    let to_components: Vec<Component> = to.components().collect();
    let common = from
        .iter()
        .zip(to_components.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &to_components[common..] {
        parts.push(component.as_os_str().to_string_lossy().to_string());
    }
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(standalone: Option<bool>) -> AppResource {
        AppResource {
            tool_id: "weather.getForecast".to_string(),
            resource_uri: "ui://weather/forecast".to_string(),
            entry: "apps/weather/main.tsx".to_string(),
            standalone,
        }
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/work/.weft/.scaffold/w-f"), Path::new("/work/apps/main.tsx")),
            "../../../apps/main.tsx"
        );
        assert_eq!(
            relative_path(Path::new("/work"), Path::new("/work/apps/main.tsx")),
            "apps/main.tsx"
        );
    }

    #[tokio::test]
    async fn test_standalone_entry_skips_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("main.tsx");
        tokio::fs::write(&entry, "import { createRoot } from 'react-dom/client';\ncreateRoot(document.getElementById('root')).render(null);")
            .await
            .unwrap();
        let uri = ResourceUri::parse("ui://weather/forecast").unwrap();

        let scaffold = prepare_scaffold(dir.path(), &resource(None), &uri, &entry)
            .await
            .unwrap();

        assert!(scaffold.entry_html.exists());
        assert!(!scaffold.root.join("wrapper.tsx").exists());
        let html = std::fs::read_to_string(&scaffold.entry_html).unwrap();
        assert!(html.contains("main.tsx"));
        assert!(html.contains("id=\"root\""));
    }

    #[tokio::test]
    async fn test_component_entry_gets_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("Component.tsx");
        tokio::fs::write(&entry, "export default function Component() { return null; }")
            .await
            .unwrap();
        let uri = ResourceUri::parse("ui://weather/forecast").unwrap();

        let scaffold = prepare_scaffold(dir.path(), &resource(None), &uri, &entry)
            .await
            .unwrap();

        let wrapper = std::fs::read_to_string(scaffold.root.join("wrapper.tsx")).unwrap();
        assert!(wrapper.contains("/tools/weather.getForecast"));
        assert!(wrapper.contains("from \"../../Component\""));
    }

    #[tokio::test]
    async fn test_explicit_flag_overrides_heuristic() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("Component.tsx");
        tokio::fs::write(&entry, "export default () => null;").await.unwrap();
        let uri = ResourceUri::parse("ui://weather/forecast").unwrap();

        let scaffold = prepare_scaffold(dir.path(), &resource(Some(true)), &uri, &entry)
            .await
            .unwrap();
        assert!(!scaffold.root.join("wrapper.tsx").exists());
    }
}
