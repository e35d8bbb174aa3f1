use std::path::Path;

use clap::Args;
use eyre::Result;
use tracing::info;

use super::GlobalArgs;

const DEMO_CONFIG: &str = r#"name = "weather-sample"
version = "0.1.0"
tool_globs = ["tools/**/*.ts"]
types_config = "tsconfig.json"
out_dir = ".weft"
dist_dir = "dist"

[[app_resources]]
tool_id = "weather.getForecast"
resource_uri = "ui://weather/forecast"
entry = "apps/weather/forecast/main.tsx"

[server]
host = "127.0.0.1"
port = 8787
open_browser = false

[bundler]
kind = "vite"
base = "/"
assets_inline_limit = 4096
"#;

const DEMO_TOOL: &str = r#"export class WeatherTools {
  @tool({
    id: "weather.getForecast",
    name: "weather.getForecast",
    description: "Get a mock forecast",
    inputSchema: {
      type: "object",
      properties: { location: { type: "string" }, days: { type: "integer", minimum: 1 } },
      required: ["location"]
    },
    outputSchema: {
      type: "object",
      properties: { forecast: { type: "array", items: { type: "string" } } },
    },
    resourceUri: "ui://weather/forecast"
  })
  async getForecast(args: { location: string; days?: number }) {
    const days = args.days ?? 3;
    return {
      forecast: Array.from({ length: days }).map(
        (_, i) => `${args.location}: Day ${i + 1} - Sunny with light breeze`,
      ),
    };
  }
}
"#;

const DEMO_UI: &str = r##"import React from "react";
import { createRoot } from "react-dom/client";

const App = () => {
  const [forecast, setForecast] = React.useState<string[]>([
    "Loading mock forecast...",
  ]);

  React.useEffect(() => {
    setForecast([
      "Today: Sunny with light winds",
      "Tomorrow: Partly cloudy",
      "Day 3: Light showers possible",
    ]);
  }, []);

  return (
    <div style={{ fontFamily: "Inter, system-ui, sans-serif", padding: 24, maxWidth: 640, margin: "0 auto" }}>
      <h1 style={{ marginBottom: 8 }}>Weft Weather</h1>
      <p style={{ color: "#555", marginBottom: 16 }}>Demo resource: ui://weather/forecast</p>
      <div style={{ display: "grid", gap: 8 }}>
        {forecast.map((line, idx) => (
          <div key={idx} style={{ padding: 12, borderRadius: 8, background: "#f4f6fb", border: "1px solid #e3e7f2" }}>
            {line}
          </div>
        ))}
      </div>
    </div>
  );
};

const container = document.getElementById("root");
if (container) {
  const root = createRoot(container);
  root.render(<App />);
}
"##;

#[derive(Args)]
pub struct InitCommand {}

impl InitCommand {
    pub async fn run(&self, _globals: &GlobalArgs) -> Result<()> {
        write_if_missing(Path::new("weft.toml"), DEMO_CONFIG).await?;
        write_if_missing(Path::new("tools/weather/forecast.ts"), DEMO_TOOL).await?;
        write_if_missing(Path::new("apps/weather/forecast/main.tsx"), DEMO_UI).await?;
        info!("initialized the weather demo");
        Ok(())
    }
}

async fn write_if_missing(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    Ok(())
}
