//! Persisted manifest data model.
//!
//! Manifests are the contract between pipeline stages: the extractor owns the
//! tool manifest, the builder owns the apps manifest, the verifier owns the
//! verify report. Each is persisted as pretty JSON under the output directory
//! so any stage can be invoked independently.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::diagnostic::Diagnostic;
use crate::error::{Error, Result};

pub const TOOL_MANIFEST_VERSION: &str = "weft.tool.v1";
pub const APPS_MANIFEST_VERSION: &str = "weft.apps.v1";

pub const TOOL_MANIFEST_FILE: &str = "tool.manifest.json";
pub const APPS_MANIFEST_FILE: &str = "apps.manifest.json";
pub const VERIFY_REPORT_FILE: &str = "verify-report.json";

/// One discovered tool. Immutable once placed in a manifest; re-extraction
/// supersedes rather than mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_template: Option<String>,
}

/// A discovered UI entry bound to a tool. The resourceUri may be empty at
/// discovery time; it must be resolved before the manifest is finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiComponentDeclaration {
    pub tool_id: String,
    pub resource_uri: String,
    pub entry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolManifest {
    pub manifest_version: String,
    pub name: String,
    pub version: String,
    pub generated_by: String,
    pub generated_at: String,
    pub tools: Vec<ToolDefinition>,
    #[serde(rename = "uiComponents", default)]
    pub ui_components: Vec<UiComponentDeclaration>,
}

impl ToolManifest {
    pub fn tool(&self, id: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.id == id)
    }
}

/// One built resource in the apps manifest. `entry_file` and every asset are
/// paths relative to the distribution root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppsManifestEntry {
    pub resource_uri: String,
    pub tool_id: String,
    pub entry_file: String,
    pub assets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppsManifest {
    pub manifest_version: String,
    pub name: String,
    pub version: String,
    pub generated_by: String,
    pub generated_at: String,
    #[serde(rename = "outDir")]
    pub out_dir: String,
    pub resources: Vec<AppsManifestEntry>,
}

/// Persisted output of the verify stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub diagnostics: Vec<Diagnostic>,
    pub headless: bool,
}

pub fn tool_manifest_path(out_dir: &Path) -> PathBuf {
    out_dir.join(TOOL_MANIFEST_FILE)
}

pub fn apps_manifest_path(out_dir: &Path) -> PathBuf {
    out_dir.join(APPS_MANIFEST_FILE)
}

pub fn verify_report_path(out_dir: &Path) -> PathBuf {
    out_dir.join(VERIFY_REPORT_FILE)
}

/// Timestamp stamped into generated manifests, RFC 3339 in UTC.
pub fn generation_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Outcome of loading a persisted manifest. Missing and invalid files are
/// expected conditions the caller converts into diagnostics.
#[derive(Debug)]
pub enum ManifestLoad<T> {
    Missing,
    Invalid(String),
    Loaded(T),
}

/// Read a JSON document from disk, distinguishing missing from malformed.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> ManifestLoad<T> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return ManifestLoad::Missing,
        Err(err) => return ManifestLoad::Invalid(err.to_string()),
    };
    match serde_json::from_str(&raw) {
        Ok(value) => ManifestLoad::Loaded(value),
        Err(err) => ManifestLoad::Invalid(err.to_string()),
    }
}

/// Persist a JSON document, creating parent directories as needed.
pub async fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::write(parent, e))?;
    }
    let mut body = serde_json::to_string_pretty(value)
        .map_err(|e| Error::serialize(path.display().to_string(), e))?;
    body.push('\n');
    tokio::fs::write(path, body)
        .await
        .map_err(|e| Error::write(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_manifest() -> ToolManifest {
        ToolManifest {
            manifest_version: TOOL_MANIFEST_VERSION.to_string(),
            name: "sample".to_string(),
            version: "0.1.0".to_string(),
            generated_by: "test".to_string(),
            generated_at: generation_timestamp(),
            tools: vec![ToolDefinition {
                id: "weather.getForecast".to_string(),
                name: "weather.getForecast".to_string(),
                description: None,
                input_schema: json!({"type": "object", "properties": {}}),
                output_schema: None,
                resource_uri: Some("ui://weather/forecast".to_string()),
                preview_template: None,
            }],
            ui_components: Vec::new(),
        }
    }

    #[test]
    fn test_tool_lookup() {
        let manifest = sample_manifest();
        assert!(manifest.tool("weather.getForecast").is_some());
        assert!(manifest.tool("missing").is_none());
    }

    #[test]
    fn test_serialized_field_names() {
        let manifest = sample_manifest();
        let value = serde_json::to_value(&manifest).unwrap();
        assert!(value.get("manifest_version").is_some());
        assert!(value.get("uiComponents").is_some());
        let tool = &value["tools"][0];
        assert!(tool.get("inputSchema").is_some());
        assert!(tool.get("resourceUri").is_some());
        // Absent optionals are omitted, not null.
        assert!(tool.get("outputSchema").is_none());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = tool_manifest_path(dir.path());
        let manifest = sample_manifest();

        save_json(&path, &manifest).await.unwrap();
        match load_json::<ToolManifest>(&path).await {
            ManifestLoad::Loaded(loaded) => assert_eq!(loaded, manifest),
            other => panic!("expected loaded manifest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(matches!(
            load_json::<ToolManifest>(&path).await,
            ManifestLoad::Missing
        ));

        tokio::fs::write(&path, "{ not json").await.unwrap();
        assert!(matches!(
            load_json::<ToolManifest>(&path).await,
            ManifestLoad::Invalid(_)
        ));
    }
}
