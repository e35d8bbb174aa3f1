//! Type-system configuration (`tsconfig.json`) loading.
//!
//! The types config contributes additional files to the type program via its
//! `include` globs. A missing or malformed config degrades capability
//! (references declared outside the scanned globs stop resolving) but never
//! aborts the run.

use std::path::Path;

use weft_core::diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSink};

pub const DEFAULT_TYPES_CONFIG: &str = "tsconfig.json";

#[derive(Debug, Default)]
pub struct TypesConfig {
    pub include: Vec<String>,
}

/// Load the types config.
///
/// A missing file is an error only when the operator configured a non-default
/// path; the default path is allowed to be absent. Malformed JSON is always
/// an error. Both cases return `None` and the caller proceeds with reduced
/// capability.
pub async fn load_types_config(
    path: &Path,
    configured_name: &str,
    sink: &mut DiagnosticSink,
) -> Option<TypesConfig> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if configured_name != DEFAULT_TYPES_CONFIG {
                sink.push(
                    Diagnostic::error(
                        DiagnosticCode::TypeConfigMissing,
                        format!("types config not found at {}", path.display()),
                    )
                    .at(path.display().to_string()),
                );
            }
            return None;
        }
        Err(err) => {
            sink.push(
                Diagnostic::error(
                    DiagnosticCode::TypeConfigMissing,
                    format!("failed to read types config at {}", path.display()),
                )
                .at(path.display().to_string())
                .detail(err.to_string()),
            );
            return None;
        }
    };

    let parsed: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            sink.push(
                Diagnostic::error(
                    DiagnosticCode::TypeConfigInvalid,
                    format!("failed to parse types config at {}", path.display()),
                )
                .at(path.display().to_string())
                .detail(err.to_string()),
            );
            return None;
        }
    };

    let include = parsed
        .get("include")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Some(TypesConfig { include })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_path_missing_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DiagnosticSink::new();
        let config = load_types_config(
            &dir.path().join("tsconfig.json"),
            DEFAULT_TYPES_CONFIG,
            &mut sink,
        )
        .await;
        assert!(config.is_none());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_path_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DiagnosticSink::new();
        let config = load_types_config(
            &dir.path().join("custom.tsconfig.json"),
            "custom.tsconfig.json",
            &mut sink,
        )
        .await;
        assert!(config.is_none());
        assert_eq!(sink.len(), 1);
        let diags = sink.into_vec();
        assert_eq!(diags[0].code, DiagnosticCode::TypeConfigMissing);
        assert!(diags[0].severity.is_error());
    }

    #[tokio::test]
    async fn test_malformed_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tsconfig.json");
        tokio::fs::write(&path, "{ include: [oops").await.unwrap();

        let mut sink = DiagnosticSink::new();
        let config = load_types_config(&path, DEFAULT_TYPES_CONFIG, &mut sink).await;
        assert!(config.is_none());
        let diags = sink.into_vec();
        assert_eq!(diags[0].code, DiagnosticCode::TypeConfigInvalid);
    }

    #[tokio::test]
    async fn test_include_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tsconfig.json");
        tokio::fs::write(
            &path,
            r#"{"compilerOptions": {"strict": true}, "include": ["src/**/*.ts", "types/**/*.ts"]}"#,
        )
        .await
        .unwrap();

        let mut sink = DiagnosticSink::new();
        let config = load_types_config(&path, DEFAULT_TYPES_CONFIG, &mut sink)
            .await
            .unwrap();
        assert_eq!(config.include.len(), 2);
        assert!(sink.is_empty());
    }
}
