//! Diagnostic types shared by every pipeline stage.
//!
//! Diagnostics are the expected-failure channel: a stage reports problems by
//! pushing diagnostics and keeps processing the remaining items. Only truly
//! unrecoverable conditions (an unreadable config file) surface as errors.

use serde::{Deserialize, Serialize};

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message about the pipeline run.
    Info,
    /// A problem that doesn't prevent processing but should be addressed.
    Warning,
    /// A problem that makes the affected item unusable.
    Error,
}

impl Severity {
    /// Returns true if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Returns true if this is a warning severity.
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Closed vocabulary of diagnostic codes.
///
/// Callers dispatch on the code, never on the message text. The severity of
/// each code is fixed at its emission site; the enum only names the condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticCode {
    ToolManifestMissing,
    ToolManifestInvalid,
    AppsManifestMissing,
    AppsManifestInvalid,
    TypeConfigMissing,
    TypeConfigInvalid,
    SourceFileSkipped,
    ToolIdMissing,
    ToolIdDuplicate,
    ToolSchemaMissing,
    SchemaInferUnsupported,
    SchemaInferMissingType,
    ResourceUriMissing,
    ResourceUriInvalid,
    ResourceUriDuplicate,
    ResourceUriUnresolved,
    ResourceUriUnmapped,
    UiToolIdMissing,
    ToolUiMismatch,
    ToolUiDuplicate,
    BuildEntryfileMissing,
    BuildAssetMissing,
    BuildFailed,
    ServerResourceResolveFail,
    ServerToolcallFail,
    ResourceNotHtml,
    UiBootFail,
    UiBootWarn,
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Reuse the serde kebab-case names so logs and JSON agree.
        let s = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", s.trim_matches('"'))
    }
}

/// A structured diagnostic emitted by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    /// File path, URL, or manifest path the diagnostic refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Actionable hint for fixing the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Underlying error text or other supporting detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Diagnostic {
    fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            location: None,
            suggestion: None,
            details: None,
        }
    }

    /// Create a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Create a new info diagnostic.
    pub fn info(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, message)
    }

    /// Attach a location to this diagnostic.
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Attach a fix-it suggestion to this diagnostic.
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach supporting detail to this diagnostic.
    pub fn detail(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " (at {})", loc)?;
        }
        Ok(())
    }
}

/// Accumulator for diagnostics collected during a stage run.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_error())
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_warning())
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity.is_error())
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Success policy for the extract and build stages.
///
/// A run succeeds when it produced no diagnostics, or when strict mode is off
/// and nothing rose above warning severity.
pub fn stage_success(diagnostics: &[Diagnostic], strict: bool) -> bool {
    diagnostics.is_empty()
        || (!strict
            && diagnostics
                .iter()
                .all(|d| matches!(d.severity, Severity::Warning | Severity::Info)))
}

/// Success policy for the verify stage.
///
/// Differs from [`stage_success`]: non-strict verification tolerates any
/// non-error severity. Strict verification still requires a clean report.
pub fn verify_success(diagnostics: &[Diagnostic], strict: bool) -> bool {
    diagnostics.is_empty() || (!strict && diagnostics.iter().all(|d| !d.severity.is_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_error() {
        let diag = Diagnostic::error(DiagnosticCode::ToolIdDuplicate, "duplicate tool id");
        assert!(diag.severity.is_error());
        assert_eq!(diag.code, DiagnosticCode::ToolIdDuplicate);
    }

    #[test]
    fn test_diagnostic_with_location() {
        let diag = Diagnostic::warning(DiagnosticCode::ResourceUriMissing, "missing resourceUri")
            .at("tools/weather.ts");
        assert_eq!(diag.location.as_deref(), Some("tools/weather.ts"));
    }

    #[test]
    fn test_code_serializes_kebab_case() {
        let json = serde_json::to_string(&DiagnosticCode::BuildEntryfileMissing).unwrap();
        assert_eq!(json, "\"build-entryfile-missing\"");
        assert_eq!(
            DiagnosticCode::SchemaInferUnsupported.to_string(),
            "schema-infer-unsupported"
        );
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Info.to_string(), "info");
    }

    #[test]
    fn test_stage_success_policy() {
        let warn = vec![Diagnostic::warning(
            DiagnosticCode::ResourceUriMissing,
            "no uri",
        )];
        let info = vec![Diagnostic::info(DiagnosticCode::SourceFileSkipped, "skip")];
        let err = vec![Diagnostic::error(DiagnosticCode::ToolIdMissing, "no id")];

        assert!(stage_success(&[], true));
        assert!(stage_success(&warn, false));
        assert!(stage_success(&info, false));
        assert!(!stage_success(&warn, true));
        assert!(!stage_success(&err, false));
    }

    #[test]
    fn test_verify_success_tolerates_non_errors() {
        let mixed = vec![
            Diagnostic::warning(DiagnosticCode::ResourceNotHtml, "not html"),
            Diagnostic::info(DiagnosticCode::SourceFileSkipped, "skip"),
        ];
        let err = vec![Diagnostic::error(
            DiagnosticCode::BuildAssetMissing,
            "asset gone",
        )];

        assert!(verify_success(&mixed, false));
        assert!(!verify_success(&mixed, true));
        // Error severity is never tolerated, strict or not.
        assert!(!verify_success(&err, false));
        assert!(!verify_success(&err, true));
    }

    #[test]
    fn test_sink_counts() {
        let mut sink = DiagnosticSink::new();
        sink.push(Diagnostic::error(DiagnosticCode::ToolIdMissing, "a"));
        sink.push(Diagnostic::warning(DiagnosticCode::ResourceUriMissing, "b"));
        assert!(sink.has_errors());
        assert!(sink.has_warnings());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.len(), 2);
    }
}
