//! Diagnostics presentation.
//!
//! The pipeline stages never format for a terminal or pick exit codes; this
//! layer renders their diagnostics either as a JSON payload on stdout or as
//! log lines, and the command wrappers map failure to a non-zero exit.

use serde_json::{Value, json};
use tracing::{error, info, warn};
use weft_core::{Diagnostic, Severity};

pub struct Emission<'a> {
    pub command: &'a str,
    pub diagnostics: &'a [Diagnostic],
    pub success: bool,
    pub json: bool,
    pub context: Value,
}

pub fn emit_diagnostics(emission: Emission<'_>) {
    if emission.json {
        let payload = json!({
            "command": emission.command,
            "success": emission.success,
            "diagnostics": emission.diagnostics,
            "context": emission.context,
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(body) => println!("{body}"),
            Err(err) => error!(%err, "failed to serialize diagnostics payload"),
        }
        return;
    }

    if emission.diagnostics.is_empty() {
        info!(command = emission.command, "no diagnostics reported");
        return;
    }

    for diag in emission.diagnostics {
        log_diagnostic(emission.command, diag);
    }
    if !emission.success {
        error!(command = emission.command, "command completed with diagnostics");
    }
}

fn log_diagnostic(command: &str, diag: &Diagnostic) {
    let location = diag.location.as_deref().unwrap_or("");
    match diag.severity {
        Severity::Error => error!(command, code = %diag.code, location, "{}", diag.message),
        Severity::Warning => warn!(command, code = %diag.code, location, "{}", diag.message),
        Severity::Info => info!(command, code = %diag.code, location, "{}", diag.message),
    }
    if let Some(suggestion) = &diag.suggestion {
        info!(command, code = %diag.code, "  suggestion: {suggestion}");
    }
}
