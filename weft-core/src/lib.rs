//! Shared foundation for the Weft toolchain: the diagnostic model, the
//! `weft.toml` configuration, the persisted manifest data model, and the
//! `ui://` resource URI grammar.
//!
//! Pipeline stages (`weft-extract`, `weft-build`, `weft-verify`) are pure
//! functions of their inputs plus the persisted manifests from the previous
//! stage; this crate owns everything they share.

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod manifest;
pub mod uri;

pub use config::{AppResource, Config, WeftToml, env_bool};
pub use diagnostic::{
    Diagnostic, DiagnosticCode, DiagnosticSink, Severity, stage_success, verify_success,
};
pub use error::{Error, Result};
pub use manifest::{
    AppsManifest, AppsManifestEntry, ManifestLoad, ToolDefinition, ToolManifest,
    UiComponentDeclaration, VerifyReport,
};
pub use uri::ResourceUri;
