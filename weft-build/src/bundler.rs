//! The opaque UI-build capability.
//!
//! The builder hands a bundler an entry document, an output directory, and a
//! base path; the bundler writes a static asset tree or fails. Everything
//! behind this trait (vite, an operator command, a test double) is outside
//! the reconciliation core.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;
use weft_core::config::{BundlerConfig, BundlerKind};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct BundlerError(pub String);

/// One bundler invocation.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Scaffold directory containing the entry document.
    pub scaffold_root: PathBuf,
    /// The HTML entry document inside the scaffold.
    pub entry_html: PathBuf,
    /// Output directory for the built asset tree.
    pub out_dir: PathBuf,
    /// Public base path the assets will be served under.
    pub base: String,
    pub assets_inline_limit: u64,
}

#[async_trait]
pub trait Bundler: Send + Sync {
    async fn build(&self, request: &BuildRequest) -> Result<(), BundlerError>;
}

/// Spawns `npx vite build` against the scaffold directory.
pub struct ViteBundler;

#[async_trait]
impl Bundler for ViteBundler {
    async fn build(&self, request: &BuildRequest) -> Result<(), BundlerError> {
        let mut command = Command::new("npx");
        command
            .arg("vite")
            .arg("build")
            .arg(&request.scaffold_root)
            .arg("--outDir")
            .arg(&request.out_dir)
            .arg("--base")
            .arg(&request.base)
            .arg("--emptyOutDir")
            .env(
                "VITE_ASSETS_INLINE_LIMIT",
                request.assets_inline_limit.to_string(),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!(scaffold = %request.scaffold_root.display(), "invoking vite");
        run_to_completion(command).await
    }
}

/// Spawns an operator-supplied command; the request travels via `WEFT_BUILD_*`
/// environment variables.
pub struct CommandBundler {
    program: String,
    args: Vec<String>,
}

impl CommandBundler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Bundler for CommandBundler {
    async fn build(&self, request: &BuildRequest) -> Result<(), BundlerError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("WEFT_BUILD_ENTRY", &request.entry_html)
            .env("WEFT_BUILD_ROOT", &request.scaffold_root)
            .env("WEFT_BUILD_OUT_DIR", &request.out_dir)
            .env("WEFT_BUILD_BASE", &request.base)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        run_to_completion(command).await
    }
}

async fn run_to_completion(mut command: Command) -> Result<(), BundlerError> {
    let output = command
        .output()
        .await
        .map_err(|e| BundlerError(e.to_string()))?;
    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(BundlerError(format!(
            "bundler exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}

/// Pick the bundler implementation the config asks for.
pub fn bundler_from_config(config: &BundlerConfig) -> Box<dyn Bundler> {
    match config.kind {
        BundlerKind::Vite => Box::new(ViteBundler),
        BundlerKind::Command => Box::new(CommandBundler::new(
            config.command.clone().unwrap_or_default(),
            config.args.clone(),
        )),
    }
}
