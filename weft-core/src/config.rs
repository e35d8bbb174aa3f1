//! `weft.toml` loading, validation, and environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, SourceContext};
use crate::uri::is_valid_resource_uri;

/// Tool ids with this prefix are internal plumbing and exempt from the
/// one-tool-one-resource rule.
pub const INTERNAL_TOOL_PREFIX: &str = "_weft.";
/// The reserved preview resource, likewise exempt.
pub const PREVIEW_RESOURCE_URI: &str = "ui://weft/preview";

pub const DEFAULT_CONFIG_FILE: &str = "weft.toml";

/// Declarative binding of a tool to a UI resource, supplied by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppResource {
    pub tool_id: String,
    pub resource_uri: String,
    pub entry: String,
    /// Entry mounts itself into the DOM; skips the wrapper scaffold. When
    /// unset the builder falls back to a textual heuristic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standalone: Option<bool>,
}

impl AppResource {
    /// Internal resources are exempt from tool-mapping checks.
    pub fn is_internal(&self) -> bool {
        self.tool_id.starts_with(INTERNAL_TOOL_PREFIX) || self.resource_uri == PREVIEW_RESOURCE_URI
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub open_browser: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open_browser: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundlerKind {
    /// Spawn `npx vite build` against the scaffold directory.
    Vite,
    /// Spawn an operator-supplied command.
    Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundlerConfig {
    #[serde(default = "default_bundler_kind")]
    pub kind: BundlerKind,
    /// Global base path override; `/` means derive from namespace/resource.
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default = "default_assets_inline_limit")]
    pub assets_inline_limit: u64,
    /// Program to run when `kind = "command"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            kind: default_bundler_kind(),
            base: default_base(),
            assets_inline_limit: default_assets_inline_limit(),
            command: None,
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    pub version: String,
    pub tool_globs: Vec<String>,
    #[serde(default)]
    pub app_resources: Vec<AppResource>,
    #[serde(default = "default_types_config")]
    pub types_config: String,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "default_dist_dir")]
    pub dist_dir: PathBuf,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub bundler: BundlerConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_bundler_kind() -> BundlerKind {
    BundlerKind::Vite
}

fn default_base() -> String {
    "/".to_string()
}

fn default_assets_inline_limit() -> u64 {
    4096
}

fn default_types_config() -> String {
    "tsconfig.json".to_string()
}

fn default_out_dir() -> PathBuf {
    PathBuf::from(".weft")
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

impl Config {
    /// Parse and validate a config from TOML text.
    pub fn from_str_with_filename(content: &str, filename: &str) -> Result<Self> {
        let ctx = SourceContext::new(content, filename);
        let config: Config = toml::from_str(content).map_err(|e| ctx.parse_error(e))?;
        config.validate(&ctx)?;
        Ok(config)
    }

    /// Synthesize an in-memory config from ad-hoc tool globs, used when no
    /// config file exists but the caller supplied sources explicitly.
    pub fn adhoc(tool_globs: Vec<String>) -> Self {
        Self {
            name: "weft-adhoc".to_string(),
            version: "0.1.0".to_string(),
            tool_globs,
            app_resources: Vec::new(),
            types_config: default_types_config(),
            out_dir: default_out_dir(),
            dist_dir: default_dist_dir(),
            server: ServerConfig::default(),
            bundler: BundlerConfig::default(),
        }
    }

    fn validate(&self, ctx: &SourceContext) -> Result<()> {
        if self.name.is_empty() {
            return Err(ctx.validation_error("name must not be empty"));
        }
        if self.version.is_empty() {
            return Err(ctx.validation_error("version must not be empty"));
        }
        if self.tool_globs.is_empty() || self.tool_globs.iter().any(|g| g.is_empty()) {
            return Err(ctx.validation_error("tool_globs must contain at least one pattern"));
        }
        if self.types_config.is_empty() {
            return Err(ctx.validation_error("types_config must not be empty"));
        }
        for resource in &self.app_resources {
            if resource.tool_id.is_empty() {
                return Err(ctx.validation_error("app_resources entry is missing tool_id"));
            }
            if resource.entry.is_empty() {
                return Err(ctx.validation_error(format!(
                    "app_resources entry '{}' is missing entry",
                    resource.tool_id
                )));
            }
            if !is_valid_resource_uri(&resource.resource_uri) {
                let message = format!(
                    "invalid resource_uri '{}' (expected ui://namespace/resource)",
                    resource.resource_uri
                );
                return Err(match ctx.find_value_span(&resource.resource_uri) {
                    Some(span) => ctx.validation_error_at(message, span),
                    None => ctx.validation_error(message),
                });
            }
        }
        if self.bundler.kind == BundlerKind::Command && self.bundler.command.is_none() {
            return Err(ctx.validation_error("bundler.kind = \"command\" requires bundler.command"));
        }
        Ok(())
    }

    /// Resolve the output directory against a project root.
    pub fn out_dir_in(&self, root: &Path) -> PathBuf {
        resolve_in(root, &self.out_dir)
    }

    /// Resolve the distribution directory against a project root.
    pub fn dist_dir_in(&self, root: &Path) -> PathBuf {
        resolve_in(root, &self.dist_dir)
    }

    /// Resolve the types config path against a project root.
    pub fn types_config_in(&self, root: &Path) -> PathBuf {
        resolve_in(root, Path::new(&self.types_config))
    }

    /// Base path for one resource: the configured global base when it isn't
    /// the default `/`, otherwise `/ui/<namespace>/<resource>/`.
    pub fn base_path_for(&self, namespace: &str, resource: &str) -> String {
        if self.bundler.base != "/" && !self.bundler.base.is_empty() {
            self.bundler.base.clone()
        } else {
            format!("/ui/{namespace}/{resource}/")
        }
    }

    /// Apply `WEFT_*` environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup, used directly by tests.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(out) = lookup("WEFT_OUT_DIR") {
            self.out_dir = PathBuf::from(out);
        }
        if let Some(dist) = lookup("WEFT_DIST_DIR") {
            self.dist_dir = PathBuf::from(dist);
        }
        if let Some(host) = lookup("WEFT_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("WEFT_SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
        self.server.open_browser = env_bool(
            lookup("WEFT_OPEN_BROWSER").as_deref(),
            self.server.open_browser,
        );
        if let Some(base) = lookup("WEFT_BASE") {
            self.bundler.base = base;
        }
        if let Some(limit) = lookup("WEFT_ASSETS_INLINE_LIMIT")
            && let Ok(limit) = limit.parse()
        {
            self.bundler.assets_inline_limit = limit;
        }
    }
}

/// A weft.toml file with both raw content and parsed config.
pub struct WeftToml {
    path: PathBuf,
    content: String,
    config: Config,
}

impl WeftToml {
    /// Open and parse a weft.toml file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|e| Error::io(path.clone(), e))?;
        let filename = path.display().to_string();
        let config = Config::from_str_with_filename(&content, &filename)?;
        Ok(Self {
            path,
            content,
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }
}

fn resolve_in(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// `"true"` and `"1"` are true; any other present value is false; absent
/// falls back.
pub fn env_bool(value: Option<&str>, fallback: bool) -> bool {
    match value {
        None => fallback,
        Some(v) => v == "true" || v == "1",
    }
}
