mod build;
mod completions;
mod dev;
mod extract;
mod init;
mod preview;
mod verify;

use std::path::{Path, PathBuf};

use build::BuildCommand;
use clap::{Parser, Subcommand};
use completions::CompletionsCommand;
use dev::DevCommand;
use extract::ExtractCommand;
use eyre::Result;
use init::InitCommand;
use preview::PreviewCommand;
use tracing_subscriber::EnvFilter;
use verify::VerifyCommand;
use weft_core::{Config, WeftToml};

/// Extension trait for exiting on config errors with pretty formatting
pub(crate) trait UnwrapOrExit<T> {
    fn unwrap_or_exit(self) -> T;
}

impl<T> UnwrapOrExit<T> for weft_core::Result<T> {
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(*e));
                std::process::exit(1);
            }
        }
    }
}

/// Global flags shared by every subcommand.
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct GlobalArgs {
    /// Path to weft.toml
    #[arg(long, global = true, env = "WEFT_CONFIG", default_value = weft_core::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Override out_dir
    #[arg(long, global = true, env = "WEFT_OUT_DIR")]
    pub out: Option<PathBuf>,

    /// Treat warnings as errors
    #[arg(long, global = true, env = "WEFT_STRICT")]
    pub strict: bool,

    /// Emit diagnostics as JSON on stdout
    #[arg(long, global = true, env = "WEFT_JSON")]
    pub json: bool,

    /// Enable verbose logging
    #[arg(long, global = true, env = "WEFT_VERBOSE")]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Load and validate the config, apply env and CLI overrides, and return
    /// it with the project root (the config file's directory).
    pub fn load_config(&self) -> weft_core::Result<(Config, PathBuf)> {
        let weft_toml = WeftToml::open(&self.config)?;
        let root = weft_toml
            .path()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        let mut config = weft_toml.into_config();
        config.apply_env_overrides();
        if let Some(out) = &self.out {
            config.out_dir = out.clone();
        }
        Ok((config, root))
    }
}

#[derive(Parser)]
#[command(name = "weft")]
#[command(version)]
#[command(about = "Discover annotated tools, build their UI resources, and verify the wiring")]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    globals: GlobalArgs,
}

impl Cli {
    /// Configure the process-wide tracing subscriber exactly once. Logs go
    /// to stderr so `--json` payloads own stdout.
    pub fn init_tracing(&self) {
        let default = if self.globals.verbose {
            "debug"
        } else if self.globals.json {
            "error"
        } else {
            "info"
        };
        let filter = EnvFilter::try_from_env("WEFT_LOG")
            .unwrap_or_else(|_| EnvFilter::new(default));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Init(cmd) => cmd.run(&self.globals).await,
            Commands::Extract(cmd) => cmd.run(&self.globals).await,
            Commands::Build(cmd) => cmd.run(&self.globals).await,
            Commands::Verify(cmd) => cmd.run(&self.globals).await,
            Commands::Dev(cmd) => cmd.run(&self.globals).await,
            Commands::Preview(cmd) => cmd.run(&self.globals).await,
            Commands::Completions(cmd) => cmd.run(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold the weather demo (config + tool + UI entry)
    Init(InitCommand),

    /// Extract the tool manifest from annotated sources
    Extract(ExtractCommand),

    /// Build app resources and write the apps manifest
    Build(BuildCommand),

    /// Run static + live checks against a running server
    Verify(VerifyCommand),

    /// Watch sources, rebuild, and run the dev server
    Dev(DevCommand),

    /// Generate a preview UI for one tool and serve it
    Preview(PreviewCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}
