use clap::Args;
use eyre::Result;
use serde_json::json;
use weft_build::{BuildOptions, build_apps, bundler_from_config};
use weft_core::manifest::apps_manifest_path;

use super::{GlobalArgs, UnwrapOrExit};
use crate::emit::{Emission, emit_diagnostics};

#[derive(Args)]
pub struct BuildCommand {}

impl BuildCommand {
    pub async fn run(&self, globals: &GlobalArgs) -> Result<()> {
        let (config, root) = globals.load_config().unwrap_or_exit();
        let bundler = bundler_from_config(&config.bundler);
        let result = build_apps(
            &config,
            &root,
            bundler.as_ref(),
            BuildOptions {
                strict: globals.strict,
            },
        )
        .await
        .unwrap_or_exit();

        if globals.json || !result.diagnostics.is_empty() {
            emit_diagnostics(Emission {
                command: "build",
                diagnostics: &result.diagnostics,
                success: result.success,
                json: globals.json,
                context: json!({
                    "manifestPath": apps_manifest_path(&config.out_dir_in(&root)),
                }),
            });
        }
        if !result.success {
            std::process::exit(1);
        }
        Ok(())
    }
}
