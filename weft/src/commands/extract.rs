use clap::Args;
use eyre::Result;
use serde_json::json;
use weft_core::manifest::tool_manifest_path;
use weft_extract::{ExtractOptions, extract_tools};

use super::{GlobalArgs, UnwrapOrExit};
use crate::emit::{Emission, emit_diagnostics};

#[derive(Args)]
pub struct ExtractCommand {}

impl ExtractCommand {
    pub async fn run(&self, globals: &GlobalArgs) -> Result<()> {
        let (config, root) = globals.load_config().unwrap_or_exit();
        let result = extract_tools(
            &config,
            &root,
            ExtractOptions {
                strict: globals.strict,
            },
        )
        .await
        .unwrap_or_exit();

        if globals.json || !result.diagnostics.is_empty() {
            emit_diagnostics(Emission {
                command: "extract",
                diagnostics: &result.diagnostics,
                success: result.success,
                json: globals.json,
                context: json!({
                    "manifestPath": tool_manifest_path(&config.out_dir_in(&root)),
                }),
            });
        }
        if !result.success {
            std::process::exit(1);
        }
        Ok(())
    }
}
