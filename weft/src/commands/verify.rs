use clap::Args;
use eyre::Result;
use serde_json::json;
use weft_core::manifest::verify_report_path;
use weft_verify::{ReqwestFetch, VerifyOptions, verify};

use super::{GlobalArgs, UnwrapOrExit};
use crate::emit::{Emission, emit_diagnostics};

#[derive(Args)]
pub struct VerifyCommand {
    /// Fetch every asset the served markup references and check for a root
    /// element
    #[arg(long)]
    pub headless: bool,

    /// Base URL of the server to probe (defaults to the configured host/port)
    #[arg(long)]
    pub base_url: Option<String>,
}

impl VerifyCommand {
    pub async fn run(&self, globals: &GlobalArgs) -> Result<()> {
        let (config, root) = globals.load_config().unwrap_or_exit();
        let fetch = ReqwestFetch::new();
        let result = verify(
            &config,
            &root,
            &fetch,
            VerifyOptions {
                strict: globals.strict,
                headless: self.headless.then_some(true),
                base_url: self.base_url.clone(),
            },
        )
        .await
        .unwrap_or_exit();

        if globals.json || !result.diagnostics.is_empty() {
            emit_diagnostics(Emission {
                command: "verify",
                diagnostics: &result.diagnostics,
                success: result.success,
                json: globals.json,
                context: json!({
                    "reportPath": verify_report_path(&config.out_dir_in(&root)),
                    "headless": result.headless,
                }),
            });
        }
        if !result.success {
            std::process::exit(1);
        }
        Ok(())
    }
}
