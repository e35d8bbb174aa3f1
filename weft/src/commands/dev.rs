use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use notify::{RecursiveMode, Watcher};
use tracing::{debug, error, warn};
use weft_core::Config;

use super::{GlobalArgs, UnwrapOrExit};
use crate::pipeline::{DevState, glob_base, rebuild_and_serve};

#[derive(Args)]
pub struct DevCommand {}

impl DevCommand {
    pub async fn run(&self, globals: &GlobalArgs) -> Result<()> {
        watch_loop("dev", globals, &|| globals.load_config()).await
    }
}

/// Watch inputs and re-run the pipeline on change.
///
/// Triggers that arrive while a rebuild is in flight collapse into a single
/// pending slot (a bounded channel of capacity one), so there is at most one
/// run executing and at most one catch-up run queued. In-flight runs are
/// never cancelled.
pub(crate) async fn watch_loop(
    command: &str,
    globals: &GlobalArgs,
    load: &dyn Fn() -> weft_core::Result<(Config, PathBuf)>,
) -> Result<()> {
    let (config, root) = load().unwrap_or_exit();
    let mut state = DevState::new();
    rebuild_and_serve(command, &config, &root, globals, &mut state)
        .await
        .unwrap_or_exit();

    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        if event.is_ok() {
            // Full channel means a run is already pending; drop the trigger.
            let _ = tx.try_send(());
        }
    })?;

    for pattern in &config.tool_globs {
        let base = root.join(glob_base(pattern));
        if let Err(err) = watcher.watch(&base, RecursiveMode::Recursive) {
            warn!(path = %base.display(), %err, "unable to watch glob base");
        }
    }
    for resource in &config.app_resources {
        let entry = root.join(&resource.entry);
        if let Err(err) = watcher.watch(&entry, RecursiveMode::NonRecursive) {
            warn!(path = %entry.display(), %err, "unable to watch entry");
        }
    }
    if let Err(err) = watcher.watch(&globals.config, RecursiveMode::NonRecursive) {
        warn!(path = %globals.config.display(), %err, "unable to watch config");
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = rx.recv() => {
                if received.is_none() {
                    break;
                }
                debug!("change detected; rebuilding");
                // Reload so config edits take effect on the next run.
                match load() {
                    Ok((config, root)) => {
                        if let Err(err) = rebuild_and_serve(command, &config, &root, globals, &mut state).await {
                            error!("{err}");
                        }
                    }
                    Err(err) => error!("config reload failed: {err}"),
                }
            }
        }
    }

    if let Some(server) = state.server.take() {
        server.stop().await;
    }
    Ok(())
}
