//! Best-effort browser launching.

use tracing::warn;

fn opener() -> &'static str {
    if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "cmd"
    } else {
        "xdg-open"
    }
}

/// Launch the platform browser opener; failure is logged, never fatal.
pub async fn try_open_browser(url: &str) {
    let mut command = tokio::process::Command::new(opener());
    if cfg!(target_os = "windows") {
        command.args(["/C", "start", url]);
    } else {
        command.arg(url);
    }
    match command.status().await {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(url, %status, "browser opener exited unsuccessfully"),
        Err(err) => warn!(url, %err, "failed to launch browser"),
    }
}
