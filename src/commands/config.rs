//! Open wfall.toml in the user's editor.

use crate::config::get_config_path;
use std::process::Command;

/// Editors tried when $EDITOR is unset, in order.
const FALLBACK_EDITORS: [&str; 2] = ["nano", "vi"];

/// Opens the configuration file in $EDITOR, falling back to nano then vi.
///
/// # Errors
/// - If no editor can be found or it exits with an error
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = get_config_path()?;
    let editor = find_editor(std::env::var("EDITOR").ok(), is_editor_available)?;
    tracing::info!("Opening {} with {}", config_path.display(), editor);

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to open editor '{editor}': {e}. Make sure the editor is installed and accessible."
            )
        })?;

    if !status.success() {
        return Err(anyhow::anyhow!(
            "Editor exited with error code: {}",
            status.code().unwrap_or(-1)
        ));
    }

    Ok(())
}

/// Picks `$EDITOR` if set, else the first available fallback.
fn find_editor(
    env_editor: Option<String>,
    available: impl Fn(&str) -> bool,
) -> anyhow::Result<String> {
    if let Some(editor) = env_editor.filter(|e| !e.trim().is_empty()) {
        return Ok(editor);
    }
    FALLBACK_EDITORS
        .into_iter()
        .find(|editor| available(editor))
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("No editor found. Please set the $EDITOR environment variable."))
}

fn is_editor_available(editor: &str) -> bool {
    Command::new("which")
        .arg(editor)
        .output()
        .is_ok_and(|output| output.status.success())
}
