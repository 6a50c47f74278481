//! Configuration file editor command.
//!
//! Opens the radioscope configuration file in the user's preferred editor and
//! validates it afterwards.

use crate::config::{get_config_path, ScopeConfig};
use std::process::Command;

/// Opens the configuration file in the user's preferred editor.
///
/// The file is created with defaults first if it does not exist yet.
/// Tries `$EDITOR`, then nano, then vi.
///
/// # Errors
/// - If no editor can be found or executed
/// - If the editor exits with an error
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = get_config_path()?;
    if !config_path.exists() {
        ScopeConfig::default().save_to(&config_path)?;
    }

    tracing::info!("Opening config file: {}", config_path.display());

    let editor = find_editor()?;
    tracing::debug!("Using editor: {}", editor);

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

    // Report mistakes now rather than at the next session start.
    match ScopeConfig::load_from(&config_path) {
        Ok(_) => tracing::info!("Config file edited successfully"),
        Err(e) => {
            tracing::warn!("Edited config is invalid: {e}");
            eprintln!("Warning: {e}");
        }
    }
    Ok(())
}

/// Picks `$EDITOR` if set, otherwise the first of nano or vi on the PATH.
fn find_editor() -> anyhow::Result<String> {
    if let Ok(editor) = std::env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    ["nano", "vi"]
        .into_iter()
        .find(|editor| is_editor_available(editor))
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("No editor found. Please set the $EDITOR environment variable."))
}

fn is_editor_available(editor: &str) -> bool {
    Command::new("which")
        .arg(editor)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
