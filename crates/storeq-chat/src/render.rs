//! Terminal rendering of bot replies

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use storeq_api::{Attachment, ChoiceSet, CommandInfo, Reply};

/// Keyboard rows as `[Hoy] [Ayer]` lines
pub fn format_choices(choices: &ChoiceSet) -> String {
    choices
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|label| format!("[{}]", label))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_menu(commands: &[CommandInfo]) -> String {
    commands
        .iter()
        .map(|c| format!("/{:<10} {}", c.name, c.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything a reply shows on screen, minus the attachment body
pub fn format_reply(reply: &Reply) -> String {
    let mut out = reply.text.clone();
    match &reply.choices {
        Some(choices) if !choices.is_empty() => {
            out.push_str("\n\n");
            out.push_str(&format_choices(choices));
        }
        _ => {}
    }
    out
}

/// Write an attachment under `dir`, keeping only the final path component
pub fn save_attachment(dir: &Path, attachment: &Attachment) -> Result<PathBuf> {
    let name = Path::new(&attachment.filename)
        .file_name()
        .context("Attachment has no file name")?;
    let path = dir.join(name);
    std::fs::write(&path, &attachment.content)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}
