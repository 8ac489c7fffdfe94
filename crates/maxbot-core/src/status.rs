use std::path::Path;

use crate::Result;

/// Write the startup status line: `{bot username}|active|{chat count}`.
/// Informational only; nothing in the bot reads it back.
pub fn write_status_file(path: &Path, username: &str, chat_count: usize) -> Result<()> {
    std::fs::write(path, format!("{username}|active|{chat_count}"))?;
    Ok(())
}
