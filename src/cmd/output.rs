use anyhow::Result;
use serde::Serialize;

use crate::OutputFormat;

/// Print `value` as pretty JSON, or hand it to `text` for human output.
pub fn emit<T: Serialize>(value: &T, format: OutputFormat, text: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(value),
    }
    Ok(())
}

pub fn truncate_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

pub fn quality_label(quality: Option<u32>) -> String {
    quality.map_or_else(|| "?".to_string(), |q| format!("{q}p"))
}
