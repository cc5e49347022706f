//! Grammar excerpt for the model prompt

use crate::error::Result;
use std::path::Path;

/// Characters of grammar text embedded into the system instruction.
pub const EXCERPT_CHARS: usize = 2000;

pub fn load_grammar_text(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Drop blank and `#` comment lines, then keep the first [`EXCERPT_CHARS`] characters.
pub fn excerpt(grammar: &str) -> String {
    let joined = grammar
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .collect::<Vec<_>>()
        .join("\n");
    joined.chars().take(EXCERPT_CHARS).collect()
}
