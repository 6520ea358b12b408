//! Lyric source parsing: one line per non-empty text line.

use std::path::Path;

use crate::error::{AlignError, Result};
use crate::types::LyricLine;

/// Split lyric text into lines, dropping blank ones.
///
/// Indices count only the kept lines, so they stay dense.
pub fn parse_lyrics(text: &str) -> Vec<LyricLine> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(index, l)| LyricLine {
            index,
            raw_text: l.to_string(),
        })
        .collect()
}

/// Read and parse a lyric file. A missing or blank file is an input error.
pub fn read_lyrics(path: &Path) -> Result<Vec<LyricLine>> {
    if !path.exists() {
        return Err(AlignError::MissingInput {
            what: "lyrics file",
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| AlignError::io(format!("reading lyrics {}", path.display()), e))?;
    let lines = parse_lyrics(&text);
    if lines.is_empty() {
        return Err(AlignError::EmptyInput {
            what: "lyrics file",
            path: path.to_path_buf(),
        });
    }
    log::debug!("Read {} lyric lines from {}", lines.len(), path.display());
    Ok(lines)
}

/// Raw text of each line, indexable by `line_index`.
pub fn line_texts(lines: &[LyricLine]) -> Vec<String> {
    lines.iter().map(|l| l.raw_text.clone()).collect()
}
