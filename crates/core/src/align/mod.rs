//! Lyric alignment pipeline: normalize, match, assemble, persist.

pub mod matcher;
pub mod normalize;
pub mod timeline;
pub mod tokens;

use std::path::Path;

use crate::config::AlignConfig;
use crate::error::Result;
use crate::lyrics::{line_texts, read_lyrics};
use crate::timing::canonical::write_canonical;
use crate::types::{LineMatch, LyricLine, Timeline, Token};

pub use matcher::{match_line, match_lines, MatchState};
pub use normalize::{normalize, NormalizedText};
pub use timeline::assemble;
pub use tokens::build_tokens;

/// Summary of one alignment run.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignReport {
    pub lines: usize,
    pub tokens: usize,
    pub matched: usize,
    /// Mean score over accepted lines (0.0 when none were accepted)
    pub mean_score: f64,
}

impl AlignReport {
    fn new(matches: &[LineMatch], tokens: usize) -> Self {
        let accepted: Vec<f64> = matches
            .iter()
            .filter(|m| m.is_matched())
            .map(|m| m.score)
            .collect();
        let mean_score = if accepted.is_empty() {
            0.0
        } else {
            accepted.iter().sum::<f64>() / accepted.len() as f64
        };
        Self {
            lines: matches.len(),
            tokens,
            matched: accepted.len(),
            mean_score,
        }
    }

    pub fn unmatched(&self) -> usize {
        self.lines - self.matched
    }
}

/// Align in memory: match every line and assemble the timeline.
pub fn align_lines(
    lines: &[LyricLine],
    tokens: &[Token],
    config: &AlignConfig,
) -> Result<(Timeline, AlignReport)> {
    let matches = match_lines(lines, tokens, config);
    let timeline = assemble(&matches, &line_texts(lines), config.default_span_secs)?;
    Ok((timeline, AlignReport::new(&matches, tokens.len())))
}

/// Full run from files. Inputs are checked before anything is written.
pub fn run_alignment(
    lyrics_path: &Path,
    asr_path: &Path,
    output_path: &Path,
    config: &AlignConfig,
) -> Result<AlignReport> {
    config.validate()?;
    let lines = read_lyrics(lyrics_path)?;
    let tokens = tokens::tokens_from_file(asr_path, config.granularity)?;

    log::info!(
        "Aligning {} lines against {} tokens (window {}, min score {:.2})",
        lines.len(),
        tokens.len(),
        config.window_size,
        config.min_score
    );
    let (timeline, report) = align_lines(&lines, &tokens, config)?;
    write_canonical(output_path, &timeline.segments)?;

    log::info!(
        "Matched {}/{} lines (mean score {:.3}), {} unresolved",
        report.matched,
        report.lines,
        report.mean_score,
        report.unmatched()
    );
    Ok(report)
}
