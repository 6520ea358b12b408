//! Windowed fuzzy matching of lyric lines against the token stream.
//!
//! Lines are matched in order. Each line searches only forward from a cursor
//! into the token stream, so accepted start times never move backward. The
//! per-line step is a pure function of `(MatchState, line)`; `match_lines`
//! folds it across the whole song.

use strsim::normalized_levenshtein;

use crate::align::normalize::{normalize, NormalizedText};
use crate::config::AlignConfig;
use crate::types::{LineMatch, LyricLine, Token};

/// State carried from one line's match to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchState {
    /// First token index the next line may start at
    pub cursor: usize,
    /// Start time of the most recently accepted line
    pub last_start: Option<f64>,
}

/// Token stream with each token's text normalized once up front.
pub struct PreparedTokens<'a> {
    tokens: &'a [Token],
    words: Vec<Vec<String>>,
}

impl<'a> PreparedTokens<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let words = tokens
            .iter()
            .map(|t| normalize(&t.text).words().map(str::to_string).collect())
            .collect();
        Self { tokens, words }
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }
}

/// Best-scoring candidate run in the window: (start token index, score).
///
/// Candidate runs begin at every token in `[cursor, cursor + window_size)`
/// that carries at least one word, and grow token by token; a run is scored once its word count reaches
/// `target - slack` and growth stops at `target + slack` words. Earlier
/// candidates win ties.
fn best_candidate(
    line: &NormalizedText,
    prepared: &PreparedTokens<'_>,
    cursor: usize,
    config: &AlignConfig,
) -> Option<(usize, f64)> {
    let target = line.word_count().min(config.prefix_words);
    let query = line.prefix(target);
    let min_words = target.saturating_sub(config.length_slack).max(1);
    let max_words = target + config.length_slack;

    let n = prepared.len();
    let window_end = n.min(cursor.saturating_add(config.window_size));
    let mut best: Option<(usize, f64)> = None;

    for j in cursor..window_end {
        // a run may not open on a token that normalizes to nothing ("♪", "...")
        if prepared.words[j].is_empty() {
            continue;
        }
        let mut run: Vec<&str> = Vec::with_capacity(max_words);
        for words in prepared.words.iter().skip(j).take(config.max_candidate_tokens) {
            run.extend(words.iter().map(String::as_str));
            if run.is_empty() || run.len() < min_words {
                continue;
            }
            let shown = run.len().min(max_words);
            let candidate = run[..shown].join(" ");
            let score = normalized_levenshtein(&query, &candidate);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((j, score));
            }
            if run.len() >= max_words {
                break;
            }
        }
        if matches!(best, Some((_, s)) if s >= 1.0) {
            break;
        }
    }

    best
}

/// Match one line, returning its verdict and the state for the next line.
///
/// An accepted line moves the cursor one past its start token, so a
/// repeated line searches after the previous occurrence. Below-threshold
/// and empty lines leave the state untouched.
pub fn match_line(
    state: MatchState,
    line: &LyricLine,
    prepared: &PreparedTokens<'_>,
    config: &AlignConfig,
) -> (LineMatch, MatchState) {
    let normalized = normalize(&line.raw_text);
    if normalized.is_empty() || state.cursor >= prepared.len() {
        return (LineMatch::unmatched(line.index, 0.0), state);
    }

    let Some((j, score)) = best_candidate(&normalized, prepared, state.cursor, config) else {
        return (LineMatch::unmatched(line.index, 0.0), state);
    };

    if score < config.min_score {
        log::debug!(
            "Line {} unmatched (best {:.3} at token {}): {}",
            line.index,
            score,
            j,
            line.raw_text
        );
        return (LineMatch::unmatched(line.index, score), state);
    }

    let token_start = prepared.tokens[j].start;
    let start = state.last_start.map_or(token_start, |prev| prev.max(token_start));
    log::debug!(
        "Line {} -> token {} at {:.3}s (score {:.3})",
        line.index,
        j,
        start,
        score
    );

    let matched = LineMatch {
        line_index: line.index,
        start: Some(start),
        score,
    };
    let next = MatchState {
        cursor: j + 1,
        last_start: Some(start),
    };
    (matched, next)
}

/// Match every line in order, threading the cursor through.
pub fn match_lines(lines: &[LyricLine], tokens: &[Token], config: &AlignConfig) -> Vec<LineMatch> {
    let prepared = PreparedTokens::new(tokens);
    lines
        .iter()
        .scan(MatchState::default(), |state, line| {
            let (result, next) = match_line(*state, line, &prepared, config);
            *state = next;
            Some(result)
        })
        .collect()
}
