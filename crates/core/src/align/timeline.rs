//! Turn per-line match verdicts into a timeline of timing segments.

use crate::error::{AlignError, Result};
use crate::types::{LineMatch, Timeline, TimingSegment};

/// End time for every known start: the next known start when it does not
/// precede this one, otherwise `start + default_span`. Unknown stays unknown.
pub fn derive_ends(starts: &[Option<f64>], default_span: f64) -> Vec<Option<f64>> {
    let mut ends = vec![None; starts.len()];
    let mut next_known: Option<f64> = None;
    for (i, start) in starts.iter().enumerate().rev() {
        if let Some(s) = *start {
            ends[i] = Some(match next_known {
                Some(next) if next >= s => next,
                _ => s + default_span,
            });
            next_known = Some(s);
        }
    }
    ends
}

/// Fail loudly if known starts ever decrease.
pub fn validate_monotonic(timeline: &Timeline) -> Result<()> {
    match timeline.first_regression() {
        None => Ok(()),
        Some((a, b)) => Err(AlignError::InvariantViolation {
            message: format!(
                "line {} starts at {:?} before line {} at {:?}",
                timeline.segments[b].line_index,
                timeline.segments[b].start,
                timeline.segments[a].line_index,
                timeline.segments[a].start,
            ),
        }),
    }
}

/// Build one segment per lyric line. Text comes from `line_texts`, indexed
/// by `line_index`; lines without an accepted match get unknown timing.
pub fn assemble(matches: &[LineMatch], line_texts: &[String], default_span: f64) -> Result<Timeline> {
    let mut starts: Vec<Option<f64>> = vec![None; line_texts.len()];
    for m in matches {
        let slot = starts.get_mut(m.line_index).ok_or_else(|| AlignError::InvariantViolation {
            message: format!(
                "match for line {} but only {} lines",
                m.line_index,
                line_texts.len()
            ),
        })?;
        *slot = m.start;
    }

    let ends = derive_ends(&starts, default_span);
    let segments = line_texts
        .iter()
        .enumerate()
        .map(|(i, text)| TimingSegment {
            line_index: i,
            start: starts[i],
            end: ends[i],
            text: text.clone(),
        })
        .collect();

    let timeline = Timeline::new(segments);
    validate_monotonic(&timeline)?;
    Ok(timeline)
}
