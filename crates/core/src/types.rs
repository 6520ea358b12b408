use serde::{Deserialize, Serialize};

/// Fixed span given to point events captured by the tap recorder (seconds).
pub const MANUAL_EPSILON: f64 = 0.010;

/// One non-empty line of the lyric source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LyricLine {
    /// Position in the lyric source (0-based)
    pub index: usize,
    /// Original text, untouched by normalization
    pub raw_text: String,
}

/// A timed unit of recognized text (word or segment) from the ASR engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

/// Matcher verdict for a single lyric line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineMatch {
    pub line_index: usize,
    /// Accepted start time, or None when the best score fell below threshold
    pub start: Option<f64>,
    /// Best similarity score seen in the search window (0.0 when none)
    pub score: f64,
}

impl LineMatch {
    pub fn unmatched(line_index: usize, score: f64) -> Self {
        Self {
            line_index,
            start: None,
            score,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.start.is_some()
    }
}

/// Timing for one lyric line. `None` marks an unresolved line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingSegment {
    pub line_index: usize,
    pub start: Option<f64>,
    pub end: Option<f64>,
    /// Original lyric text
    pub text: String,
}

impl TimingSegment {
    pub fn is_known(&self) -> bool {
        self.start.is_some()
    }
}

/// Ordered per-line result of an alignment run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub segments: Vec<TimingSegment>,
}

impl Timeline {
    pub fn new(segments: Vec<TimingSegment>) -> Self {
        Self { segments }
    }

    /// First pair of known starts that decrease, as (earlier_pos, later_pos).
    pub fn first_regression(&self) -> Option<(usize, usize)> {
        let mut last: Option<(usize, f64)> = None;
        for (pos, seg) in self.segments.iter().enumerate() {
            if let Some(start) = seg.start {
                if let Some((prev_pos, prev)) = last {
                    if start < prev {
                        return Some((prev_pos, pos));
                    }
                }
                last = Some((pos, start));
            }
        }
        None
    }
}

/// A timestamp captured live by the operator for one lyric line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualTiming {
    pub line_index: usize,
    /// Seconds since the recorder's start instant
    pub time: f64,
    pub text: String,
}

impl ManualTiming {
    /// Point event widened to the fixed manual span.
    pub fn to_segment(&self) -> TimingSegment {
        TimingSegment {
            line_index: self.line_index,
            start: Some(self.time),
            end: Some(self.time + MANUAL_EPSILON),
            text: self.text.clone(),
        }
    }
}
