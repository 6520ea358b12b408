//! Manual tap timing: the operator presses Enter as each line is sung.

use std::io::{BufRead, Write};
use std::time::Instant;

use crate::error::{AlignError, Result};
use crate::interactive::read_command;
use crate::types::{LyricLine, ManualTiming, TimingSegment};

/// Source of elapsed time, in seconds from an arbitrary origin.
pub trait Clock {
    fn now_secs(&mut self) -> f64;
}

/// Wall clock backed by `Instant`.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_secs(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Result of a tapping session. `timings` is sorted by time.
#[derive(Debug, Clone, PartialEq)]
pub struct TapSession {
    pub timings: Vec<ManualTiming>,
    /// True when the operator quit before the last line
    pub aborted: bool,
}

pub struct TapRecorder<R, W, C> {
    input: R,
    output: W,
    clock: C,
}

impl<R: BufRead, W: Write, C: Clock> TapRecorder<R, W, C> {
    pub fn new(input: R, output: W, clock: C) -> Self {
        Self {
            input,
            output,
            clock,
        }
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)
            .and_then(|_| self.output.flush())
            .map_err(|e| AlignError::io("writing prompt", e))
    }

    /// Returns `false` when the operator asked to stop.
    fn wait_for_tap(&mut self) -> Result<bool> {
        Ok(matches!(read_command(&mut self.input)?, Some(cmd) if !cmd.eq_ignore_ascii_case("q")))
    }

    /// Run the loop over `lines`. The start instant is the first Enter;
    /// each later Enter stamps the displayed line.
    pub fn record(&mut self, lines: &[LyricLine]) -> Result<TapSession> {
        self.say("Start playback, then press Enter to begin (q to quit).")?;
        if !self.wait_for_tap()? {
            return Ok(TapSession {
                timings: Vec::new(),
                aborted: true,
            });
        }
        let t0 = self.clock.now_secs();

        let mut timings = Vec::with_capacity(lines.len());
        let mut aborted = false;
        for (n, line) in lines.iter().enumerate() {
            self.say(&format!("{:02}. {}", n + 1, line.raw_text))?;
            if !self.wait_for_tap()? {
                aborted = true;
                break;
            }
            let time = self.clock.now_secs() - t0;
            log::debug!("Tapped line {} at {:.3}s", line.index, time);
            timings.push(ManualTiming {
                line_index: line.index,
                time,
                text: line.raw_text.clone(),
            });
        }

        if aborted {
            log::warn!("Tapping aborted after {}/{} lines", timings.len(), lines.len());
        }
        timings.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(TapSession { timings, aborted })
    }
}

/// Convert tapped points into canonical segments, ordered by time.
/// Text comes from `line_texts` when the index is in range.
pub fn manual_segments(timings: &[ManualTiming], line_texts: &[String]) -> Vec<TimingSegment> {
    let mut ordered: Vec<&ManualTiming> = timings.iter().collect();
    ordered.sort_by(|a, b| a.time.total_cmp(&b.time));
    ordered
        .into_iter()
        .map(|t| {
            let mut seg = t.to_segment();
            if let Some(text) = line_texts.get(t.line_index) {
                seg.text = text.clone();
            }
            seg
        })
        .collect()
}
