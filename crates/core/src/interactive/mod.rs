//! Operator-driven loops: manual tap timing and offset tuning.
//!
//! Both loops read commands from any `BufRead` and write prompts to any
//! `Write`, so a terminal and a scripted test drive them the same way.

pub mod render;
pub mod tap;
pub mod tuner;

use std::io::BufRead;

use crate::error::{AlignError, Result};

pub use render::{CommandRenderer, PreviewRenderer};
pub use tap::{manual_segments, Clock, SystemClock, TapRecorder, TapSession};
pub use tuner::{tune, OffsetTuner, TuneRequest, TunerCommand, TunerOutcome, TunerState};

/// Next trimmed input line, or `None` at end of input.
fn read_command<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    let n = input
        .read_line(&mut line)
        .map_err(|e| AlignError::io("reading operator input", e))?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
