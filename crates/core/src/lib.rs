//! Lyric-to-timing alignment: turns known lyric text plus time-stamped ASR
//! output into a per-line timing table for karaoke rendering.

pub mod align;
pub mod config;
pub mod error;
pub mod interactive;
pub mod lyrics;
pub mod timing;
pub mod types;

pub use config::AlignConfig;
pub use error::{AlignError, Result};
pub use types::{LineMatch, LyricLine, ManualTiming, Timeline, TimingSegment, Token};
