//! Tunable alignment parameters.
//!
//! The defaults are empirical; none of them is known to be optimal.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AlignError, Result};

/// Which records the token stream builder keeps when ASR output nests
/// timed records (e.g. segments containing words).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// A record with nested timed records is replaced by them.
    #[default]
    Finest,
    /// Every timed record at every depth.
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignConfig {
    /// Tokens searched ahead of the cursor for each line
    pub window_size: usize,
    /// Minimum similarity (inclusive) for a match to be accepted
    pub min_score: f64,
    /// Leading words of each line used for scoring
    pub prefix_words: usize,
    /// Candidate token-run lengths span `words - slack ..= words + slack`
    pub length_slack: usize,
    /// Hard cap on candidate token-run length
    pub max_candidate_tokens: usize,
    /// Span given to a line with no later known start (seconds)
    pub default_span_secs: f64,
    pub granularity: Granularity,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            window_size: 500,
            min_score: 0.42,
            prefix_words: 6,
            length_slack: 2,
            max_candidate_tokens: 12,
            default_span_secs: 2.0,
            granularity: Granularity::Finest,
        }
    }
}

impl AlignConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| AlignError::io(format!("reading config {}", path.display()), e))?;
        let config: AlignConfig = serde_json::from_str(&data)
            .map_err(|e| AlignError::json(format!("parsing config {}", path.display()), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let problem = if self.window_size == 0 {
            Some("window_size must be at least 1")
        } else if !(0.0..=1.0).contains(&self.min_score) {
            Some("min_score must lie in [0, 1]")
        } else if self.prefix_words == 0 {
            Some("prefix_words must be at least 1")
        } else if self.max_candidate_tokens == 0 {
            Some("max_candidate_tokens must be at least 1")
        } else if self.default_span_secs.is_nan() || self.default_span_secs < 0.0 {
            Some("default_span_secs must be non-negative")
        } else {
            None
        };
        match problem {
            Some(message) => Err(AlignError::InvalidConfig {
                message: message.to_string(),
            }),
            None => Ok(()),
        }
    }
}
