//! Flatten ASR output into an ordered, deduplicated token stream.
//!
//! ASR engines disagree on shape: a bare list of words, `{"segments": [...]}`
//! with or without nested `"words"`, word lists under arbitrary keys. Every
//! JSON node is classified as a timed record, a container of further nodes,
//! or a scalar, and the walk dispatches on that classification.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;

use crate::align::normalize::normalize;
use crate::config::Granularity;
use crate::error::{AlignError, Result};
use crate::types::Token;

/// Keys that may carry a record's text, in preference order.
const TEXT_KEYS: [&str; 3] = ["word", "text", "token"];

/// Structural role of one JSON node.
enum TimedNode<'a> {
    /// Object with text and both bounds; its values may nest more records.
    Record {
        token: Token,
        nested: Vec<&'a Value>,
    },
    /// List, or object without usable timing: only children can hold records.
    Container(Vec<&'a Value>),
    Scalar,
}

fn as_seconds(value: &Value) -> Option<f64> {
    let secs = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    secs.is_finite().then_some(secs)
}

fn record_text(obj: &serde_json::Map<String, Value>) -> Option<&str> {
    TEXT_KEYS
        .iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|t| !t.is_empty())
}

fn classify(value: &Value) -> TimedNode<'_> {
    match value {
        Value::Array(items) => TimedNode::Container(items.iter().collect()),
        Value::Object(obj) => {
            let children: Vec<&Value> = obj.values().collect();
            let start = obj.get("start").and_then(as_seconds);
            let end = obj.get("end").and_then(as_seconds);
            match (record_text(obj), start, end) {
                (Some(text), Some(start), Some(end)) if start <= end => TimedNode::Record {
                    token: Token {
                        text: text.to_string(),
                        start,
                        end,
                    },
                    nested: children,
                },
                (Some(text), Some(start), Some(end)) => {
                    log::debug!("Skipping inverted record {:?} ({} > {})", text, start, end);
                    TimedNode::Container(children)
                }
                _ => TimedNode::Container(children),
            }
        }
        _ => TimedNode::Scalar,
    }
}

fn collect(value: &Value, granularity: Granularity, out: &mut Vec<Token>) {
    match classify(value) {
        TimedNode::Record { token, nested } => {
            let before = out.len();
            for child in nested {
                collect(child, granularity, out);
            }
            if granularity == Granularity::All || out.len() == before {
                out.push(token);
            }
        }
        TimedNode::Container(children) => {
            for child in children {
                collect(child, granularity, out);
            }
        }
        TimedNode::Scalar => {}
    }
}

/// Extract every timed record, sorted by start, exact duplicates removed.
pub fn build_tokens(raw: &Value, granularity: Granularity) -> Vec<Token> {
    let mut found = Vec::new();
    collect(raw, granularity, &mut found);

    found.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter(|t| seen.insert((t.text.clone(), t.start.to_bits(), t.end.to_bits())))
        .collect()
}

/// Parse an ASR JSON file.
pub fn load_asr_json(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(AlignError::MissingInput {
            what: "ASR output",
            path: path.to_path_buf(),
        });
    }
    let data = std::fs::read_to_string(path)
        .map_err(|e| AlignError::io(format!("reading ASR output {}", path.display()), e))?;
    serde_json::from_str(&data)
        .map_err(|e| AlignError::json(format!("parsing ASR output {}", path.display()), e))
}

/// Load ASR output and build its token stream. No tokens at all is fatal.
pub fn tokens_from_file(path: &Path, granularity: Granularity) -> Result<Vec<Token>> {
    let raw = load_asr_json(path)?;
    let tokens = build_tokens(&raw, granularity);
    if tokens.is_empty() {
        return Err(AlignError::NoTimedText);
    }
    log::info!("Built {} tokens from {}", tokens.len(), path.display());
    Ok(tokens)
}

/// Dump a token stream as `word,start,end,normalized` for inspection.
pub fn write_token_csv(path: &Path, tokens: &[Token]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AlignError::io(format!("creating {}", parent.display()), e))?;
    }
    let context = || format!("writing tokens to {}", path.display());
    let mut writer = csv::Writer::from_path(path).map_err(|e| AlignError::csv(context(), e))?;
    writer
        .write_record(["word", "start", "end", "normalized"])
        .map_err(|e| AlignError::csv(context(), e))?;
    for t in tokens {
        let start = format!("{:.3}", t.start);
        let end = format!("{:.3}", t.end);
        let normalized = normalize(&t.text);
        writer
            .write_record([t.text.as_str(), start.as_str(), end.as_str(), normalized.as_str()])
            .map_err(|e| AlignError::csv(context(), e))?;
    }
    writer.flush().map_err(|e| AlignError::io(context(), e))?;
    log::info!("Wrote {} tokens to {}", tokens.len(), path.display());
    Ok(())
}
