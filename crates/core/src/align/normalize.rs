//! Canonical comparison form for lyric lines and ASR tokens.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static::lazy_static! {
    /// Typographic punctuation mapped onto ASCII before stripping.
    static ref TYPOGRAPHIC: Vec<(char, char)> = vec![
        ('\u{2018}', '\''), ('\u{2019}', '\''), ('\u{201A}', '\''), ('\u{201B}', '\''),
        ('\u{2032}', '\''), ('\u{02BC}', '\''), ('`', '\''),
        ('\u{201C}', '"'), ('\u{201D}', '"'), ('\u{201E}', '"'), ('\u{201F}', '"'),
        ('\u{2010}', '-'), ('\u{2011}', '-'), ('\u{2012}', '-'), ('\u{2013}', '-'),
        ('\u{2014}', '-'), ('\u{2015}', '-'), ('\u{2212}', '-'),
    ];
}

/// Lowercase, accent-folded, punctuation-stripped text. Used only for
/// comparison; never written back as lyric content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|w| !w.is_empty())
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }

    /// The first `n` words joined by single spaces.
    pub fn prefix(&self, n: usize) -> String {
        self.words().take(n).collect::<Vec<_>>().join(" ")
    }
}

fn map_typographic(c: char) -> char {
    TYPOGRAPHIC
        .iter()
        .find(|(from, _)| *from == c)
        .map(|(_, to)| *to)
        .unwrap_or(c)
}

fn is_kept(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\'' || c == '-' || c.is_whitespace()
}

/// Compatibility-decompose and drop combining marks.
fn decompose(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Normalize text for comparison. Idempotent.
///
/// Decomposition runs before lowercasing so compatibility forms that
/// expand to capitals (`ℌ`, `ᴬ`) are caught, and again after it because
/// lowercasing can itself produce combining marks (`İ`).
pub fn normalize(text: &str) -> NormalizedText {
    let folded: String = decompose(&decompose(text).to_lowercase())
        .chars()
        .map(map_typographic)
        .filter(|c| is_kept(*c))
        .collect();

    NormalizedText(folded.split_whitespace().collect::<Vec<_>>().join(" "))
}
