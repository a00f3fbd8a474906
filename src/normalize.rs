//! Separator normalisation applied to merged text before it is split into sessions.
//!
//! Input files mark session boundaries with blank lines, but the number of blank lines (and
//! the presence of `\r` or stray whitespace on them) varies between sources. The normaliser
//! rewrites the merged text so that exactly one [`SESSION_SEPARATOR`] sits between sessions,
//! which gives the duplicate filter a single, well-defined split point.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Delimiter between sessions, shared by normalisation, splitting and output.
pub const SESSION_SEPARATOR: &str = "\n\n";

/// Strategy used to canonicalise separators.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeparatorMode {
    /// Collapses every run of blank lines into one [`SESSION_SEPARATOR`], strips `\r` line
    /// endings and treats each input file boundary as a session boundary. Idempotent.
    #[default]
    Canonical,
    /// Byte-compatible with the historical tool: line endings of each file are translated to
    /// `\n` as a text-mode read would, then one non-overlapping pass replaces two newlines by
    /// one and the result is trimmed. Files are concatenated without a boundary.
    Legacy,
}

impl SeparatorMode {
    /// Text inserted between consecutive input files in the accumulator, if any.
    #[must_use]
    pub fn file_boundary(self) -> Option<&'static str> {
        match self {
            Self::Canonical => Some(SESSION_SEPARATOR),
            Self::Legacy => None,
        }
    }

    /// Prepares the content of one input file before it is accumulated.
    ///
    /// `Legacy` translates `\r\n` and lone `\r` to `\n`; `Canonical` leaves the text untouched
    /// since [`normalize_separators`] handles `\r` itself.
    #[must_use]
    pub fn prepare_file(self, content: &str) -> Cow<'_, str> {
        match self {
            Self::Legacy if content.contains('\r') => {
                Cow::Owned(content.replace("\r\n", "\n").replace('\r', "\n"))
            }
            _ => Cow::Borrowed(content),
        }
    }

    /// Normalises `text` according to this mode.
    #[must_use]
    pub fn normalize(self, text: &str) -> String {
        match self {
            Self::Canonical => normalize_separators(text),
            Self::Legacy => legacy_normalize(text),
        }
    }
}

/// Canonicalises session separators and strips surrounding whitespace.
///
/// Runs of one or more blank lines (empty, whitespace-only or `\r`-only) become a single
/// [`SESSION_SEPARATOR`]; single newlines inside a session are preserved; leading and trailing
/// whitespace is removed. Applying the function twice yields the same result as applying it once.
#[must_use]
pub fn normalize_separators(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_break = false;
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            pending_break = true;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_break { SESSION_SEPARATOR } else { "\n" });
        }
        out.push_str(line);
        pending_break = false;
    }
    let trimmed = out.trim();
    if trimmed.len() == out.len() {
        out
    } else {
        trimmed.to_string()
    }
}

fn legacy_normalize(text: &str) -> String {
    text.replace(SESSION_SEPARATOR, "\n").trim().to_string()
}
