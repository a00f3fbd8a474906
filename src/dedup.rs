//! Exact-match duplicate detection over sessions.
//!
//! A session is the text between two [`SESSION_SEPARATOR`]s. Each session is fingerprinted with
//! MD5 and only its first occurrence within a domain survives. The [`FingerprintSet`] is owned by
//! the caller so that it can span every flush of a domain.

use std::fmt;

use md5::{Digest, Md5};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::normalize::SESSION_SEPARATOR;

/// 128-bit MD5 digest of a session's UTF-8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// Fingerprints a session.
    #[must_use]
    pub fn of(session: &str) -> Self {
        let digest = Md5::digest(session.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Fingerprints seen so far in one domain. Grows monotonically; entries are never removed.
#[derive(Debug, Default, Clone)]
pub struct FingerprintSet {
    seen: FxHashSet<Fingerprint>,
}

impl FingerprintSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `fingerprint`, returning `true` if it was not present before.
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        self.seen.insert(fingerprint)
    }

    /// Returns `true` when `fingerprint` has already been recorded.
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Number of distinct fingerprints recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns `true` when nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Treatment of zero-length sessions, which only arise from empty or separator-only text.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmptySessionPolicy {
    /// Empty sessions are neither emitted nor fingerprinted.
    #[default]
    Drop,
    /// Empty sessions are fingerprinted like any other, so the first one is emitted once.
    Keep,
}

/// Result of filtering one flush worth of normalised text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Surviving sessions, each followed by [`SESSION_SEPARATOR`].
    pub text: String,
    /// Sessions emitted into `text`.
    pub kept: usize,
    /// Sessions discarded because their fingerprint was already known.
    pub duplicates: usize,
    /// Empty sessions discarded under [`EmptySessionPolicy::Drop`].
    pub empty: usize,
}

/// Removes sessions of `text` whose fingerprint is already in `seen`, recording new ones.
///
/// Sessions are visited in order, so the first occurrence of a repeated session is the one
/// that is kept, whether the earlier copy lives in this text or in a previous flush.
pub fn filter_duplicates(
    text: &str,
    seen: &mut FingerprintSet,
    empty_sessions: EmptySessionPolicy,
) -> FilterOutcome {
    let mut outcome = FilterOutcome {
        text: String::with_capacity(text.len() + SESSION_SEPARATOR.len()),
        ..FilterOutcome::default()
    };
    for session in text.split(SESSION_SEPARATOR) {
        if session.is_empty() && empty_sessions == EmptySessionPolicy::Drop {
            outcome.empty += 1;
            continue;
        }
        if !seen.insert(Fingerprint::of(session)) {
            outcome.duplicates += 1;
            continue;
        }
        outcome.text.push_str(session);
        outcome.text.push_str(SESSION_SEPARATOR);
        outcome.kept += 1;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_matches_known_md5() {
        assert_eq!(
            Fingerprint::of("").to_string(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            Fingerprint::of("hello\nworld"),
            Fingerprint::of(&String::from("hello\nworld"))
        );
        assert_ne!(Fingerprint::of("a"), Fingerprint::of("b"));
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let mut seen = FingerprintSet::new();
        let outcome = filter_duplicates(
            "hello\nworld\n\nother\n\nhello\nworld\n\nlast",
            &mut seen,
            EmptySessionPolicy::Drop,
        );
        assert_eq!(outcome.text, "hello\nworld\n\nother\n\nlast\n\n");
        assert_eq!(outcome.kept, 3);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn carried_set_drops_sessions_from_earlier_flushes() {
        let mut seen = FingerprintSet::new();
        let first = filter_duplicates("a\n\nb", &mut seen, EmptySessionPolicy::Drop);
        assert_eq!(first.text, "a\n\nb\n\n");

        let second = filter_duplicates("b\n\nc\n\na", &mut seen, EmptySessionPolicy::Drop);
        assert_eq!(second.text, "c\n\n");
        assert_eq!(second.duplicates, 2);
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn empty_text_yields_nothing_when_dropping() {
        let mut seen = FingerprintSet::new();
        let outcome = filter_duplicates("", &mut seen, EmptySessionPolicy::Drop);
        assert!(outcome.text.is_empty());
        assert_eq!(outcome.empty, 1);
        assert!(seen.is_empty());
    }

    #[test]
    fn empty_session_is_emitted_once_when_kept() {
        let mut seen = FingerprintSet::new();
        let first = filter_duplicates("", &mut seen, EmptySessionPolicy::Keep);
        assert_eq!(first.text, "\n\n");
        assert!(seen.contains(&Fingerprint::of("")));

        let second = filter_duplicates("", &mut seen, EmptySessionPolicy::Keep);
        assert!(second.text.is_empty());
        assert_eq!(second.duplicates, 1);
    }
}
