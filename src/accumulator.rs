//! Append-only text buffer tracking the on-disk size of the files fed into it.

use crate::normalize::SeparatorMode;

/// Text accumulated for the next flush together with the input bytes it came from.
///
/// The size counter tracks the on-disk size of the appended files rather than the buffer length,
/// so the flush threshold is measured against input, not output.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    buffer: String,
    input_bytes: u64,
    files: usize,
    mode: SeparatorMode,
}

impl Accumulator {
    /// Creates an empty accumulator joining files according to `mode`.
    #[must_use]
    pub fn new(mode: SeparatorMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Appends the content of one input file whose on-disk size is `size_bytes`.
    pub fn push_file(&mut self, content: &str, size_bytes: u64) {
        if self.files > 0 {
            if let Some(boundary) = self.mode.file_boundary() {
                self.buffer.push_str(boundary);
            }
        }
        self.buffer.push_str(&self.mode.prepare_file(content));
        self.input_bytes = self.input_bytes.saturating_add(size_bytes);
        self.files += 1;
    }

    /// Cumulative on-disk size of the files appended since the last reset.
    #[must_use]
    pub fn input_bytes(&self) -> u64 {
        self.input_bytes
    }

    /// Number of files appended since the last reset.
    #[must_use]
    pub fn files(&self) -> usize {
        self.files
    }

    /// Returns `true` once the accumulated input size strictly exceeds `limit_bytes`.
    #[must_use]
    pub fn exceeds(&self, limit_bytes: u64) -> bool {
        self.input_bytes > limit_bytes
    }

    /// Borrow of the buffered text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Hands out the buffered text and resets the accumulator to empty.
    pub fn take(&mut self) -> String {
        self.input_bytes = 0;
        self.files = 0;
        std::mem::take(&mut self.buffer)
    }
}
