//! Output decoding and stderr line classification.

use std::borrow::Cow;

use super::profile::CliProfile;

/// Classification of a single stderr line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrLine {
    /// Empty or whitespace-only.
    Blank,
    /// Status notice from the wrapped tool.
    Informational,
    /// Anything else.
    Error,
}

/// Classifies `line` using the profile's predicate.
pub fn classify_line(profile: &dyn CliProfile, line: &str) -> StderrLine {
    if line.trim().is_empty() {
        StderrLine::Blank
    } else if profile.is_informational(line) {
        StderrLine::Informational
    } else {
        StderrLine::Error
    }
}

/// Splits a chunked text stream into complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: String,
}

impl LineBuffer {
    /// Appends `chunk` and returns every line it completed, without terminators.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        let mut lines = Vec::new();
        while let Some(idx) = self.pending.find('\n') {
            let mut line: String = self.pending.drain(..=idx).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// Returns the trailing partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

/// Decodes UTF-8 across read boundaries.
///
/// A multi-byte character split between two reads is held back until it is
/// complete; invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decodes as much of `pending + bytes` as forms complete characters.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());
        let mut consumed = 0;

        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    consumed = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid + len;
                        }
                        None => {
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        out
    }

    /// Flushes any incomplete trailing bytes lossily.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        match String::from_utf8_lossy(&rest) {
            Cow::Borrowed(text) => text.to_string(),
            Cow::Owned(text) => text,
        }
    }
}
