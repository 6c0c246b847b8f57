// src/extractors/section.rs

// --- Imports ---
use crate::utils::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// --- Constants ---
/// Title given to the single section returned when no heading is detected.
pub const FALLBACK_SECTION_TITLE: &str = "Full Text";

/// Default heading heuristic: an optional "N." / "N" numbering, then an
/// uppercase line of 4 to 51 letters or spaces.
pub const DEFAULT_HEADING_PATTERN: &str = r"(?m)^(?:\d+\.?\s+)?([A-Z][A-Z\s]{3,50})$";

// --- Regex Patterns for Heading Matching (Lazy Static) ---
static DEFAULT_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(DEFAULT_HEADING_PATTERN).expect("Failed to compile DEFAULT_HEADING_RE")
});

// --- Data Structures ---
/// A titled span of a document's full text.
///
/// `start_pos` and `end_pos` are character offsets (not bytes) into the text
/// the section was detected in, `[start_pos, end_pos)`. The heading line itself
/// lies outside every span. `content` is the span with surrounding whitespace
/// trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub title: String,
    pub content: String,
    pub start_pos: usize,
    pub end_pos: usize,
}

impl Section {
    /// The single section covering `text` when nothing looks like a heading.
    fn full_text(text: &str) -> Self {
        Self {
            title: FALLBACK_SECTION_TITLE.to_string(),
            content: text.to_string(),
            start_pos: 0,
            end_pos: text.chars().count(),
        }
    }
}

// --- Detection Strategy ---
/// Splits a document's text into sections.
///
/// Implementations must return at least one section for any input, and the
/// sections must be ordered by position.
pub trait SectionDetector: Send + Sync {
    fn detect_sections(&self, text: &str) -> Vec<Section>;
}

/// Regex-driven heading detection.
///
/// Every match of the pattern is a heading; its first capture group (or the
/// whole match when the pattern has no groups) becomes the section title.
/// A section runs from the end of its heading to the start of the next one, or
/// to the end of the text for the last heading.
#[derive(Debug, Clone)]
pub struct HeadingPatternDetector {
    pattern: Regex,
}

impl HeadingPatternDetector {
    pub fn new() -> Self {
        Self { pattern: DEFAULT_HEADING_RE.clone() }
    }

    /// Uses a caller-supplied heading pattern instead of the default one.
    pub fn with_pattern(pattern: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { pattern })
    }
}

impl Default for HeadingPatternDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionDetector for HeadingPatternDetector {
    fn detect_sections(&self, text: &str) -> Vec<Section> {
        // (heading start, heading end, title), byte offsets
        let headings: Vec<(usize, usize, String)> = self
            .pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let title = caps.get(1).unwrap_or(whole).as_str().trim().to_string();
                Some((whole.start(), whole.end(), title))
            })
            .collect();

        if headings.is_empty() {
            tracing::debug!("No headings matched, returning '{}' section", FALLBACK_SECTION_TITLE);
            return vec![Section::full_text(text)];
        }

        let mut offsets = CharOffsets::new(text);
        let mut sections = Vec::with_capacity(headings.len());

        for (i, (_, heading_end, title)) in headings.iter().enumerate() {
            let span_end = headings.get(i + 1).map_or(text.len(), |next| next.0);
            tracing::trace!("Section '{}' spans bytes {}..{}", title, heading_end, span_end);

            sections.push(Section {
                title: title.clone(),
                content: text[*heading_end..span_end].trim().to_string(),
                start_pos: offsets.to_chars(*heading_end),
                end_pos: offsets.to_chars(span_end),
            });
        }

        sections
    }
}

/// Converts increasing byte offsets into character offsets in a single pass.
struct CharOffsets<'a> {
    text: &'a str,
    last_byte: usize,
    last_char: usize,
}

impl<'a> CharOffsets<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, last_byte: 0, last_char: 0 }
    }

    fn to_chars(&mut self, byte: usize) -> usize {
        if byte < self.last_byte {
            // Out-of-order lookup, count from the start.
            return self.text[..byte].chars().count();
        }
        self.last_char += self.text[self.last_byte..byte].chars().count();
        self.last_byte = byte;
        self.last_char
    }
}
