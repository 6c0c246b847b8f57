// src/chunking/chunker.rs

// --- Imports ---
use crate::chunking::config::ChunkerConfig;
use crate::extractors::pdf::Document;
use crate::utils::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

/// Caller-supplied fields merged into every chunk (document id, page, ...).
pub type Metadata = Map<String, Value>;

// --- Constants ---
// Characters searched on each side of `chunk_size` for a separator.
const SEARCH_WINDOW: usize = 100;

// Joins paragraphs accumulated into one chunk.
const PARAGRAPH_JOINER: &str = "\n\n";

// Chunk fields that caller metadata may not overwrite.
const RESERVED_FIELDS: [&str; 4] = ["chunk_id", "text", "char_count", "word_count"];

// --- Regex Patterns (Lazy Static) ---
static PARAGRAPH_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\n+").expect("Failed to compile PARAGRAPH_BREAK_RE")
});

// Sentence-ending punctuation followed by whitespace; the split falls right after the punctuation.
static SENTENCE_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.!?]\s+").expect("Failed to compile SENTENCE_BOUNDARY_RE")
});

// --- Data Structures ---
/// One unit of text ready for embedding.
///
/// Serializes flat: caller metadata appears next to the chunk's own fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub chunk_id: usize,
    pub text: String,
    pub char_count: usize,
    pub word_count: usize,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl Chunk {
    fn new(chunk_id: usize, text: String, metadata: &Metadata) -> Self {
        Self {
            chunk_id,
            char_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
            text,
            metadata: metadata.clone(),
        }
    }
}

/// Paragraphs waiting to be emitted together as one chunk.
#[derive(Debug)]
enum Buffer {
    Empty,
    Accumulating { text: String, chars: usize },
}

impl Buffer {
    /// Adds `paragraph` when buffer length plus paragraph length is within
    /// `limit`; the blank-line joiner is not counted, so a packed chunk may run
    /// two characters past `limit` per join.
    /// Otherwise the buffered text is handed back and `paragraph` starts a new buffer.
    fn push(&mut self, paragraph: &str, limit: usize) -> Option<String> {
        let paragraph_chars = paragraph.chars().count();

        match self {
            Buffer::Accumulating { text, chars }
                if *chars + paragraph_chars <= limit =>
            {
                text.push_str(PARAGRAPH_JOINER);
                text.push_str(paragraph);
                *chars += PARAGRAPH_JOINER.len() + paragraph_chars;
                None
            }
            _ => {
                let fresh = Buffer::Accumulating {
                    text: paragraph.to_string(),
                    chars: paragraph_chars,
                };
                std::mem::replace(self, fresh).into_text()
            }
        }
    }

    fn into_text(self) -> Option<String> {
        match self {
            Buffer::Empty => None,
            Buffer::Accumulating { text, .. } => Some(text),
        }
    }
}

// --- Main Chunker Structure ---
/// Splits text into bounded, overlapping chunks.
///
/// Holds only its configuration, which cannot change after construction.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunks `text` paragraph by paragraph.
    ///
    /// Short paragraphs are packed together (joined by a blank line) up to
    /// `chunk_size` characters. A paragraph longer than `chunk_size` is
    /// force-split on its own and its pieces are emitted in place, so chunk
    /// order follows document order.
    pub fn chunk_text(&self, text: &str, metadata: Option<&Metadata>) -> Vec<Chunk> {
        tracing::info!("Chunking text of length {}", text.chars().count());

        let metadata = sanitize_metadata(metadata);
        let mut chunks = Vec::new();
        self.chunk_into(text, &metadata, &mut chunks);

        tracing::info!("Created {} chunks", chunks.len());
        chunks
    }

    /// Chunks every page of `document` separately, tagging each chunk with its
    /// `page_number`. Chunk ids run on across pages.
    pub fn chunk_document(&self, document: &Document, metadata: Option<&Metadata>) -> Vec<Chunk> {
        tracing::info!("Chunking document with {} pages", document.total_pages);

        let base = sanitize_metadata(metadata);
        let mut chunks = Vec::new();

        for page in &document.pages {
            let mut page_metadata = base.clone();
            page_metadata.insert("page_number".to_string(), Value::from(page.page_number));
            self.chunk_into(&page.text, &page_metadata, &mut chunks);
        }

        tracing::info!("Created {} chunks", chunks.len());
        chunks
    }

    // Appends chunks to `out`; ids continue from `out.len()`.
    fn chunk_into(&self, text: &str, metadata: &Metadata, out: &mut Vec<Chunk>) {
        let limit = self.config.chunk_size;
        let mut buffer = Buffer::Empty;

        for paragraph in PARAGRAPH_BREAK_RE.split(text) {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }

            if paragraph.chars().count() > limit {
                for piece in self.split_long_text(paragraph) {
                    out.push(Chunk::new(out.len(), piece, metadata));
                }
            } else if let Some(flushed) = buffer.push(paragraph, limit) {
                out.push(Chunk::new(out.len(), flushed, metadata));
            }
        }

        if let Some(rest) = buffer.into_text() {
            out.push(Chunk::new(out.len(), rest, metadata));
        }
    }

    /// Force-splits `text` into pieces of roughly `chunk_size` characters.
    ///
    /// Each cut lands just after the last occurrence of the first separator
    /// (in priority order) found within `chunk_size ± 100` characters, or at
    /// exactly `chunk_size` when none is found. The next piece starts
    /// `chunk_overlap` characters before the cut. Pieces are trimmed and empty
    /// pieces dropped.
    pub fn split_long_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut pieces = Vec::new();
        let mut start = 0;

        while chars.len() - start > size {
            let remaining = &chars[start..];
            let split_at = self.find_split(remaining);

            let piece: String = remaining[..split_at].iter().collect();
            let piece = piece.trim();
            if !piece.is_empty() {
                pieces.push(piece.to_string());
            }

            // An overlap reaching back to the previous cut would never advance.
            let rewound = split_at.saturating_sub(overlap);
            start += if rewound == 0 { split_at } else { rewound };
        }

        let tail: String = chars[start..].iter().collect();
        let tail = tail.trim();
        if !tail.is_empty() {
            pieces.push(tail.to_string());
        }

        tracing::debug!("Force-split {} characters into {} pieces", chars.len(), pieces.len());
        pieces
    }

    // Cut position (in characters) for `remaining`, which is longer than chunk_size.
    fn find_split(&self, remaining: &[char]) -> usize {
        let size = self.config.chunk_size;
        let window_start = size.saturating_sub(SEARCH_WINDOW);
        let window_end = (size + SEARCH_WINDOW).min(remaining.len());
        let window: String = remaining[window_start..window_end].iter().collect();

        for separator in &self.config.separators {
            if let Some(byte_idx) = window.rfind(separator.as_str()) {
                let split_at = window_start + window[..byte_idx].chars().count() + separator.chars().count();
                tracing::trace!("Splitting on {:?} at {}", separator, split_at);
                return split_at;
            }
        }

        tracing::trace!("No separator near {}, cutting at raw offset", size);
        size
    }

    /// Groups sentences into batches of `sentences_per_chunk`, joined by spaces.
    ///
    /// A sentence ends at `.`, `!` or `?` followed by whitespace. No size limit
    /// and no overlap. A batch size of 0 is treated as 1.
    pub fn chunk_by_sentences(&self, text: &str, sentences_per_chunk: usize) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let mut sentences = Vec::new();
        let mut last = 0;
        for boundary in SENTENCE_BOUNDARY_RE.find_iter(text) {
            // The punctuation mark is a single ASCII byte.
            sentences.push(&text[last..boundary.start() + 1]);
            last = boundary.end();
        }
        if last < text.len() {
            sentences.push(&text[last..]);
        }

        sentences
            .chunks(sentences_per_chunk.max(1))
            .map(|batch| batch.join(" "))
            .collect()
    }
}

fn sanitize_metadata(metadata: Option<&Metadata>) -> Metadata {
    let mut merged = metadata.cloned().unwrap_or_default();
    for field in RESERVED_FIELDS {
        if merged.remove(field).is_some() {
            tracing::warn!("Ignoring metadata key '{}': it is a chunk field", field);
        }
    }
    merged
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::pdf::Page;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn sized(chunk_size: usize, chunk_overlap: usize) -> ChunkerConfig {
        ChunkerConfig { chunk_size, chunk_overlap, ..ChunkerConfig::default() }
    }

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(sized(size, overlap)).unwrap()
    }

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{:03}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let chunker = Chunker::default();
        assert!(chunker.chunk_text("", None).is_empty());
        assert!(chunker.chunk_text("  \n\n \n\n\t", None).is_empty());
    }

    #[test]
    fn test_single_short_paragraph() {
        let chunks = Chunker::default().chunk_text("\n  Attention is all you need.  \n", None);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[0].text, "Attention is all you need.");
        assert_eq!(chunks[0].char_count, 26);
        assert_eq!(chunks[0].word_count, 5);
    }

    #[test]
    fn test_paragraphs_accumulate_up_to_chunk_size() {
        let chunks = chunker(30, 5).chunk_text("Para one.\n\nPara two.\n\nPara three.", None);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Para one.\n\nPara two.", "Para three."]);
        assert!(chunks.iter().all(|c| c.char_count <= 30));
    }

    #[test]
    fn test_joiner_is_not_counted_when_packing() {
        let chunks = chunker(20, 5).chunk_text("aaaaaaaaa\n\nbbbbbbbbbbb", None);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "aaaaaaaaa\n\nbbbbbbbbbbb");
        assert_eq!(chunks[0].char_count, 22);

        // The running length does include joiners, so a third paragraph is measured against 22.
        let chunks = chunker(20, 5).chunk_text("aaaaaaaaa\n\nbbbbbbbbbbb\n\nc", None);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "c");
    }

    #[test]
    fn test_long_run_without_separators() {
        let text = "A".repeat(600);
        let chunks = Chunker::default().chunk_text(&text, None);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].char_count, 512);
        // Second piece starts 50 characters before the cut at 512.
        assert_eq!(chunks[1].char_count, 600 - 462);
        assert_eq!(chunks[1].chunk_id, 1);
    }

    #[test]
    fn test_oversized_paragraph_is_emitted_in_place() {
        let long = numbered_words(60); // 299 chars
        let text = format!("intro para\n\n{}\n\nclosing para", long);
        let chunks = chunker(100, 10).chunk_text(&text, None);

        let ids: Vec<usize> = chunks.iter().map(|c| c.chunk_id).collect();
        assert_eq!(ids, (0..chunks.len()).collect::<Vec<_>>());

        // The buffered intro is still pending while the long paragraph's
        // pieces go out, so it is emitted after them.
        assert!(chunks[0].text.starts_with("w000"));
        assert_eq!(chunks[chunks.len() - 1].text, "intro para\n\nclosing para");
    }

    #[test]
    fn test_counts_match_text() {
        let text = "Überblick über  Graphen.\n\nZweiter\tAbsatz mit\nZeilenumbruch.\n\n".to_string()
            + &"lorem ipsum dolor sit amet ".repeat(40);
        let chunks = chunker(120, 20).chunk_text(&text, None);

        assert!(chunks.len() > 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_id, i);
            assert_eq!(chunk.char_count, chunk.text.chars().count());
            assert_eq!(chunk.word_count, chunk.text.split_whitespace().count());
        }
    }

    #[test]
    fn test_split_prefers_later_separator_in_window_and_overlaps() {
        let text = numbered_words(100);
        let pieces = chunker(100, 20).split_long_text(&text);

        assert_eq!(pieces.len(), 4);
        for piece in &pieces {
            assert!(piece.chars().count() <= 100 + SEARCH_WINDOW);
        }
        // 20 characters of overlap is four 5-character words.
        for pair in pieces.windows(2) {
            let prev: Vec<&str> = pair[0].split(' ').collect();
            let next: Vec<&str> = pair[1].split(' ').collect();
            assert_eq!(&prev[prev.len() - 4..], &next[..4]);
        }
        assert!(pieces[0].starts_with("w000"));
        assert!(pieces[3].ends_with("w099"));
    }

    #[test]
    fn test_separator_priority() {
        let pieces = chunker(50, 0)
            .split_long_text("Alpha beta gamma delta. Epsilon zeta eta theta iota kappa lambda mu nu xi");
        assert_eq!(pieces, vec!["Alpha beta gamma delta.", "Epsilon zeta eta theta iota kappa lambda mu nu xi"]);

        // A line break beats a later sentence end.
        let pieces = chunker(40, 0)
            .split_long_text("Short first line\nthen a sentence. And more words to go past forty");
        assert_eq!(pieces[0], "Short first line");
    }

    #[test]
    fn test_small_chunk_size_clamps_window() {
        let pieces = chunker(10, 3).split_long_text("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(pieces, vec!["abcdefghij", "hijklmnopq", "opqrstuvwx", "vwxyz"]);
    }

    #[test]
    fn test_text_shorter_than_window() {
        // 130 chars: the window [0, 130) is clipped to the text length.
        let text = format!("{}. {}", "x".repeat(60), "y".repeat(68));
        let pieces = chunker(100, 10).split_long_text(&text);
        assert_eq!(pieces[0], format!("{}.", "x".repeat(60)));
        assert_eq!(pieces.len(), 2);
        assert!(pieces[1].ends_with(&"y".repeat(68)));
    }

    #[test]
    fn test_overlap_past_cut_still_advances() {
        let text = format!("xy. {}", "z".repeat(100));
        let pieces = chunker(60, 50).split_long_text(&text);

        assert_eq!(pieces[0], "xy.");
        assert!(pieces[1..].iter().all(|p| p.chars().all(|c| c == 'z') && p.len() <= 60));
    }

    #[test]
    fn test_metadata_is_merged_and_reserved_keys_dropped() {
        let mut metadata = Metadata::new();
        metadata.insert("doc_id".to_string(), json!("arxiv:1706.03762"));
        metadata.insert("chunk_id".to_string(), json!(99));

        let chunks = chunker(20, 5).chunk_text("first paragraph\n\nsecond paragraph", Some(&metadata));
        assert_eq!(chunks.len(), 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_id, i);
            assert_eq!(chunk.metadata.get("doc_id"), Some(&json!("arxiv:1706.03762")));
            assert!(!chunk.metadata.contains_key("chunk_id"));
        }

        let record = serde_json::to_value(&chunks[1]).unwrap();
        assert_eq!(
            record,
            json!({
                "chunk_id": 1,
                "text": "second paragraph",
                "char_count": 16,
                "word_count": 2,
                "doc_id": "arxiv:1706.03762",
            })
        );
    }

    #[test]
    fn test_chunk_document_tags_pages() {
        let document = Document {
            metadata: BTreeMap::new(),
            total_pages: 2,
            pages: vec![
                Page { page_number: 1, text: "first page text".to_string() },
                Page { page_number: 2, text: "second page text".to_string() },
            ],
            full_text: "first page text\n\nsecond page text".to_string(),
        };
        let mut metadata = Metadata::new();
        metadata.insert("doc_id".to_string(), json!("paper-7"));

        let chunks = Chunker::default().chunk_document(&document, Some(&metadata));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[1].chunk_id, 1);
        assert_eq!(chunks[0].metadata.get("page_number"), Some(&json!(1)));
        assert_eq!(chunks[1].metadata.get("page_number"), Some(&json!(2)));
        assert_eq!(chunks[1].metadata.get("doc_id"), Some(&json!("paper-7")));
        assert_eq!(chunks[1].text, "second page text");
    }

    #[test]
    fn test_chunk_by_sentences() {
        let chunker = Chunker::default();
        let text = "One. Two! Three? Four. Five. Six.";

        assert_eq!(chunker.chunk_by_sentences(text, 5), vec!["One. Two! Three? Four. Five.", "Six."]);
        assert_eq!(chunker.chunk_by_sentences(text, 2), vec!["One. Two!", "Three? Four.", "Five. Six."]);
        assert_eq!(chunker.chunk_by_sentences(text, 0).len(), 6);
        assert_eq!(chunker.chunk_by_sentences("no terminal punctuation", 5), vec!["no terminal punctuation"]);
        assert!(chunker.chunk_by_sentences("   ", 5).is_empty());
    }

    #[test]
    fn test_chunk_by_sentences_drops_trailing_whitespace() {
        let chunker = Chunker::default();
        assert_eq!(chunker.chunk_by_sentences("A. B. ", 5), vec!["A. B."]);
        assert_eq!(chunker.chunk_by_sentences("A. B. \n", 1), vec!["A.", "B."]);
    }

    #[test]
    fn test_chunk_by_sentences_normalizes_boundary_whitespace() {
        let chunks = Chunker::default().chunk_by_sentences("First.\n\nSecond.   Third.", 3);
        assert_eq!(chunks, vec!["First. Second. Third."]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(Chunker::new(sized(10, 10)).is_err());
        assert!(Chunker::new(sized(0, 0)).is_err());
    }
}
