// src/extractors/pdf.rs

// --- Imports ---
use crate::extractors::cleanup::clean_text;
use crate::extractors::section::{HeadingPatternDetector, Section, SectionDetector};
use crate::utils::error::ExtractionError;
use lopdf::{Dictionary, Object};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

// Pages of a Document are joined with a blank line in `full_text`.
const PAGE_SEPARATOR: &str = "\n\n";

// Metadata keys always present in a Document, empty when the PDF lacks them.
const STANDARD_METADATA_KEYS: [&str; 9] = [
    "format",
    "title",
    "author",
    "subject",
    "keywords",
    "creator",
    "producer",
    "creationDate",
    "modDate",
];

// --- Data Structures ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub page_number: u32, // 1-based
    pub text: String,     // Cleaned page text
}

/// A PDF broken down page by page.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub metadata: BTreeMap<String, String>,
    pub total_pages: usize,
    pub pages: Vec<Page>,
    pub full_text: String,
}

// --- Main Extractor Structure ---
/// Turns PDF files into cleaned text, page records and heuristic sections.
///
/// Every call loads the file on its own and drops the parsed document before
/// returning, so one extractor can be shared freely.
pub struct DocumentExtractor {
    detector: Box<dyn SectionDetector>,
}

impl DocumentExtractor {
    pub fn new() -> Self {
        Self { detector: Box::new(HeadingPatternDetector::new()) }
    }

    /// Replaces the heading heuristic used by `extract_sections`.
    pub fn with_detector(detector: impl SectionDetector + 'static) -> Self {
        Self { detector: Box::new(detector) }
    }

    /// Extracts the cleaned text of the whole document, pages in order.
    pub fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        tracing::info!("Extracting text from: {}", path.display());

        let doc = load(path)?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let mut raw = String::new();
        for &page_number in &page_numbers {
            raw.push_str(&page_text(&doc, path, page_number)?);
        }
        drop(doc);

        let text = clean_text(&raw);
        tracing::info!("Extracted {} characters from {} pages", text.chars().count(), page_numbers.len());
        Ok(text)
    }

    /// Extracts per-page text plus the Info dictionary of the document.
    pub fn extract_with_metadata(&self, path: &Path) -> Result<Document, ExtractionError> {
        tracing::info!("Extracting text and metadata from: {}", path.display());

        let doc = load(path)?;
        let page_ids = doc.get_pages();
        // Counted while the document is still loaded.
        let total_pages = page_ids.len();
        let metadata = read_metadata(&doc);

        let mut pages = Vec::with_capacity(total_pages);
        for &page_number in page_ids.keys() {
            let text = clean_text(&page_text(&doc, path, page_number)?);
            tracing::debug!("Page {}: {} characters", page_number, text.chars().count());
            pages.push(Page { page_number, text });
        }
        drop(doc);

        let full_text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);

        Ok(Document { metadata, total_pages, pages, full_text })
    }

    /// Extracts the document text and splits it with the configured detector.
    pub fn extract_sections(&self, path: &Path) -> Result<Vec<Section>, ExtractionError> {
        let text = self.extract_text(path)?;
        let sections = self.detector.detect_sections(&text);
        tracing::info!("Extracted {} sections", sections.len());
        Ok(sections)
    }

    /// Number of pages in the document, or 0 if it cannot be opened.
    pub fn get_page_count(&self, path: &Path) -> usize {
        match load(path) {
            Ok(doc) => doc.get_pages().len(),
            Err(e) => {
                tracing::warn!("Error getting page count, reporting 0: {}", e);
                0
            }
        }
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

// --- Helpers ---
fn load(path: &Path) -> Result<lopdf::Document, ExtractionError> {
    lopdf::Document::load(path).map_err(|source| ExtractionError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn page_text(doc: &lopdf::Document, path: &Path, page_number: u32) -> Result<String, ExtractionError> {
    doc.extract_text(&[page_number]).map_err(|source| ExtractionError::Page {
        path: path.to_path_buf(),
        page: page_number,
        source,
    })
}

/// Collects the string entries of the trailer's Info dictionary.
/// Keys are lower-camel-cased (`CreationDate` -> `creationDate`), and the PDF
/// version is reported under `format`. The standard keys are always present,
/// as empty strings when the document does not set them.
fn read_metadata(doc: &lopdf::Document) -> BTreeMap<String, String> {
    let mut metadata: BTreeMap<String, String> = STANDARD_METADATA_KEYS
        .iter()
        .map(|key| (key.to_string(), String::new()))
        .collect();
    metadata.insert("format".to_string(), format!("PDF {}", doc.version));

    let info = doc
        .trailer
        .get(b"Info")
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_dictionary(*id),
            other => other.as_dict(),
        });

    let info: &Dictionary = match info {
        Ok(dict) => dict,
        Err(_) => {
            tracing::debug!("No Info dictionary in document");
            return metadata;
        }
    };

    for (key, value) in info.iter() {
        if let Ok(bytes) = value.as_str() {
            metadata.insert(metadata_key(key), decode_pdf_string(bytes));
        }
    }

    metadata
}

fn metadata_key(raw: &[u8]) -> String {
    let key = String::from_utf8_lossy(raw);
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Decodes a PDF text string: UTF-16BE when it carries a byte order mark,
/// otherwise treated as (lossy) UTF-8.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    String::from_utf8_lossy(bytes).into_owned()
}
