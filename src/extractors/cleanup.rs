// src/extractors/cleanup.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;

// --- Regex Patterns (Lazy Static) ---
// A bare integer sitting on its own line, e.g. a page footer "\n12\n".
static PAGE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\d+\n").expect("Failed to compile PAGE_NUMBER_RE")
});

// Any run of whitespace, newlines included.
static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Failed to compile WHITESPACE_RUN_RE")
});

// Ligatures that PDF text layers commonly emit instead of two letters.
const LIGATURES: [(char, &str); 2] = [('\u{FB01}', "fi"), ('\u{FB02}', "fl")];

/// Cleans raw text pulled out of a PDF page or document.
///
/// The result is lossy: page numbers and the original line layout cannot be
/// recovered afterwards.
///
/// 1. Bare integers on their own line are dropped (page-number artifacts).
/// 2. Every whitespace run becomes a single space.
/// 3. The fi/fl ligatures are expanded to ASCII.
/// 4. Leading and trailing whitespace is trimmed.
///
/// Page numbers are removed before the whitespace collapse, because afterwards
/// there are no newlines left for the pattern to anchor on. This deliberately
/// departs from a collapse-first order, which would keep them:
/// `"foo\n12\nbar"` becomes `"foo bar"` here, not `"foo 12 bar"`.
pub fn clean_text(raw: &str) -> String {
    let without_page_numbers = PAGE_NUMBER_RE.replace_all(raw, "\n");
    let collapsed = WHITESPACE_RUN_RE.replace_all(&without_page_numbers, " ");

    let mut cleaned = collapsed.into_owned();
    for (ligature, replacement) in LIGATURES {
        if cleaned.contains(ligature) {
            cleaned = cleaned.replace(ligature, replacement);
        }
    }

    cleaned.trim().to_string()
}
