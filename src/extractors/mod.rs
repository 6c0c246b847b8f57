// src/extractors/mod.rs
pub mod cleanup;
pub mod pdf;
pub mod section;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use pdf::{Document, DocumentExtractor, Page};
#[allow(unused_imports)]
pub use section::{HeadingPatternDetector, Section, SectionDetector};
