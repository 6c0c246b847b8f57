// src/chunking/mod.rs
pub mod chunker;
pub mod config;

// Re-export key chunking types for convenience
#[allow(unused_imports)]
pub use chunker::{Chunk, Chunker, Metadata};
pub use config::ChunkerConfig;
