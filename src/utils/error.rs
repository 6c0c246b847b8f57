// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to open PDF {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("Failed to extract text from page {page} of {path}: {source}")]
    Page {
        path: PathBuf,
        page: u32,
        #[source]
        source: lopdf::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("chunk_size must be greater than zero")]
    InvalidChunkSize,

    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },

    #[error("Separators must not contain an empty string")]
    EmptySeparator,

    #[error("Invalid heading pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Output failed: {0}")]
    Output(#[from] OutputError),
}
