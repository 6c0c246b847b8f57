// src/output/mod.rs
use crate::utils::error::OutputError;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Wrapper written around every command result.
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub source: &'a str,
    pub command: &'a str,
    pub generated_at: String,
    pub data: &'a T,
}

pub struct OutputWriter {
    destination: Option<PathBuf>, // None means stdout
    pretty: bool,
}

impl OutputWriter {
    /// Creates a writer targeting `destination`, or stdout when it is `None`.
    /// Missing parent directories of the destination file are created.
    pub fn new(destination: Option<&Path>, pretty: bool) -> Result<Self, OutputError> {
        if let Some(parent) = destination.and_then(Path::parent) {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        Ok(Self {
            destination: destination.map(Path::to_path_buf),
            pretty,
        })
    }

    /// Serializes `data` inside an envelope naming its source and command.
    pub fn render<T: Serialize>(&self, source: &str, command: &str, data: &T) -> Result<String, OutputError> {
        let envelope = Envelope {
            source,
            command,
            generated_at: chrono::Utc::now().to_rfc3339(),
            data,
        };

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&envelope)?
        } else {
            serde_json::to_string(&envelope)?
        };
        Ok(rendered)
    }

    /// Writes the envelope to the destination file or stdout.
    pub fn write<T: Serialize>(&self, source: &str, command: &str, data: &T) -> Result<(), OutputError> {
        let rendered = self.render(source, command, data)?;

        match &self.destination {
            Some(path) => {
                let mut file = fs::File::create(path)?;
                file.write_all(rendered.as_bytes())?;
                file.write_all(b"\n")?;
                tracing::info!("Saved {} output to {}", command, path.display());
            }
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                handle.write_all(rendered.as_bytes())?;
                handle.write_all(b"\n")?;
            }
        }

        Ok(())
    }
}
