// File: output.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026
// - Volker Schwaberow <volker@schwaberow.de>

use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// One finding emitted by an executor.
#[derive(Debug, Clone, Serialize)]
pub struct OutputEntry {
    pub template_id: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matcher_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extracted_results: Vec<String>,
}

impl OutputEntry {
    fn to_text_line(&self) -> String {
        let mut line = format!("[{}]", self.template_id);
        if let Some(name) = &self.matcher_name {
            line.push_str(&format!(" [{}]", name));
        }
        line.push(' ');
        line.push_str(&self.url);
        if !self.extracted_results.is_empty() {
            line.push_str(&format!(" [{}]", self.extracted_results.join(", ")));
        }
        line
    }
}

/// Buffered destination shared by every concurrently running
/// executor. The writer is only ever touched under the lock, and
/// `close` flushes what the buffer still holds.
pub struct OutputWriter {
    inner: Mutex<BufWriter<Box<dyn Write + Send>>>,
    format: OutputFormat,
}

impl OutputWriter {
    pub fn from_writer(writer: Box<dyn Write + Send>, format: OutputFormat) -> Self {
        Self {
            inner: Mutex::new(BufWriter::new(writer)),
            format,
        }
    }

    pub fn stdout(format: OutputFormat) -> Self {
        Self::from_writer(Box::new(io::stdout()), format)
    }

    pub fn to_file<P: AsRef<Path>>(path: P, format: OutputFormat) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(Box::new(file), format))
    }

    pub fn write(&self, entry: &OutputEntry) -> io::Result<()> {
        let line = match self.format {
            OutputFormat::Text => entry.to_text_line(),
            OutputFormat::Json => serde_json::to_string(entry)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
        };
        let mut writer = self.lock()?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn close(&self) -> io::Result<()> {
        self.lock()?.flush()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, BufWriter<Box<dyn Write + Send>>>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "output writer lock poisoned"))
    }
}
