use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use catalog_core::error::CrawlError;
use catalog_core::models::ProductRecord;
use catalog_core::traits::Sink;

/// Writes records to local files: CSV for the tabular form, pretty-printed
/// JSON for the document form.
///
/// Parent directories are created as needed and existing files are
/// overwritten. An empty record set writes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSink;

impl FileSink {
    pub fn new() -> Self {
        Self
    }
}

fn ensure_parent(path: &Path) -> Result<(), CrawlError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

impl Sink for FileSink {
    fn write_tabular(&self, records: &[ProductRecord], path: &Path) -> Result<(), CrawlError> {
        if records.is_empty() {
            tracing::warn!(path = %path.display(), "No records to write to CSV");
            return Ok(());
        }
        ensure_parent(path)?;

        let sink_error = |e: csv::Error| {
            CrawlError::Sink(format!("Failed to write CSV to {}: {e}", path.display()))
        };
        let mut writer = csv::Writer::from_path(path).map_err(sink_error)?;
        for record in records {
            writer.serialize(record).map_err(sink_error)?;
        }
        writer.flush()?;

        tracing::info!(count = records.len(), path = %path.display(), "Saved records to CSV");
        Ok(())
    }

    fn write_document(&self, records: &[ProductRecord], path: &Path) -> Result<(), CrawlError> {
        if records.is_empty() {
            tracing::warn!(path = %path.display(), "No records to write to JSON");
            return Ok(());
        }
        ensure_parent(path)?;

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.flush()?;

        tracing::info!(count = records.len(), path = %path.display(), "Saved records to JSON");
        Ok(())
    }
}
