use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::diagnostics::Diagnostics;
use crate::temporal_graph::TemporalEdge;

fn create_writer(path: &Path) -> Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))
}

/// Writes all rows to a `;`-separated file with a header line.
pub fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    log::info!("Writing {} rows to {:?}", rows.len(), path);
    let mut writer = create_writer(path)?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write {:?}", path))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Temporal edge list that is written while runs are still being expanded.
pub struct TemporalEdgeWriter {
    writer: csv::Writer<File>,
    path: std::path::PathBuf,
    rows: usize,
}

impl TemporalEdgeWriter {
    pub fn create(path: &Path) -> Result<Self> {
        log::info!("Streaming temporal edges to {:?}", path);
        Ok(TemporalEdgeWriter {
            writer: create_writer(path)?,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    pub fn write_run(&mut self, edges: &[TemporalEdge]) -> Result<()> {
        for edge in edges {
            self.writer
                .serialize(edge.to_row())
                .with_context(|| format!("Failed to write {:?}", self.path))?;
        }
        self.rows += edges.len();
        Ok(())
    }

    /// Flushes the file and returns the number of rows written.
    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to write {:?}", self.path))?;
        Ok(self.rows)
    }
}

pub fn write_diagnostics(path: &Path, diagnostics: &Diagnostics) -> Result<()> {
    log::info!(
        "Writing {} defects to {:?}",
        diagnostics.defects.len(),
        path
    );
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    file.write_all(serde_json::to_string_pretty(diagnostics)?.as_bytes())
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
