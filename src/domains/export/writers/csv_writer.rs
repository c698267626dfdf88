use crate::domains::export::types::ExportStats;
use crate::errors::ExportResult;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

/// Append-only writer for one output file.
pub struct CsvFileWriter {
    inner: BufWriter<File>,
    path: PathBuf,
    is_new: bool,
    stats: ExportStats,
    start_time: Instant,
}

impl CsvFileWriter {
    /// Open `path` for appending, creating it when missing.
    ///
    /// Whether the file existed is sampled before opening; only a new file
    /// gets a header.
    pub async fn open_append(path: &Path) -> ExportResult<Self> {
        let is_new = !tokio::fs::try_exists(path).await?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        Ok(Self {
            inner: BufWriter::new(file),
            path: path.to_path_buf(),
            is_new,
            stats: ExportStats::default(),
            start_time: Instant::now(),
        })
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.stats.rows_written
    }

    pub async fn write_header(&mut self, header: &str) -> ExportResult<()> {
        self.write_line(header).await?;
        self.stats.header_written = true;
        Ok(())
    }

    pub async fn write_row(&mut self, row: &str) -> ExportResult<()> {
        self.write_line(row).await?;
        self.stats.rows_written += 1;
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> ExportResult<()> {
        self.inner.write_all(line.as_bytes()).await?;
        self.inner.write_all(b"\n").await?;
        self.stats.bytes_written += line.len() + 1;
        Ok(())
    }

    /// Flush everything to the file and close it.
    pub async fn finish(mut self) -> ExportResult<ExportStats> {
        self.inner.flush().await?;
        self.inner.shutdown().await?;
        self.stats.duration_ms = self.start_time.elapsed().as_millis() as u64;
        Ok(self.stats)
    }
}
