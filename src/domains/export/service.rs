use crate::domains::export::formatter::{format_row, make_header, DELIMITER};
use crate::domains::export::mass_properties::MassPropertyAggregator;
use crate::domains::export::output::prepare_output_location;
use crate::domains::export::progress::{ProgressObserver, PROGRESS_INTERVAL};
use crate::domains::export::types::{ExportOptions, ExportOptionsPatch, ExportStats, MassPropertySummary};
use crate::domains::export::writers::CsvFileWriter;
use crate::domains::imodel::{ElementId, GeometryEngine, QueryEngine, ResultCursor, StepResult};
use crate::errors::{ExportResult, ExporterError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs queries and streams their results into `;`-delimited files.
pub struct DataExporter {
    query_engine: Arc<dyn QueryEngine>,
    geometry_engine: Arc<dyn GeometryEngine>,
    progress: Arc<dyn ProgressObserver>,
    output_root: PathBuf,
    output_dir: PathBuf,
}

impl std::fmt::Debug for DataExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataExporter")
            .field("query_engine", &"<QueryEngine>")
            .field("geometry_engine", &"<GeometryEngine>")
            .field("output_root", &self.output_root)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl DataExporter {
    pub fn new(
        query_engine: Arc<dyn QueryEngine>,
        geometry_engine: Arc<dyn GeometryEngine>,
        output_root: impl Into<PathBuf>,
        progress: Arc<dyn ProgressObserver>,
    ) -> Self {
        let output_root = output_root.into();
        Self {
            query_engine,
            geometry_engine,
            progress,
            output_dir: output_root.clone(),
            output_root,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Point the exporter at `<output_root>/<folder>`, resetting that folder.
    pub fn set_folder(&mut self, folder: &str) {
        self.output_dir = prepare_output_location(&self.output_root, folder);
    }

    /// Export `ecsql` into `<output_dir>/<file_name>`.
    pub async fn write_query_results_to_csv(
        &self,
        ecsql: &str,
        file_name: &str,
        options: Option<&ExportOptionsPatch>,
    ) -> ExportResult<ExportStats> {
        let output_path = self.output_dir.join(file_name);
        let options = ExportOptions::resolve(options);
        self.export_query(ecsql, &output_path, &options).await
    }

    /// Run `ecsql` and append its rows to `output_path`.
    ///
    /// The header is written only when the file did not exist before, so
    /// running the same export twice appends a second block of rows. Rows are
    /// handled one at a time; mass properties of a row are complete before
    /// the cursor moves on.
    pub async fn export_query(
        &self,
        ecsql: &str,
        output_path: &Path,
        options: &ExportOptions,
    ) -> ExportResult<ExportStats> {
        // The cursor (and its statement) lives until the end of this call, on every path
        let mut cursor = self.query_engine.prepare(ecsql).await?;
        let mut writer = CsvFileWriter::open_append(output_path).await?;

        match self.write_rows(cursor.as_mut(), &mut writer, options).await {
            Ok(row_count) => {
                self.progress.file_written(row_count, output_path);
                writer.finish().await
            }
            Err(e) => {
                // Whatever was written so far, header included, must reach the file
                if let Err(flush_error) = writer.finish().await {
                    log::error!("Failed to flush {}: {}", output_path.display(), flush_error);
                }
                Err(e)
            }
        }
    }

    async fn write_rows(
        &self,
        cursor: &mut (dyn ResultCursor + '_),
        writer: &mut CsvFileWriter,
        options: &ExportOptions,
    ) -> ExportResult<usize> {
        let column_to_skip = options.skipped_column();

        if writer.is_new() {
            let prefix = if options.calculate_mass_properties {
                MassPropertySummary::HEADER_COLUMNS.iter().map(|c| c.to_string()).collect()
            } else {
                Vec::new()
            };
            let header = make_header(prefix, cursor, column_to_skip)?;
            writer.write_header(&header).await?;
        }

        let aggregator = MassPropertyAggregator::new(self.geometry_engine.as_ref(), self.progress.as_ref());
        let mut row_count = 0usize;

        while cursor.step().await? == StepResult::Row {
            let row = format_row(cursor, column_to_skip)?;

            if options.calculate_mass_properties {
                let ids = read_element_ids(cursor, options)?;
                let summary = aggregator.calculate(&ids).await?;
                let mut fields = summary.fields().to_vec();
                fields.push(row);
                writer.write_row(&fields.join(DELIMITER)).await?;
            } else {
                writer.write_row(&row).await?;
            }

            row_count += 1;
            if row_count % PROGRESS_INTERVAL == 0 {
                self.progress.rows_processed(row_count);
            }
        }

        Ok(row_count)
    }

    /// Mass properties of a group of elements.
    pub async fn calculate_mass_props(&self, ids: &[ElementId]) -> ExportResult<MassPropertySummary> {
        MassPropertyAggregator::new(self.geometry_engine.as_ref(), self.progress.as_ref())
            .calculate(ids)
            .await
    }
}

/// Element ids referenced by the id column of the current row.
fn read_element_ids(cursor: &dyn ResultCursor, options: &ExportOptions) -> ExportResult<Vec<ElementId>> {
    let value = cursor.value(options.id_column)?;

    if options.id_column_is_json_array {
        let text = value
            .as_text()
            .ok_or_else(|| ExporterError::InvalidIdList(value.to_json_field()))?;
        serde_json::from_str(text).map_err(|e| ExporterError::InvalidIdList(format!("{}: {}", text, e)))
    } else {
        Ok(vec![value.as_element_id()?])
    }
}
