pub mod formatter;
pub mod job;
pub mod mass_properties;
pub mod output;
pub mod progress;
pub mod service;
pub mod types;
pub mod writers;

pub use formatter::{format_row, make_header, DELIMITER};
pub use job::run_job;
pub use mass_properties::MassPropertyAggregator;
pub use output::prepare_output_location;
pub use progress::{LogProgress, ProgressObserver, PROGRESS_INTERVAL};
pub use service::DataExporter;
pub use types::{ExportOptions, ExportOptionsPatch, ExportStats, MassPropertySummary, QueryJob, QuerySpec};
pub use writers::CsvFileWriter;
