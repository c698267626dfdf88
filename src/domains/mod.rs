pub mod briefcase;
pub mod export;
pub mod imodel;

pub use export::{DataExporter, ExportOptions, QueryJob};
pub use imodel::SqliteImodelDb;
