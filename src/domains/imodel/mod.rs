pub mod engine;
pub mod sqlite;

#[cfg(test)]
pub mod test_support;

pub use engine::{
    format_number, ColumnValue, ElementId, GeometryEngine, MassPropertiesOperation,
    MassPropertiesRequest, MassPropertiesResponse, QueryEngine, ResultCursor, StepResult,
};
pub use sqlite::{SqliteImodelDb, DEFAULT_MASS_PROPERTIES_TABLE};
