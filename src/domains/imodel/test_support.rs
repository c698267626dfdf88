use crate::domains::imodel::engine::*;
use crate::errors::{ExportResult, ExporterError};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const FIXTURE_SCHEMA: &[&str] = &[
    "CREATE TABLE elements (id INTEGER PRIMARY KEY, name TEXT, weight REAL, notes TEXT, member_ids TEXT)",
    "INSERT INTO elements VALUES (1, 'Beam', 12.5, NULL, '[\"0x1\",\"0x2\"]')",
    "INSERT INTO elements VALUES (2, 'Column', 7.25, 'load bearing', '[\"0x2\"]')",
    "INSERT INTO elements VALUES (3, 'Sketch', NULL, 'drawing', '[\"0x3\"]')",
    "CREATE TABLE mass_properties (element_id INTEGER PRIMARY KEY, volume REAL, area REAL, length REAL)",
    "INSERT INTO mass_properties VALUES (1, 2.0, 4.0, 8.0)",
    "INSERT INTO mass_properties VALUES (2, 3.0, 6.0, 0.0)",
    "INSERT INTO mass_properties VALUES (3, NULL, 1.5, 2.5)",
];

/// Create a small iModel-like SQLite file under `dir` and return its path.
pub async fn create_fixture_imodel(dir: &Path) -> PathBuf {
    let path = dir.join("fixture.bim");
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("create fixture database");

    for statement in FIXTURE_SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("populate fixture database");
    }
    pool.close().await;
    path
}

/// In-memory cursor over fixed rows.
pub struct MockCursor {
    columns: Vec<String>,
    rows: Vec<Vec<ColumnValue>>,
    position: Option<usize>,
}

impl MockCursor {
    pub fn new(columns: &[&str], rows: Vec<Vec<ColumnValue>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            position: None,
        }
    }
}

#[async_trait]
impl ResultCursor for MockCursor {
    async fn step(&mut self) -> ExportResult<StepResult> {
        let next = self.position.map(|p| p + 1).unwrap_or(0);
        self.position = Some(next);
        if next < self.rows.len() {
            Ok(StepResult::Row)
        } else {
            Ok(StepResult::Done)
        }
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> ExportResult<&str> {
        self.columns
            .get(index)
            .map(String::as_str)
            .ok_or(ExporterError::ColumnOutOfRange { index, count: self.columns.len() })
    }

    fn value(&self, index: usize) -> ExportResult<&ColumnValue> {
        self.position
            .and_then(|p| self.rows.get(p))
            .and_then(|row| row.get(index))
            .ok_or(ExporterError::ColumnOutOfRange { index, count: self.columns.len() })
    }
}

/// Query engine that hands out the same fixed result for any query.
pub struct MockQueryEngine {
    columns: Vec<&'static str>,
    rows: Vec<Vec<ColumnValue>>,
}

impl MockQueryEngine {
    pub fn new(columns: Vec<&'static str>, rows: Vec<Vec<ColumnValue>>) -> Self {
        Self { columns, rows }
    }
}

#[async_trait]
impl QueryEngine for MockQueryEngine {
    async fn prepare<'a>(&'a self, _ecsql: &'a str) -> ExportResult<Box<dyn ResultCursor + 'a>> {
        Ok(Box::new(MockCursor::new(&self.columns, self.rows.clone())))
    }
}

/// Geometry engine serving canned measures and recording every request.
#[derive(Default)]
pub struct MockGeometryEngine {
    measures: HashMap<ElementId, MassPropertiesResponse>,
    calls: AtomicUsize,
    requests: Mutex<Vec<MassPropertiesRequest>>,
    fail: bool,
}

impl MockGeometryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn with_measure(mut self, id: u64, volume: Option<f64>, area: Option<f64>, length: Option<f64>) -> Self {
        self.measures
            .insert(ElementId(id), MassPropertiesResponse { volume, area, length });
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<MassPropertiesRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GeometryEngine for MockGeometryEngine {
    async fn mass_properties(&self, request: &MassPropertiesRequest) -> ExportResult<MassPropertiesResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(ExporterError::Geometry("geometry kernel unavailable".to_string()));
        }

        let mut response = MassPropertiesResponse::default();
        for id in &request.candidates {
            let Some(measure) = self.measures.get(id) else { continue };
            match request.operation {
                MassPropertiesOperation::AccumulateVolumes => {
                    response.volume = sum_option(response.volume, measure.volume)
                }
                MassPropertiesOperation::AccumulateAreas => {
                    response.area = sum_option(response.area, measure.area)
                }
                MassPropertiesOperation::AccumulateLengths => {
                    response.length = sum_option(response.length, measure.length)
                }
            }
        }
        Ok(response)
    }
}

fn sum_option(acc: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (acc, value) {
        (Some(a), Some(v)) => Some(a + v),
        (None, v) => v,
        (a, None) => a,
    }
}
