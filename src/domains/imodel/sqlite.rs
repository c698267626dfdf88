use crate::domains::imodel::engine::*;
use crate::errors::{ExportResult, ExporterError};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, QueryBuilder, Row, Sqlite, Statement, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};

/// Table holding precomputed per-element measures.
pub const DEFAULT_MASS_PROPERTIES_TABLE: &str = "mass_properties";

/// Utility function to sanitize SQL identifiers
pub fn sanitize_identifier(identifier: &str) -> String {
    // Only allow alphanumerics and underscores in identifiers
    let safe_id: String = identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if safe_id.is_empty() {
        return "_invalid".to_string();
    }

    // Prevent numeric-only identifiers (not valid in SQL)
    if safe_id.chars().all(|c| c.is_ascii_digit()) {
        return format!("_{}", safe_id);
    }

    safe_id
}

/// iModel file opened through SQLite.
///
/// Serves both as the query engine and as the geometry engine, the latter
/// reading measures from [`DEFAULT_MASS_PROPERTIES_TABLE`] (or a configured
/// table).
pub struct SqliteImodelDb {
    pool: SqlitePool,
    path: PathBuf,
    mass_properties_table: String,
}

impl std::fmt::Debug for SqliteImodelDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteImodelDb")
            .field("path", &self.path)
            .field("mass_properties_table", &self.mass_properties_table)
            .finish()
    }
}

impl SqliteImodelDb {
    /// Open a static snapshot (read-only).
    pub async fn open_snapshot(path: &Path) -> ExportResult<Self> {
        Self::open(path, true).await
    }

    /// Open a downloaded briefcase (read-write).
    pub async fn open_briefcase(path: &Path) -> ExportResult<Self> {
        Self::open(path, false).await
    }

    async fn open(path: &Path, read_only: bool) -> ExportResult<Self> {
        if !path.exists() {
            return Err(ExporterError::ImodelNotFound(path.display().to_string()));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(read_only)
            .create_if_missing(false);

        // The geometry engine queries while a result cursor holds a connection
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        log::debug!("Opened iModel {} (read_only={})", path.display(), read_only);

        Ok(Self {
            pool,
            path: path.to_path_buf(),
            mass_properties_table: DEFAULT_MASS_PROPERTIES_TABLE.to_string(),
        })
    }

    pub fn with_mass_properties_table(mut self, table: &str) -> Self {
        self.mass_properties_table = sanitize_identifier(table);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection of the handle.
    pub async fn close(&self) {
        self.pool.close().await;
        log::debug!("Closed iModel {}", self.path.display());
    }
}

/// Cursor over a streamed SQLite result set.
pub struct SqliteResultCursor<'a> {
    columns: Vec<String>,
    rows: BoxStream<'a, Result<SqliteRow, sqlx::Error>>,
    current: Vec<ColumnValue>,
}

#[async_trait]
impl<'a> ResultCursor for SqliteResultCursor<'a> {
    async fn step(&mut self) -> ExportResult<StepResult> {
        match self.rows.try_next().await? {
            Some(row) => {
                self.current = decode_row(&row)?;
                Ok(StepResult::Row)
            }
            None => {
                self.current.clear();
                Ok(StepResult::Done)
            }
        }
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> ExportResult<&str> {
        self.columns
            .get(index)
            .map(String::as_str)
            .ok_or(ExporterError::ColumnOutOfRange {
                index,
                count: self.columns.len(),
            })
    }

    fn value(&self, index: usize) -> ExportResult<&ColumnValue> {
        self.current.get(index).ok_or(ExporterError::ColumnOutOfRange {
            index,
            count: self.columns.len(),
        })
    }
}

fn decode_row(row: &SqliteRow) -> ExportResult<Vec<ColumnValue>> {
    (0..row.len()).map(|index| decode_column(row, index)).collect()
}

// Decode by the value's storage class, not the declared column type
fn decode_column(row: &SqliteRow, index: usize) -> ExportResult<ColumnValue> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(ColumnValue::Null);
    }
    let type_name = raw.type_info().name().to_string();

    let value = match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => ColumnValue::Integer(row.try_get_unchecked::<i64, _>(index)?),
        "REAL" => ColumnValue::Real(row.try_get_unchecked::<f64, _>(index)?),
        "BLOB" => ColumnValue::Blob(row.try_get_unchecked::<Vec<u8>, _>(index)?),
        _ => ColumnValue::Text(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

#[async_trait]
impl QueryEngine for SqliteImodelDb {
    async fn prepare<'a>(&'a self, ecsql: &'a str) -> ExportResult<Box<dyn ResultCursor + 'a>> {
        // Column names come from the prepared statement so empty results still get a header
        let statement = Executor::prepare(&self.pool, ecsql).await?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        log::trace!("Prepared query with {} columns: {}", columns.len(), ecsql);

        let rows = sqlx::query(ecsql).fetch(&self.pool);

        Ok(Box::new(SqliteResultCursor {
            columns,
            rows,
            current: Vec::new(),
        }))
    }
}

#[async_trait]
impl GeometryEngine for SqliteImodelDb {
    async fn mass_properties(&self, request: &MassPropertiesRequest) -> ExportResult<MassPropertiesResponse> {
        if request.candidates.is_empty() {
            return Ok(MassPropertiesResponse::default());
        }

        let measure = match request.operation {
            MassPropertiesOperation::AccumulateVolumes => "volume",
            MassPropertiesOperation::AccumulateAreas => "area",
            MassPropertiesOperation::AccumulateLengths => "length",
        };

        let ids = request
            .candidates
            .iter()
            .map(|id| i64::try_from(id.value()).map_err(|_| ExporterError::InvalidElementId(id.to_string())))
            .collect::<ExportResult<Vec<i64>>>()?;

        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT CAST(SUM({measure}) AS REAL) FROM {} WHERE element_id IN (",
            self.mass_properties_table
        ));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let row = query
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ExporterError::Geometry(e.to_string()))?;
        let total: Option<f64> = row
            .try_get(0)
            .map_err(|e| ExporterError::Geometry(e.to_string()))?;

        let mut response = MassPropertiesResponse::default();
        match request.operation {
            MassPropertiesOperation::AccumulateVolumes => response.volume = total,
            MassPropertiesOperation::AccumulateAreas => response.area = total,
            MassPropertiesOperation::AccumulateLengths => response.length = total,
        }
        Ok(response)
    }
}
