use crate::domains::imodel::format_number;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Formatting options of one exported query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub calculate_mass_properties: bool,
    pub id_column: usize,
    pub id_column_is_json_array: bool,
    pub drop_id_column_from_result: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            calculate_mass_properties: false,
            id_column: 0,
            id_column_is_json_array: false,
            drop_id_column_from_result: false,
        }
    }
}

impl ExportOptions {
    /// Merge the supplied overrides over the defaults, field by field.
    pub fn resolve(patch: Option<&ExportOptionsPatch>) -> Self {
        let defaults = Self::default();
        let Some(patch) = patch else { return defaults };
        Self {
            calculate_mass_properties: patch
                .calculate_mass_properties
                .unwrap_or(defaults.calculate_mass_properties),
            id_column: patch.id_column.unwrap_or(defaults.id_column),
            id_column_is_json_array: patch
                .id_column_is_json_array
                .unwrap_or(defaults.id_column_is_json_array),
            drop_id_column_from_result: patch
                .drop_id_column_from_result
                .unwrap_or(defaults.drop_id_column_from_result),
        }
    }

    /// Column left out of header and rows, if any.
    pub fn skipped_column(&self) -> Option<usize> {
        self.drop_id_column_from_result.then_some(self.id_column)
    }
}

/// Partially specified options as found in a job description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptionsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculate_mass_properties: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_column_is_json_array: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_id_column_from_result: Option<bool>,
}

/// Aggregated mass properties of one group of elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MassPropertySummary {
    pub total_count: usize,
    pub volume: f64,
    pub volume_count: usize,
    pub area: f64,
    pub area_count: usize,
    pub length: f64,
    pub length_count: usize,
}

impl MassPropertySummary {
    /// Header names of the synthetic columns, in field order.
    pub const HEADER_COLUMNS: [&'static str; 7] = [
        "total_count",
        "volume",
        "volume_count",
        "area",
        "area_count",
        "length",
        "length_count",
    ];

    pub fn new(total_count: usize) -> Self {
        Self {
            total_count,
            ..Self::default()
        }
    }

    pub fn fields(&self) -> [String; 7] {
        [
            self.total_count.to_string(),
            format_number(self.volume),
            self.volume_count.to_string(),
            format_number(self.area),
            self.area_count.to_string(),
            format_number(self.length),
            self.length_count.to_string(),
        ]
    }
}

impl fmt::Display for MassPropertySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Export statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportStats {
    pub rows_written: usize,
    pub bytes_written: usize,
    pub duration_ms: u64,
    pub header_written: bool,
}

/// One named query of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ExportOptionsPatch>,
}

impl QuerySpec {
    /// `<store>.csv`, falling back to the query key.
    pub fn output_file_name(&self, key: &str) -> String {
        format!("{}.csv", self.store.as_deref().unwrap_or(key))
    }
}

/// Job description: an output folder plus named queries in document order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryJob {
    pub folder: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(deserialize_with = "deserialize_ordered_queries")]
    pub queries: Vec<(String, QuerySpec)>,
}

// Queries run in the order they are written, so keep map order
fn deserialize_ordered_queries<'de, D>(deserializer: D) -> Result<Vec<(String, QuerySpec)>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{MapAccess, Visitor};

    struct OrderedQueriesVisitor;

    impl<'de> Visitor<'de> for OrderedQueriesVisitor {
        type Value = Vec<(String, QuerySpec)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of query names to query specifications")
        }

        fn visit_map<V>(self, mut map: V) -> Result<Self::Value, V::Error>
        where
            V: MapAccess<'de>,
        {
            let mut queries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, spec)) = map.next_entry::<String, QuerySpec>()? {
                queries.push((key, spec));
            }
            Ok(queries)
        }
    }

    deserializer.deserialize_map(OrderedQueriesVisitor)
}
