use crate::errors::{ExportResult, ExporterError};
use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque handle of one geometry-bearing element in the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

impl ElementId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for ElementId {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed
            .map(ElementId)
            .map_err(|_| ExporterError::InvalidElementId(s.to_string()))
    }
}

impl Serialize for ElementId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

// Ids show up both as hex strings ("0x1b") and as plain integers in id lists.
impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ElementIdVisitor;

        impl<'de> Visitor<'de> for ElementIdVisitor {
            type Value = ElementId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an element id as hex string or unsigned integer")
            }

            fn visit_str<E>(self, value: &str) -> Result<ElementId, E>
            where
                E: de::Error,
            {
                value.parse().map_err(|_| de::Error::invalid_value(de::Unexpected::Str(value), &self))
            }

            fn visit_u64<E>(self, value: u64) -> Result<ElementId, E>
            where
                E: de::Error,
            {
                Ok(ElementId(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<ElementId, E>
            where
                E: de::Error,
            {
                u64::try_from(value)
                    .map(ElementId)
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Signed(value), &self))
            }
        }

        deserializer.deserialize_any(ElementIdVisitor)
    }
}

/// One typed cell of the current result row.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl ColumnValue {
    /// JSON scalar encoding used for CSV fields. Null becomes an empty field.
    pub fn to_json_field(&self) -> String {
        match self {
            ColumnValue::Null => String::new(),
            ColumnValue::Integer(i) => i.to_string(),
            ColumnValue::Real(r) if !r.is_finite() => "null".to_string(),
            ColumnValue::Real(r) => format_number(*r),
            ColumnValue::Text(s) => json_string(s),
            ColumnValue::Blob(bytes) => {
                json_string(&base64::engine::general_purpose::STANDARD.encode(bytes))
            }
        }
    }

    pub fn as_element_id(&self) -> ExportResult<ElementId> {
        match self {
            ColumnValue::Integer(i) => u64::try_from(*i)
                .map(ElementId)
                .map_err(|_| ExporterError::InvalidElementId(i.to_string())),
            ColumnValue::Text(s) => s.parse(),
            other => Err(ExporterError::InvalidElementId(format!("{:?}", other))),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }
}

fn json_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Renders a number the way JavaScript's `Number#toString` does.
///
/// With the shortest round-trip digits `d` and decimal point position `n`
/// (value = 0.d × 10^n), plain decimal layout is used for -6 < n <= 21 and
/// exponent notation with a signed exponent otherwise.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "1.5e-6"
    let scientific = format!("{:e}", value.abs());
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return value.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return value.to_string();
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        format!("{}.{}", &digits[..n as usize], &digits[n as usize..])
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let sign = if n - 1 < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, (n - 1).abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, (n - 1).abs())
        }
    };

    if value < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}

/// Outcome of advancing a result cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Row,
    Done,
}

/// Stateful iterator over the rows of one prepared query.
///
/// The cursor owns the prepared statement; dropping it releases the statement
/// and whatever connection it holds.
#[async_trait]
pub trait ResultCursor: Send {
    /// Advance to the next row.
    async fn step(&mut self) -> ExportResult<StepResult>;

    fn column_count(&self) -> usize;

    /// Access path (column name) of a result column.
    fn column_name(&self, index: usize) -> ExportResult<&str>;

    /// Value of a column in the current row.
    fn value(&self, index: usize) -> ExportResult<&ColumnValue>;
}

/// Compiles queries into result cursors.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn prepare<'a>(&'a self, ecsql: &'a str) -> ExportResult<Box<dyn ResultCursor + 'a>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MassPropertiesOperation {
    AccumulateVolumes,
    AccumulateAreas,
    AccumulateLengths,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MassPropertiesRequest {
    pub operation: MassPropertiesOperation,
    pub candidates: Vec<ElementId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MassPropertiesResponse {
    pub volume: Option<f64>,
    pub area: Option<f64>,
    pub length: Option<f64>,
}

/// Computes geometric mass properties for sets of elements.
#[async_trait]
pub trait GeometryEngine: Send + Sync {
    async fn mass_properties(&self, request: &MassPropertiesRequest) -> ExportResult<MassPropertiesResponse>;
}
