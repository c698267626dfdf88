//! Line formatting for the `;`-delimited output.
//!
//! Values are written as JSON scalars and joined with `;` without any
//! escaping, so a value that itself contains `;` shifts the columns of its
//! line.

use crate::domains::imodel::ResultCursor;
use crate::errors::ExportResult;

pub const DELIMITER: &str = ";";

/// Format the cursor's current row, leaving out `column_to_skip`.
pub fn format_row(cursor: &dyn ResultCursor, column_to_skip: Option<usize>) -> ExportResult<String> {
    let mut values = Vec::with_capacity(cursor.column_count());
    for index in 0..cursor.column_count() {
        if Some(index) == column_to_skip {
            continue;
        }
        values.push(cursor.value(index)?.to_json_field());
    }
    Ok(values.join(DELIMITER))
}

/// Append the cursor's column names to `header` and join them into the header line.
pub fn make_header(
    mut header: Vec<String>,
    cursor: &dyn ResultCursor,
    column_to_skip: Option<usize>,
) -> ExportResult<String> {
    for index in 0..cursor.column_count() {
        if Some(index) == column_to_skip {
            continue;
        }
        header.push(cursor.column_name(index)?.to_string());
    }
    Ok(header.join(DELIMITER))
}
