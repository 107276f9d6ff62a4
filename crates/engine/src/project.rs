use serde::Serialize;

use massedit_core::Record;

use crate::adapter::EntityAdapter;
use crate::error::EngineError;

/// Tabular identity projection for the confirmation summary and export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Build the export table for the touched records.
///
/// Pure over its inputs; every row must have the same column count as the
/// header, which is the one shape guarantee the export consumers rely on.
pub fn project<A: EntityAdapter + ?Sized>(
    adapter: &A,
    records: &[Record],
) -> Result<ExportTable, EngineError> {
    let header = adapter.export_header();
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let row = adapter.export_row(record);
        if row.len() != header.len() {
            return Err(EngineError::ExportShape {
                record_id: record.record_id,
                expected: header.len(),
                got: row.len(),
            });
        }
        rows.push(row);
    }
    Ok(ExportTable { header, rows })
}
