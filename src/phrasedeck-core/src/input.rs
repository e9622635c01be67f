//! Input reader for the comma-separated text file.

use std::path::Path;

use crate::error::BatchError;

/// One line of the input file: an ordered sequence of text cells.
///
/// Cells may be blank; blank cells are kept here and skipped later by
/// the assembler, so cell positions always match the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 0-based position of this row in the input file.
    pub index: usize,
    /// Cell contents in source order.
    pub cells: Vec<String>,
}

impl Row {
    pub fn new(index: usize, cells: Vec<String>) -> Self {
        Self { index, cells }
    }

    /// Cells that survive whitespace trimming, with their source
    /// positions, in source order.
    pub fn spoken_cells(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            let trimmed = cell.trim();
            (!trimmed.is_empty()).then_some((i, trimmed))
        })
    }
}

/// Read all rows of a comma-separated input file, preserving file order
/// and field order. No header row is expected and no schema is imposed;
/// records may have any number of fields.
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<Row>, BatchError> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| BatchError::Input(format!("Failed to open '{}': {}", path.display(), e)))?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            BatchError::Input(format!(
                "Failed to parse '{}' at record {}: {}",
                path.display(),
                index + 1,
                e
            ))
        })?;
        rows.push(Row::new(index, record.iter().map(str::to_string).collect()));
    }

    Ok(rows)
}
