use thiserror::Error;

use crate::header::CanonicalField;

/// File-level failures. Any of these rejects the whole file; row-level
/// problems are reported as skipped rows instead.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("The CSV file is empty or has no data rows")]
    EmptyFile,
    #[error("The CSV file is missing required columns: {}", join_fields(.0))]
    MissingColumns(Vec<CanonicalField>),
    #[error("No valid transactions found")]
    NoValidTransactions,
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
