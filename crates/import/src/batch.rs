use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::categorize::CategoryDetector;
use crate::csv::{CsvImporter, ImportOptions, ImportOutcome};
use crate::error::ImportError;

/// Result of importing one file of a batch.
#[derive(Debug)]
pub struct FileImport {
    pub path: PathBuf,
    /// File name, also written to each transaction's `source`.
    pub source: String,
    pub result: Result<ImportOutcome, ImportError>,
}

pub fn is_csv_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Imports files one after another. Each file is read and fully converted
/// before the next read starts; a failing file is reported and the batch
/// carries on.
pub async fn import_files<P: AsRef<Path>>(
    paths: &[P],
    detector: &CategoryDetector,
    options: &ImportOptions,
) -> Vec<FileImport> {
    let importer = CsvImporter::new();
    let mut results = Vec::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        let source = source_name(path);
        let file_options = ImportOptions {
            source: Some(source.clone()),
            ..options.clone()
        };

        let result = match tokio::fs::read(path).await {
            Ok(bytes) => importer.import(bytes.as_slice(), detector, &file_options),
            Err(e) => Err(ImportError::Io(e)),
        };

        match &result {
            Ok(outcome) => info!(
                file = %path.display(),
                transactions = outcome.transactions.len(),
                "file imported"
            ),
            Err(e) => warn!(file = %path.display(), error = %e, "file rejected"),
        }

        results.push(FileImport {
            path: path.to_path_buf(),
            source,
            result,
        });
    }

    results
}
