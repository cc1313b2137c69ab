pub mod batch;
pub mod categorize;
pub mod csv;
pub mod error;
pub mod header;
pub mod locale;

pub use batch::{import_files, is_csv_path, FileImport};
pub use categorize::CategoryDetector;
pub use self::csv::{import_csv, CsvImporter, ImportOptions, ImportOutcome, SkipReason, SkippedRow};
pub use error::ImportError;
pub use header::{map_header, CanonicalField, HeaderMap};
pub use locale::{parse_amount, parse_date, parse_date_or, parse_date_strict};
