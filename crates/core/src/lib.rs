pub mod category;
pub mod money;
pub mod period;
pub mod query;
pub mod summary;
pub mod text;
pub mod transaction;

pub use category::{CategoryDefinition, CategoryDictionary, CategoryError, OTHER_CATEGORY};
pub use money::Money;
pub use period::{DatePreset, DateRange, TimeFrame};
pub use query::{Page, SortOrder, TransactionQuery};
pub use summary::Summary;
pub use transaction::{Transaction, TransactionKey};
