pub mod db;
pub mod error;
pub mod local;

pub use db::{
    clear_transactions, create_db, create_memory_db, create_session, create_user,
    delete_session, delete_transactions_by_source, get_session_user, get_transactions,
    get_user_by_id, get_user_by_username, insert_transactions, purge_expired_sessions,
    update_transaction_category, DbPool, User,
};
pub use error::StorageError;
pub use local::{LocalStore, Settings};
