//! HTTP request handlers organized by domain

pub mod import;
pub mod reports;
pub mod transactions;

pub use import::*;
pub use reports::*;
pub use transactions::*;
