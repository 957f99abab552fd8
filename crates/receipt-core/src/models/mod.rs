//! Data models for receipt extraction.

pub mod config;
pub mod record;

pub use config::ReceiptConfig;
pub use record::{PageNumber, ReceiptRecord};
