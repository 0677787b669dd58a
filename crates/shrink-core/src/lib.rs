//! Core types and traits for the shrink URL shortener.
//!
//! This crate provides the shared vocabulary used by the code assignment
//! engine, the mapping stores and the admission controller.

pub mod counter;
pub mod error;
pub mod repository;
pub mod shortcode;

pub use counter::{CounterBackend, CounterSnapshot, CounterStore};
pub use error::{CoreError, CounterError, StorageError};
pub use repository::{ConflictKey, InsertOutcome, Repository, UrlRecord};
pub use shortcode::ShortCode;
