//! Code assignment engine for the shrink URL shortener.
//!
//! [`ShortenerService`] turns URLs into short codes and back. Encoding is
//! idempotent: a URL keeps the code it was first given, even when several
//! requests race to encode it.

pub mod error;
pub mod service;
pub mod shortener;
pub mod validation;

pub use error::{Result, ShortenerError};
pub use service::{ShortenerService, DEFAULT_MAX_ATTEMPTS};
pub use shortener::Shortener;
