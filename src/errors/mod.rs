//! Centralized error handling for the Groupie Tracker application
//!
//! # Error Categories
//!
//! - **Source Errors**: a single fetch against the remote API (transport,
//!   timeout, HTTP status, decode)
//! - **Build Errors**: failures that abort a whole snapshot build
//! - **Cache Errors**: reads before any snapshot is published
//! - **Application Errors**: validation and not found
//!
//! # Usage
//!
//! ```rust
//! use groupie_tracker::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::not_found("artist", "42"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
