//! # taskhub-core
//!
//! Core crate for the TaskHub realtime gateway. Contains the configuration
//! schema and loader, typed identifiers, and the unified error system.
//!
//! This crate has **no** internal dependencies on other TaskHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
