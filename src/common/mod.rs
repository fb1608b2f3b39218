//! Common module
//!
//! This module contains shared types, errors, and utility functions used throughout the application.

pub mod error;
pub mod log;
pub mod process;

// Re-export commonly used types and functions
pub use self::error::{Error, Result};
pub use self::log::{init_logger, Trace};
pub use self::process::ErrorBehavior;
