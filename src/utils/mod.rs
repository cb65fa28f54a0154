//! Utility modules for common functionality.
//!
//! Currently only the diagnostic logging setup.

pub mod logger;
