//! Utility modules for the console.
//!
//! # Available Utilities
//!
//! - [`bytes`] - Human-readable byte sizes and transfer rates
//! - [`number`] - Locale-aware number formatting

pub mod bytes;
pub mod number;
