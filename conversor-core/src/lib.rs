//! Conversor Core - Fundamental types
//!
//! This crate provides the core types used throughout Conversor:
//! - `Number`: Arbitrary precision decimal numbers
//! - `ConvertError`: Failures of catalog lookups and conversions
//! - `ErrorReport`: Structured errors for presentation layers

mod number;
mod error;

pub use number::{Number, NumberError};
pub use error::{ConvertError, ErrorReport, Severity, codes};
