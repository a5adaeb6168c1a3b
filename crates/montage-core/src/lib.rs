//! Montage Core - Foundation types for the timeline engine
//!
//! This crate provides the fundamental types used throughout Montage:
//! - Exact time representation (RationalTime, TimeRange, Speed)
//! - The error taxonomy shared by every timeline operation

pub mod error;
pub mod time;

pub use error::{ErrorKind, MontageError, Result};
pub use time::{RationalTime, Speed, TimeRange};
