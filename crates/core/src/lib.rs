//! Core types for the price graph
//!
//! This crate provides the shared data model used by every other crate:
//! - Asset pairs and origin query keys
//! - Values (ticks and plain numbers)
//! - Data points and informational models
//! - Error taxonomy and configuration types

pub mod types;
pub mod value;
pub mod point;
pub mod model;
pub mod config;
pub mod errors;

pub use types::*;
pub use value::*;
pub use point::*;
pub use model::*;
pub use self::config::*;
pub use errors::*;
