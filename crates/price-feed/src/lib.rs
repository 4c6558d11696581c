//! Price feed runtime
//!
//! Features:
//! - Pluggable market-data origins behind one async trait
//! - Batched, per-origin concurrent refresh of stale origin nodes
//! - Panic and timeout isolation between origins
//! - Provider facade for reading named models

pub mod origin;
pub mod provider;
pub mod updater;

pub use origin::{Origin, StaticOrigin};
pub use provider::{GraphProvider, Provider};
pub use updater::{UpdateStats, Updater};
