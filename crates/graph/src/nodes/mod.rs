//! Node variants
//!
//! - `OriginNode`: cached data from an external source, refreshed by the updater
//! - `MedianNode`, `IndirectNode`: aggregation across sources and hops
//! - `DevCircuitBreakerNode`: flags values that drift from a reference
//! - `AliasNode`, `InvertNode`: tick transforms
//! - `ReferenceNode`, `WrapperNode`: structural forwarding
//! - `ConstantNode`: fixed numbers

mod alias;
mod constant;
mod deviation;
mod indirect;
mod invert;
mod median;
mod origin;
mod reference;
mod wrapper;

pub use alias::AliasNode;
pub use constant::ConstantNode;
pub use deviation::DevCircuitBreakerNode;
pub use indirect::IndirectNode;
pub use invert::InvertNode;
pub use median::MedianNode;
pub use origin::OriginNode;
pub use reference::ReferenceNode;
pub use wrapper::WrapperNode;
