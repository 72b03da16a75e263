//! waypoint/crates/wp-core/src/lib.rs
//!
//! The central domain types and interface definitions for Waypoint.

pub mod models;
pub mod traits;
pub mod error;
pub mod slug;
pub mod geo;

// Re-exporting for easier access in other crates
pub use models::*;
pub use traits::*;
pub use error::*;
