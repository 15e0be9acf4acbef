//! Types library for the P2P queue matching engine
//!
//! This library provides all core type definitions shared across the engine
//! and gateway services, ensuring type safety and deterministic behavior.
//!
//! # Modules
//! - `ids`: Unique identifiers (ItemId, MatchId, CustomerId)
//! - `money`: Fixed-point currency amounts (never floating point)
//! - `payment`: Payment methods and detail validation
//! - `item`: Queue item lifecycle types
//! - `match_record`: Match record lifecycle types
//! - `errors`: Error taxonomy

// Public modules
pub mod errors;
pub mod ids;
pub mod item;
pub mod match_record;
pub mod money;
pub mod payment;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::item::*;
    pub use crate::match_record::*;
    pub use crate::money::*;
    pub use crate::payment::*;
}
