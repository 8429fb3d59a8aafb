//! Ring positions.
//!
//! Keys and virtual nodes are both hashed to a [`HashToken`]; ownership is
//! decided purely by token order.

pub mod hash128;
pub mod traits;

pub use hash128::HashToken;
pub use traits::Token;
