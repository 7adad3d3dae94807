//! Jet Protocol - Core types and constants.
//!
//! Wire constants and the error taxonomy shared by every layer.

mod constants;
mod error;

pub use constants::*;
pub use error::*;
