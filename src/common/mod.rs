//! Common types, traits, and error definitions for poly_nav
//!
//! This module provides the foundational building blocks used across
//! the geometry, spatial index and planning modules.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
