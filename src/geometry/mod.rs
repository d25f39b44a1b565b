//! Geometry kernel consumed by the obstacle graph

pub mod polygon;

pub use polygon::*;
