//! Utility modules for poly_nav

pub mod binary_heap;
pub mod fast_remove;
pub mod tracker;

pub use binary_heap::IndexedMinHeap;
pub use fast_remove::FastRemoveVec;
pub use tracker::{Tracker, TrackerStamp};
