//! Fill-shape predicates and directional ring slicing (pure, no state).
#![forbid(unsafe_code)]

pub mod shape;
pub mod slice;

pub use shape::{FillShape, should_clear, should_clear_xyz};
pub use slice::{
    Facing, LocalColumn, SLICE_COUNT, bounds_for_slice, columns_for_slice, expand_for_outline,
    resolve_facing,
};
