//! Mathematical utilities

pub mod ray;

pub use ray::{BlockMarch, Ray};
