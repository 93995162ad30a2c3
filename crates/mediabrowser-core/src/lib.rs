//! Core utilities and types shared across the mediabrowser crates

pub mod problemdetails;
pub mod utils;

pub use problemdetails::Problem;
pub use utils::*;
