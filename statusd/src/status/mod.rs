//! Deployment status derivation

pub mod gate;
pub mod reducer;
