//! In-memory caches

pub mod views;
