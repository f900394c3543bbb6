//! Background workers

pub mod reconciler;
