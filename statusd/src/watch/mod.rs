//! Live deployment-record subscriptions

pub mod adapter;
pub mod memory;
pub mod poll;
pub mod source;
