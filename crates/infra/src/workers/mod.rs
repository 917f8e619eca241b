//! Background workers.

pub mod snapshot_listener;
