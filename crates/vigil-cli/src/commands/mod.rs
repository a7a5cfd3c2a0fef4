//! Command implementations

pub mod export;
pub mod list;
pub mod purge;
pub mod verify;
