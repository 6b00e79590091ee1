//! CLI command implementations.

pub mod export;
pub mod lookups;
pub mod master;
pub mod status;
