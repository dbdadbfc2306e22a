//! Shared types and utilities for the propwatch server and client.

pub mod error;
pub mod filter;
pub mod models;
pub mod protocol;

pub use error::*;
pub use filter::*;
pub use models::*;
pub use protocol::*;
