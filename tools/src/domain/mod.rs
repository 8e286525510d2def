//! Agent-facing tools
pub mod entities;

pub use entities::{EntityGetTool, GetEntityArgs};
