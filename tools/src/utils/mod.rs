//! Utility functions shared by the tools

pub mod file;
pub mod sql;
pub mod time;
