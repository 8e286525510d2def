//! # agentkit
//!
//! Leaf utilities consumed by agent tool frameworks:
//!
//! - [`auth`]: resolves Google OAuth / service-account credentials, keeping a
//!   local token cache fresh, and builds authorized REST resource handles.
//! - [`domain::entities`]: translates structured filter conditions into a
//!   predicate and retrieves matching rows from an embedded vector table.
//! - [`utils::time`]: formats calendar datetimes as RFC 3339 in a timezone.

pub mod app;
pub mod auth;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
