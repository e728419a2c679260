//! Shared domain types for FutureBox.
//!
//! The unlock rule, email masking and paging arithmetic live here as plain
//! functions so that the storage and HTTP layers agree on them.

pub mod api;
pub mod models;
pub mod visibility;
