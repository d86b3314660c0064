//! HTTP handlers grouped by resource.

pub mod callbacks;
pub mod health;
pub mod requests;
pub mod tasks;
