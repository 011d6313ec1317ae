//! HTTP request handlers for the two listeners
//!
//! - [`app`] serves every path on the application listener
//! - [`metrics`] serves `/metrics` on the metrics listener
//!
//! Each listener gets its own state; no state is shared between them.

pub mod app;
pub mod metrics;
