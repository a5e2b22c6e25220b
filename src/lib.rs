//! solardash library
//!
//! The cached API client and everything the dashboard binary is built from,
//! exposed for integration tests.

pub mod api;
pub mod app;
pub mod cache;
pub mod cli;
pub mod data;
pub mod logging;
pub mod refresh;
pub mod ui;
