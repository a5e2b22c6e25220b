//! UI rendering module for solardash
//!
//! Rendering only: everything drawn here is read from [`crate::app::App`].

pub mod dashboard;
pub mod format;
pub mod help_overlay;
pub mod widgets;

pub use dashboard::render as render_dashboard;
pub use help_overlay::render as render_help_overlay;
