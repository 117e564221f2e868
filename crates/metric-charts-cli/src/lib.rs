//! # Metric Charts CLI Library
//!
//! Command-line front end for rendering and validating the
//! `metric-scraper` and `metric-pusher` charts

pub mod commands;

pub use commands::*;
