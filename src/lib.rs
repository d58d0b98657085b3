//! cssmod - CSS modules transform cache
//!
//! Turns `*.module.css` imports into class-name maps for a bundler,
//! transforming each distinct file content once per process and once per
//! change across builds.

pub mod cache;
pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod pipeline;
pub mod resolve;
pub mod transform;
pub mod ui;

pub use error::{CssModError, CssModResult};
pub use pipeline::{BuildTarget, LoadResult, Pipeline};
