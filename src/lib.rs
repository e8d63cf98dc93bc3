//! Image caption and CLIP embedding extraction.
//!
//! The `clip2-process` binary wraps [`processor::ImageProcessor`]: one image
//! path in, one JSON document out.

pub mod clip;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod processor;
pub mod runtime;

pub use config::Config;
pub use output::{ImageDescription, UsageError};
pub use processor::{Backend, ImageProcessor};
