//! Sweep a folder of photos for duplicates, blurry shots and stale files, and
//! pick out pictures of a given face.
//!
//! Each scan lists the folder once (sorted, non-recursive), evaluates every
//! image, classifies it, and returns a report. Deleting or copying flagged
//! files is a separate, best-effort step.

pub mod actions;
pub mod config;
pub mod core;
pub mod error;
pub mod history;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::Sweeper;
pub use report::{Criterion, FaceReport, Outcome, ScanReport, Summary};
