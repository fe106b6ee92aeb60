//! # Levelgen Tools
//!
//! Command-line front end for the generation pipeline:
//! - RON config loading and built-in presets
//! - ASCII level preview
//! - Parallel batch generation with retry-on-unplayable

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ascii;
pub mod batch;
pub mod config_file;
