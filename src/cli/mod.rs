// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for running the decoders on images.
//!
//! This module contains the command-line interface logic, including argument parsing
//! and the `detect` / `pose` command implementations.

// Modules
/// CLI arguments.
pub mod args;

/// Detection and pose commands.
pub mod predict;
