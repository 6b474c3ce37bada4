//! Storage infrastructure: configuration file persistence and session
//! directory layout.
//!
//! The `config` sub-module reads and writes the recorder's TOML settings
//! file from the platform-appropriate directory and supplies defaults on
//! first run.  Keeping file-format concerns here means the application
//! layer never touches TOML directly.

pub mod config;
