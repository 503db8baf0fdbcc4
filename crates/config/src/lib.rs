//! Configuration module for the batch encoder
//!
//! Defines the recognized encoding option set and handles loading and
//! saving the per-user defaults file (TOML).

pub mod config;

pub use config::*;
