//! qosbench CLI library
//!
//! Exposes the profile configuration and the run driver for testing.

pub mod config;
pub mod output;
pub mod runner;
