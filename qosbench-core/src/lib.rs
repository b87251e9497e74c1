//! qosbench core library
//!
//! Workload generation and deterministic replay for storage benchmarks,
//! including the operation trace format, per-request QoS contracts,
//! per-operation record logs and the worker threading runtime.

pub mod db;
pub mod error;
pub mod export;
pub mod qos;
pub mod recordlog;
pub mod seed;
pub mod threading;
pub mod trace;
pub mod workload;

pub use error::{Error, Result};
