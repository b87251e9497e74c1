//! Workload generation and replay

pub mod config;
pub mod core_workload;

pub use config::{
    InsertOrder, RequestDistribution, ScanLengthDistribution, WorkloadConfig, DEFAULT_TRACE_PATH,
};
pub use core_workload::CoreWorkload;

// Re-export the samplers the engine is built from
pub use qosbench_common::generators;
