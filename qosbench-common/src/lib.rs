//! Common utilities for qosbench
//!
//! This crate provides shared utilities used by multiple qosbench crates:
//! - `generators`: Number generators for key, scan length and operation selection
//! - `hash`: FNV hashing for key scrambling
//! - `payload`: Random ASCII field values

pub mod generators;
pub mod hash;
pub mod payload;

pub use generators::{
    CounterGenerator, DiscreteGenerator, NumberGenerator, ScrambledZipfianGenerator,
    SkewedLatestGenerator, UniformGenerator, ZipfianGenerator, ZIPFIAN_CONSTANT,
};
pub use hash::{fnv_hash32, fnv_hash64};
pub use payload::ascii_string;
