//! Workload configuration
//!
//! Defaults follow the classic core workload: ten 100-byte fields, a 95/5
//! read/update mix, uniform key selection and hashed inserts.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Trace file written in GENERATE mode when no `trace_path` is configured
pub const DEFAULT_TRACE_PATH: &str = "./workload.txt";

/// Key selection distribution for transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum RequestDistribution {
    /// Every inserted key equally likely
    #[default]
    Uniform,
    /// Popular keys scattered across the keyspace
    Zipfian,
    /// Recently inserted keys most likely
    Latest,
}

impl FromStr for RequestDistribution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(RequestDistribution::Uniform),
            "zipfian" => Ok(RequestDistribution::Zipfian),
            "latest" => Ok(RequestDistribution::Latest),
            other => Err(Error::Config(format!("Unknown distribution \"{other}\""))),
        }
    }
}

impl fmt::Display for RequestDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestDistribution::Uniform => write!(f, "uniform"),
            RequestDistribution::Zipfian => write!(f, "zipfian"),
            RequestDistribution::Latest => write!(f, "latest"),
        }
    }
}

/// Scan length distribution over `[1, max_scan_length]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum ScanLengthDistribution {
    #[default]
    Uniform,
    Zipfian,
}

impl FromStr for ScanLengthDistribution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(ScanLengthDistribution::Uniform),
            "zipfian" => Ok(ScanLengthDistribution::Zipfian),
            other => Err(Error::Config(format!(
                "Distribution \"{other}\" not allowed for scan length"
            ))),
        }
    }
}

/// Key layout for inserted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum InsertOrder {
    /// Key numbers are scrambled with FNV before formatting
    #[default]
    Hashed,
    /// Key numbers are used as-is
    Ordered,
}

impl FromStr for InsertOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hashed" => Ok(InsertOrder::Hashed),
            "ordered" => Ok(InsertOrder::Ordered),
            other => Err(Error::Config(format!("Unknown insert order \"{other}\""))),
        }
    }
}

/// Workload engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(default)]
pub struct WorkloadConfig {
    pub table: String,
    pub field_count: u64,
    /// Length in bytes of every generated field value
    pub field_length: usize,
    pub read_all_fields: bool,
    pub write_all_fields: bool,

    pub read_proportion: f64,
    pub update_proportion: f64,
    pub insert_proportion: f64,
    pub scan_proportion: f64,
    pub read_modify_write_proportion: f64,

    /// Records inserted by the load phase
    pub record_count: u64,
    /// Transactions issued by the transaction phase
    pub operation_count: u64,

    pub request_distribution: RequestDistribution,
    pub max_scan_length: u64,
    pub scan_length_distribution: ScanLengthDistribution,
    pub insert_order: InsertOrder,
    /// First key number of the load phase
    pub insert_start: u64,

    /// Replay this trace if it exists; otherwise record the run to it
    pub trace_path: Option<PathBuf>,

    // QoS draw bounds for generated reads
    pub tardiness_bound: u64,
    pub staleness_bound: u64,
    pub low_preference: f64,
    pub high_preference: f64,
    pub low_weight: u64,
    pub high_weight: u64,

    /// Master seed for reproducible key and operation sequences
    pub seed: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            table: "usertable".to_string(),
            field_count: 10,
            field_length: 100,
            read_all_fields: true,
            write_all_fields: false,
            read_proportion: 0.95,
            update_proportion: 0.05,
            insert_proportion: 0.0,
            scan_proportion: 0.0,
            read_modify_write_proportion: 0.0,
            record_count: 0,
            operation_count: 0,
            request_distribution: RequestDistribution::Uniform,
            max_scan_length: 1000,
            scan_length_distribution: ScanLengthDistribution::Uniform,
            insert_order: InsertOrder::Hashed,
            insert_start: 0,
            trace_path: None,
            tardiness_bound: 100,
            staleness_bound: 100,
            low_preference: 0.5,
            high_preference: 0.5,
            low_weight: 1,
            high_weight: 1,
            seed: None,
        }
    }
}

impl WorkloadConfig {
    /// Validate parameters the generators cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.field_count == 0 {
            return Err(Error::Config("field_count must be at least 1".to_string()));
        }
        if self.max_scan_length == 0 {
            return Err(Error::Config("max_scan_length must be at least 1".to_string()));
        }

        let proportions = [
            ("read_proportion", self.read_proportion),
            ("update_proportion", self.update_proportion),
            ("insert_proportion", self.insert_proportion),
            ("scan_proportion", self.scan_proportion),
            ("read_modify_write_proportion", self.read_modify_write_proportion),
        ];
        for (name, value) in proportions {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!("{name} must be a non-negative number")));
            }
        }

        if !(0.0..=1.0).contains(&self.low_preference)
            || !(0.0..=1.0).contains(&self.high_preference)
            || self.low_preference > self.high_preference
        {
            return Err(Error::Config(format!(
                "QoS preference bounds must satisfy 0 <= low <= high <= 1 (got {} and {})",
                self.low_preference, self.high_preference
            )));
        }
        if self.low_weight > self.high_weight {
            return Err(Error::Config(format!(
                "low_weight ({}) must not exceed high_weight ({})",
                self.low_weight, self.high_weight
            )));
        }

        Ok(())
    }

    /// Field names `field0..field{field_count-1}`
    pub fn field_names(&self) -> Vec<String> {
        (0..self.field_count).map(|i| format!("field{i}")).collect()
    }
}
