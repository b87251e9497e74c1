//! Profile configuration for qosbench
//!
//! A profile is a TOML file describing one benchmark run: the experiment
//! metadata, the workload (see [`WorkloadConfig`]) and where results go.
//! Any value can be overridden on the command line with dotted paths, e.g.
//! `--set workload.record_count=5000`.

use anyhow::{bail, Context, Result};
use qosbench_core::export::ExportFormat;
use qosbench_core::recordlog::{RecordLogConfig, RecordLogKind};
use qosbench_core::workload::WorkloadConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level profile configuration
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ProfileConfig {
    pub experiment: ExperimentConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Experiment metadata
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ExperimentConfig {
    /// Experiment name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Number of client threads for both phases
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_threads() -> usize {
    1
}

/// Result output configuration
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct OutputConfig {
    /// Output format: text, json
    #[serde(default)]
    pub format: ExportFormat,
    /// Output file path (stdout when absent)
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Export per-operation record logs after the summary
    #[serde(default)]
    pub record_logs: bool,
    /// What the record logs retain: perline, count
    #[serde(default)]
    pub record_log_kind: RecordLogKind,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Text,
            file: None,
            record_logs: false,
            record_log_kind: RecordLogKind::PerLine,
        }
    }
}

impl OutputConfig {
    /// Record log configuration, if record logs are enabled
    pub fn record_log_config(&self) -> Option<RecordLogConfig> {
        self.record_logs.then(|| RecordLogConfig { kind: self.record_log_kind })
    }
}

impl ProfileConfig {
    /// Load profile from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ProfileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load profile from TOML file with --set style overrides
    pub fn from_file_with_overrides<P: AsRef<Path>>(path: P, overrides: &[String]) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut value: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        for override_str in overrides {
            let (key, val) = parse_key_value(override_str)
                .with_context(|| format!("Invalid override format: {}", override_str))?;

            set_toml_path(&mut value, &key, &val)
                .with_context(|| format!("Failed to apply override: {}", override_str))?;
        }

        let config: ProfileConfig = value
            .try_into()
            .with_context(|| "Failed to deserialize modified configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.experiment.name.is_empty() {
            bail!("Experiment name cannot be empty");
        }
        if self.experiment.threads == 0 {
            bail!("Experiment threads must be > 0");
        }

        self.workload.validate().context("Invalid workload configuration")?;

        if let Some(file) = &self.output.file {
            if file.as_os_str().is_empty() {
                bail!("Output file path cannot be empty");
            }
        }

        Ok(())
    }
}

/// Parse a "key=value" string into (key, value) tuple
fn parse_key_value(override_str: &str) -> Result<(String, String)> {
    let Some((key, value)) = override_str.split_once('=') else {
        bail!("Invalid override format '{}'. Expected 'key=value'", override_str);
    };
    if key.trim().is_empty() {
        bail!("Override key cannot be empty in '{}'", override_str);
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Set a value in TOML using dot-notation path, creating intermediate tables
fn set_toml_path(root: &mut toml::Value, path: &str, value_str: &str) -> Result<()> {
    let keys: Vec<&str> = path.split('.').filter(|k| !k.is_empty()).collect();
    let Some((last, parents)) = keys.split_last() else {
        bail!("Empty path");
    };

    let mut current = root;
    for key in parents {
        let toml::Value::Table(table) = current else {
            bail!("Cannot navigate through non-table value at key '{}'", key);
        };
        current = table
            .entry(key.to_string())
            .or_insert(toml::Value::Table(Default::default()));
    }

    let toml::Value::Table(table) = current else {
        bail!("Cannot set key '{}' on non-table value", last);
    };
    table.insert(last.to_string(), parse_value(value_str));
    Ok(())
}

/// Parse a string value with type inference
fn parse_value(value_str: &str) -> toml::Value {
    let trimmed = value_str.trim();

    if trimmed == "true" {
        return toml::Value::Boolean(true);
    }
    if trimmed == "false" {
        return toml::Value::Boolean(false);
    }

    if let Ok(int_val) = trimmed.parse::<i64>() {
        return toml::Value::Integer(int_val);
    }

    if let Ok(float_val) = trimmed.parse::<f64>() {
        return toml::Value::Float(float_val);
    }

    // strings, with optional surrounding quotes
    let string_val = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    toml::Value::String(string_val.to_string())
}
