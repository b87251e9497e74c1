//! Measurement sinks
//!
//! Record logs and run summaries are emitted as `(category, name, value)`
//! triples. The value is optional because record-log lines are exported as
//! bare names.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Output format for measurement export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// `[CATEGORY], name, value` lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Sink for measurement triples
pub trait MeasurementsExporter: Send {
    fn write(&mut self, category: &str, name: &str, value: Option<i64>) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Build the exporter for `format` over an arbitrary writer
pub fn exporter_for(
    format: ExportFormat,
    out: Box<dyn Write + Send>,
) -> Box<dyn MeasurementsExporter> {
    match format {
        ExportFormat::Text => Box::new(TextExporter::new(out)),
        ExportFormat::Json => Box::new(JsonExporter::new(out)),
    }
}

pub struct TextExporter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TextExporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> MeasurementsExporter for TextExporter<W> {
    fn write(&mut self, category: &str, name: &str, value: Option<i64>) -> Result<()> {
        match value {
            Some(v) => writeln!(self.out, "[{category}], {name}, {v}")?,
            None => writeln!(self.out, "[{category}], {name}")?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    category: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<i64>,
}

pub struct JsonExporter<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> JsonExporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> MeasurementsExporter for JsonExporter<W> {
    fn write(&mut self, category: &str, name: &str, value: Option<i64>) -> Result<()> {
        let record = JsonRecord { category, name, value };
        let line = serde_json::to_string(&record)
            .map_err(|e| Error::Other(format!("Failed to encode measurement: {e}")))?;
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
