//! Results output

use crate::config::OutputConfig;
use crate::runner::RunOutcome;
use anyhow::{Context, Result};
use qosbench_core::export::{exporter_for, MeasurementsExporter};
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Open the configured sink: the output file, or stdout
pub fn open_exporter(output: &OutputConfig) -> Result<Box<dyn MeasurementsExporter>> {
    let writer: Box<dyn Write + Send> = match &output.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout()),
    };
    Ok(exporter_for(output.format, writer))
}

/// Write the run summary, then the record logs if they were collected
pub fn write_results(outcome: &RunOutcome, exporter: &mut dyn MeasurementsExporter) -> Result<()> {
    let summary = &outcome.summary;

    exporter.write("OVERALL", "RunTime(ms)", Some(summary.runtime.as_millis() as i64))?;
    exporter.write("OVERALL", "Operations", Some(summary.operations() as i64))?;
    exporter.write("OVERALL", "Failures", Some(summary.failures() as i64))?;
    exporter.write("OVERALL", "Replay", Some(i64::from(summary.replay)))?;

    let phases = [("LOAD-PHASE", &summary.load), ("TRANSACTION-PHASE", &summary.transactions)];
    for (category, phase) in phases {
        exporter.write(category, "Operations", Some(phase.operations as i64))?;
        exporter.write(category, "Failures", Some(phase.failures as i64))?;
    }

    if let Some(logs) = &outcome.record_logs {
        logs.export_record_logs(exporter).context("Failed to export record logs")?;
    }

    exporter.flush()?;
    Ok(())
}
