//! Two-phase benchmark driver
//!
//! The load phase issues `record_count` inserts and the transaction phase
//! issues `operation_count` transactions. Each phase splits its operations
//! across the configured threads, and every thread drives its own handle to
//! a shared in-memory store.

use crate::config::ProfileConfig;
use anyhow::{Context, Result};
use qosbench_core::db::MemoryDb;
use qosbench_core::recordlog::RecordLogs;
use qosbench_core::threading::{ThreadingRuntime, WorkerSummary};
use qosbench_core::workload::CoreWorkload;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Which engine call a phase issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Load,
    Transaction,
}

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub replay: bool,
    pub load: WorkerSummary,
    pub transactions: WorkerSummary,
    pub runtime: Duration,
}

impl RunSummary {
    pub fn operations(&self) -> u64 {
        self.load.operations + self.transactions.operations
    }

    pub fn failures(&self) -> u64 {
        self.load.failures + self.transactions.failures
    }
}

/// A finished run plus the record logs it collected, if enabled
pub struct RunOutcome {
    pub summary: RunSummary,
    pub record_logs: Option<Arc<RecordLogs>>,
    pub db: MemoryDb,
}

/// Run both phases of the profile
pub fn run(config: &ProfileConfig) -> Result<RunOutcome> {
    let record_logs = config.output.record_log_config().map(|c| Arc::new(RecordLogs::new(c)));

    let mut workload =
        CoreWorkload::new(config.workload.clone()).context("Failed to create workload")?;
    if let Some(logs) = &record_logs {
        workload = workload.with_record_logs(Arc::clone(logs));
    }
    let workload = Arc::new(workload);
    let replay = workload.is_replay();

    tracing::info!(
        "Experiment '{}': {} threads, mode={}",
        config.experiment.name,
        config.experiment.threads,
        if replay { "replay" } else { "generate" }
    );

    let runtime = ThreadingRuntime::new(config.experiment.threads);
    let db = MemoryDb::new();
    let start = Instant::now();

    let load = run_phase(&runtime, &workload, &db, Phase::Load, config.workload.record_count)?;
    tracing::info!("Load phase: {} inserts, {} failed", load.operations, load.failures);

    let transactions = run_phase(
        &runtime,
        &workload,
        &db,
        Phase::Transaction,
        config.workload.operation_count,
    )?;
    tracing::info!(
        "Transaction phase: {} operations, {} failed",
        transactions.operations,
        transactions.failures
    );

    if replay && workload.pending_replay() > 0 {
        tracing::warn!("{} trace lines were not replayed", workload.pending_replay());
    }

    Ok(RunOutcome {
        summary: RunSummary { replay, load, transactions, runtime: start.elapsed() },
        record_logs,
        db,
    })
}

/// Issue `total` calls of `phase`, split across the runtime's threads
pub fn run_phase(
    runtime: &ThreadingRuntime,
    workload: &Arc<CoreWorkload>,
    db: &MemoryDb,
    phase: Phase,
    total: u64,
) -> Result<WorkerSummary> {
    let shares: Vec<u64> = (0..runtime.num_threads()).map(|t| runtime.share(total, t)).collect();
    let workload = Arc::clone(workload);
    let db = db.clone();

    let results = runtime.run_workers(move |thread_id| {
        let mut db = db.clone();
        let mut summary = WorkerSummary::default();
        for _ in 0..shares[thread_id] {
            let ok = match phase {
                Phase::Load => workload.do_insert(&mut db),
                Phase::Transaction => workload.do_transaction(&mut db),
            };
            summary.operations += 1;
            if !ok {
                summary.failures += 1;
            }
        }
        tracing::debug!("Thread {} finished {:?} phase: {:?}", thread_id, phase, summary);
        Ok(summary)
    })?;

    Ok(WorkerSummary::merge(&results))
}
