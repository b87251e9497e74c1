//! End-to-end runs through the two-phase driver

use qosbench_cli::config::{ExperimentConfig, OutputConfig, ProfileConfig};
use qosbench_cli::{output, runner};
use qosbench_core::export::{ExportFormat, JsonExporter, TextExporter};
use qosbench_core::workload::{InsertOrder, WorkloadConfig};
use std::fs;
use tempfile::TempDir;

fn profile(dir: &TempDir, threads: usize) -> ProfileConfig {
    ProfileConfig {
        experiment: ExperimentConfig {
            name: "e2e".to_string(),
            description: None,
            threads,
        },
        workload: WorkloadConfig {
            record_count: 200,
            operation_count: 400,
            read_proportion: 0.7,
            update_proportion: 0.2,
            insert_proportion: 0.1,
            insert_order: InsertOrder::Ordered,
            field_length: 12,
            trace_path: Some(dir.path().join("trace.txt")),
            seed: Some(3),
            ..Default::default()
        },
        output: OutputConfig { record_logs: true, ..Default::default() },
    }
}

#[test]
fn test_generate_then_replay() {
    let dir = TempDir::new().unwrap();
    let config = profile(&dir, 4);

    let generated = runner::run(&config).unwrap();
    assert!(!generated.summary.replay);
    assert_eq!(generated.summary.load.operations, 200);
    assert_eq!(generated.summary.load.failures, 0);
    assert_eq!(generated.summary.transactions.operations, 400);
    assert_eq!(generated.db.record_count("usertable"), 200 + generated_inserts(&generated));

    let trace = fs::read_to_string(dir.path().join("trace.txt")).unwrap();
    assert_eq!(trace.lines().count(), 600);

    let replayed = runner::run(&config).unwrap();
    assert!(replayed.summary.replay);
    assert_eq!(replayed.summary.operations(), 600);
    assert_eq!(replayed.summary.failures(), 0);
    assert_eq!(replayed.db.record_count("usertable"), generated.db.record_count("usertable"));

    // the replay must not append to the trace it reads
    assert_eq!(fs::read_to_string(dir.path().join("trace.txt")).unwrap(), trace);

    let gen_logs = generated.record_logs.as_ref().unwrap();
    let replay_logs = replayed.record_logs.as_ref().unwrap();
    for name in ["LOAD", "READ", "UPDATE", "INSERT"] {
        assert_eq!(gen_logs.len(name), replay_logs.len(name), "{name}");
    }
}

fn generated_inserts(outcome: &runner::RunOutcome) -> usize {
    outcome.record_logs.as_ref().map(|logs| logs.len("INSERT")).unwrap_or(0)
}

#[test]
fn test_text_results() {
    let dir = TempDir::new().unwrap();
    let mut config = profile(&dir, 2);
    config.workload.record_count = 5;
    config.workload.operation_count = 0;

    let outcome = runner::run(&config).unwrap();
    let mut exporter = TextExporter::new(Vec::new());
    output::write_results(&outcome, &mut exporter).unwrap();
    let text = String::from_utf8(exporter.into_inner()).unwrap();

    assert!(text.contains("[OVERALL], Operations, 5\n"));
    assert!(text.contains("[OVERALL], Failures, 0\n"));
    assert!(text.contains("[LOAD], size, 5\n"));
    assert_eq!(text.lines().filter(|l| l.starts_with("[LOAD], LOAD\t")).count(), 5);
}

#[test]
fn test_json_results_to_file() {
    let dir = TempDir::new().unwrap();
    let mut config = profile(&dir, 1);
    config.workload.record_count = 3;
    config.workload.operation_count = 3;
    config.output.format = ExportFormat::Json;
    config.output.file = Some(dir.path().join("out/results.jsonl"));

    let outcome = runner::run(&config).unwrap();
    let mut exporter = output::open_exporter(&config.output).unwrap();
    output::write_results(&outcome, exporter.as_mut()).unwrap();
    drop(exporter);

    let content = fs::read_to_string(dir.path().join("out/results.jsonl")).unwrap();
    let first: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(first["category"], "OVERALL");
    assert_eq!(first["name"], "RunTime(ms)");

    let mut check = JsonExporter::new(Vec::new());
    output::write_results(&outcome, &mut check).unwrap();
    assert!(!check.into_inner().is_empty());
}
