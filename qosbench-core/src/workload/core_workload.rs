//! The core workload engine
//!
//! A [`CoreWorkload`] runs in one of two modes, fixed at construction:
//!
//! - **GENERATE**: operations are drawn from the configured distributions
//!   and every READ, UPDATE, INSERT and LOAD is appended to the trace file
//!   before it is sent to storage.
//! - **REPLAY**: a previously written trace is loaded into a queue and each
//!   call pops and reissues the next recorded operation. Keys, field sets
//!   and QoS strings are reused verbatim; field values are freshly generated.
//!
//! The engine is shared by all worker threads through `&self`.

use super::config::{
    InsertOrder, RequestDistribution, ScanLengthDistribution, WorkloadConfig, DEFAULT_TRACE_PATH,
};
use crate::db::{Db, Values, QOS_PARAM_KEY};
use crate::error::Result;
use crate::qos::SchedulerParameter;
use crate::recordlog::RecordLogs;
use crate::seed::{components, derive_optional};
use crate::trace::{io, FieldSelection, OperationKind, OperationTrace, TraceWriter};
use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use qosbench_common::{
    ascii_string, fnv_hash32, CounterGenerator, DiscreteGenerator, NumberGenerator,
    ScrambledZipfianGenerator, SkewedLatestGenerator, UniformGenerator, ZipfianGenerator,
    ZIPFIAN_CONSTANT,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

enum Mode {
    Generate(TraceWriter),
    Replay(ArrayQueue<String>),
}

pub struct CoreWorkload {
    config: WorkloadConfig,
    field_names: Vec<String>,
    mode: Mode,

    key_sequence: CounterGenerator,
    transaction_insert_key_sequence: Arc<CounterGenerator>,
    key_chooser: Box<dyn NumberGenerator>,
    field_chooser: UniformGenerator,
    field_count_chooser: UniformGenerator,
    scan_length: Box<dyn NumberGenerator>,
    operation_chooser: DiscreteGenerator<OperationKind>,
    qos_rng: Mutex<SmallRng>,

    record_logs: Option<Arc<RecordLogs>>,
}

impl CoreWorkload {
    /// Build the engine, selecting REPLAY if the configured trace exists
    pub fn new(config: WorkloadConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed;

        let key_sequence = CounterGenerator::new(config.insert_start);
        let transaction_insert_key_sequence = Arc::new(CounterGenerator::new(config.record_count));

        let key_chooser_seed = derive_optional(seed, components::KEY_CHOOSER);
        let key_chooser: Box<dyn NumberGenerator> = match config.request_distribution {
            RequestDistribution::Uniform => Box::new(UniformGenerator::with_seed(
                0,
                config.record_count.max(1) - 1,
                key_chooser_seed,
            )?),
            RequestDistribution::Zipfian => {
                // size the keyspace ahead for transaction inserts so hot keys stay put
                let expected_new_keys =
                    (config.operation_count as f64 * config.insert_proportion * 2.0) as u64;
                Box::new(ScrambledZipfianGenerator::with_seed(
                    (config.record_count + expected_new_keys).max(1),
                    key_chooser_seed,
                )?)
            }
            RequestDistribution::Latest => Box::new(SkewedLatestGenerator::with_seed(
                Arc::clone(&transaction_insert_key_sequence),
                key_chooser_seed,
            )),
        };

        let scan_seed = derive_optional(seed, components::SCAN_LENGTH);
        let scan_length: Box<dyn NumberGenerator> = match config.scan_length_distribution {
            ScanLengthDistribution::Uniform => {
                Box::new(UniformGenerator::with_seed(1, config.max_scan_length, scan_seed)?)
            }
            ScanLengthDistribution::Zipfian => Box::new(ZipfianGenerator::with_seed(
                1,
                config.max_scan_length,
                ZIPFIAN_CONSTANT,
                scan_seed,
            )?),
        };

        let field_chooser = UniformGenerator::with_seed(
            0,
            config.field_count - 1,
            derive_optional(seed, components::FIELD_CHOOSER),
        )?;
        let field_count_chooser = UniformGenerator::with_seed(
            1,
            config.field_count,
            derive_optional(seed, components::FIELD_COUNT),
        )?;

        let mut operation_chooser =
            DiscreteGenerator::with_seed(derive_optional(seed, components::OPERATION_CHOOSER));
        let mix = [
            (config.read_proportion, OperationKind::Read),
            (config.update_proportion, OperationKind::Update),
            (config.insert_proportion, OperationKind::Insert),
            (config.scan_proportion, OperationKind::Scan),
            (config.read_modify_write_proportion, OperationKind::ReadModifyWrite),
        ];
        for (weight, kind) in mix {
            if weight > 0.0 {
                operation_chooser.add_value(weight, kind);
            }
        }

        let qos_rng = Mutex::new(match derive_optional(seed, components::QOS_DRAW) {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_os_rng(),
        });

        let mode = Self::select_mode(config.trace_path.as_deref());

        Ok(Self {
            field_names: config.field_names(),
            config,
            mode,
            key_sequence,
            transaction_insert_key_sequence,
            key_chooser,
            field_chooser,
            field_count_chooser,
            scan_length,
            operation_chooser,
            qos_rng,
            record_logs: None,
        })
    }

    fn select_mode(trace_path: Option<&Path>) -> Mode {
        match trace_path {
            Some(path) if path.exists() => {
                let queue = match io::read_lines(path) {
                    Ok(queue) => queue,
                    Err(e) => {
                        tracing::error!(
                            "Failed to read trace {}: {}; replaying nothing",
                            path.display(),
                            e
                        );
                        ArrayQueue::new(1)
                    }
                };
                tracing::info!("Replaying {} operations from {}", queue.len(), path.display());
                Mode::Replay(queue)
            }
            Some(path) => {
                tracing::info!("Recording generated operations to {}", path.display());
                Mode::Generate(TraceWriter::new(path))
            }
            None => {
                let path = PathBuf::from(DEFAULT_TRACE_PATH);
                if path.exists() {
                    if let Err(e) = std::fs::remove_file(&path) {
                        tracing::warn!("Failed to remove stale trace {}: {}", path.display(), e);
                    }
                }
                tracing::info!("Recording generated operations to {}", path.display());
                Mode::Generate(TraceWriter::new(path))
            }
        }
    }

    /// Attach an aggregator that receives every issued trace line
    pub fn with_record_logs(mut self, record_logs: Arc<RecordLogs>) -> Self {
        self.record_logs = Some(record_logs);
        self
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    pub fn is_replay(&self) -> bool {
        matches!(self.mode, Mode::Replay(_))
    }

    /// Trace lines not yet replayed; always 0 in GENERATE mode
    pub fn pending_replay(&self) -> usize {
        match &self.mode {
            Mode::Replay(queue) => queue.len(),
            Mode::Generate(_) => 0,
        }
    }

    /// File traces are appended to in GENERATE mode
    pub fn trace_path(&self) -> Option<&Path> {
        match &self.mode {
            Mode::Generate(writer) => Some(writer.path()),
            Mode::Replay(_) => None,
        }
    }

    /// One load-phase insert; true iff storage accepted it
    pub fn do_insert(&self, db: &mut dyn Db) -> bool {
        match &self.mode {
            Mode::Generate(_) => {
                let keynum = self.key_sequence.next_value();
                let key = self.build_key_name(keynum);
                let (fields, values) = self.build_insert_values();

                self.emit(OperationKind::Load, &key, fields, String::new());
                db.insert(&self.config.table, &key, &values).is_ok()
            }
            Mode::Replay(queue) => {
                let Some(line) = queue.pop() else {
                    return true;
                };
                let Some(trace) = Self::decode(&line) else {
                    return false;
                };
                self.record(trace.name(), &line);

                let values = self.build_values(trace.fields());
                db.insert(&self.config.table, trace.key(), &values).is_ok()
            }
        }
    }

    /// One transaction-phase operation
    pub fn do_transaction(&self, db: &mut dyn Db) -> bool {
        match &self.mode {
            Mode::Generate(_) => {
                let Some(kind) = self.operation_chooser.next_value() else {
                    tracing::debug!("No operation has a positive proportion; skipping transaction");
                    return false;
                };
                match kind {
                    OperationKind::Read => self.do_transaction_read(db),
                    OperationKind::Update => self.do_transaction_update(db),
                    OperationKind::Insert | OperationKind::Load => self.do_transaction_insert(db),
                    OperationKind::Scan => self.do_transaction_scan(db),
                    OperationKind::ReadModifyWrite => self.do_transaction_read_modify_write(db),
                }
                true
            }
            Mode::Replay(queue) => {
                let Some(line) = queue.pop() else {
                    return true;
                };
                let Some(trace) = Self::decode(&line) else {
                    return false;
                };

                match trace.kind() {
                    Some(OperationKind::Read) => {
                        self.record(trace.name(), &line);
                        self.replay_read(db, &trace);
                    }
                    Some(OperationKind::Update) => {
                        self.record(trace.name(), &line);
                        self.replay_update(db, &trace);
                    }
                    Some(OperationKind::Insert) | Some(OperationKind::Load) => {
                        self.record(trace.name(), &line);
                        self.replay_insert(db, &trace);
                    }
                    Some(OperationKind::Scan) => {
                        // scans are never traced, so there is nothing to reuse
                        self.do_transaction_scan(db);
                    }
                    Some(OperationKind::ReadModifyWrite) | None => {
                        tracing::debug!(
                            "No replay handler for {}; generating a read-modify-write",
                            trace.name()
                        );
                        self.do_transaction_read_modify_write(db);
                    }
                }
                true
            }
        }
    }

    /// Generated read with a freshly drawn QoS contract
    pub fn do_transaction_read(&self, db: &mut dyn Db) {
        let Some(keynum) = self.next_key_num() else {
            tracing::debug!("No keys inserted yet; skipping read");
            return;
        };
        let key = self.build_key_name(keynum);
        let fields = self.read_field_selection();

        let qos = self.draw_qos().to_string();
        self.emit(OperationKind::Read, &key, fields.clone(), qos.clone());

        let mut extra = Values::new();
        extra.insert(QOS_PARAM_KEY.to_string(), qos);
        let mut result = Values::new();
        db.read(&self.config.table, &key, &fields, &extra, &mut result);
    }

    pub fn do_transaction_update(&self, db: &mut dyn Db) {
        let Some(keynum) = self.next_key_num() else {
            tracing::debug!("No keys inserted yet; skipping update");
            return;
        };
        let key = self.build_key_name(keynum);
        let (fields, values) = self.build_update_values();

        self.emit(OperationKind::Update, &key, fields, String::new());
        db.update(&self.config.table, &key, &values);
    }

    pub fn do_transaction_insert(&self, db: &mut dyn Db) {
        let keynum = self.transaction_insert_key_sequence.next_value();
        let key = self.build_key_name(keynum);
        let (fields, values) = self.build_insert_values();

        self.emit(OperationKind::Insert, &key, fields, String::new());
        db.insert(&self.config.table, &key, &values);
    }

    pub fn do_transaction_scan(&self, db: &mut dyn Db) {
        let Some(keynum) = self.next_key_num() else {
            tracing::debug!("No keys inserted yet; skipping scan");
            return;
        };
        let start_key = self.build_key_name(keynum);
        let len = self.scan_length.next_value() as usize;
        let fields = self.read_field_selection();

        let mut result = Vec::new();
        db.scan(&self.config.table, &start_key, len, &fields, &mut result);
    }

    pub fn do_transaction_read_modify_write(&self, db: &mut dyn Db) {
        let Some(keynum) = self.next_key_num() else {
            tracing::debug!("No keys inserted yet; skipping read-modify-write");
            return;
        };
        let key = self.build_key_name(keynum);
        let fields = self.read_field_selection();
        let (_, values) = self.build_update_values();

        let mut result = Values::new();
        db.read(&self.config.table, &key, &fields, &Values::new(), &mut result);
        db.update(&self.config.table, &key, &values);
    }

    fn replay_read(&self, db: &mut dyn Db, trace: &OperationTrace) {
        let mut extra = Values::new();
        extra.insert(QOS_PARAM_KEY.to_string(), trace.payload().to_string());
        let mut result = Values::new();
        db.read(&self.config.table, trace.key(), trace.fields(), &extra, &mut result);
    }

    fn replay_update(&self, db: &mut dyn Db, trace: &OperationTrace) {
        let values = if self.config.write_all_fields {
            self.build_values(&FieldSelection::All)
        } else {
            self.build_values(trace.fields())
        };
        db.update(&self.config.table, trace.key(), &values);
    }

    fn replay_insert(&self, db: &mut dyn Db, trace: &OperationTrace) {
        let values = self.build_values(trace.fields());
        db.insert(&self.config.table, trace.key(), &values);
    }

    fn decode(line: &str) -> Option<OperationTrace> {
        match line.parse::<OperationTrace>() {
            Ok(trace) => Some(trace),
            Err(e) => {
                tracing::warn!("Skipping malformed trace line {:?}: {}", line, e);
                None
            }
        }
    }

    /// Draw a key number no larger than the last transaction-inserted key
    fn next_key_num(&self) -> Option<u64> {
        let upper = self.transaction_insert_key_sequence.last_value()?;
        loop {
            let keynum = self.key_chooser.next_value();
            if keynum <= upper {
                return Some(keynum);
            }
        }
    }

    fn build_key_name(&self, keynum: u64) -> String {
        let keynum = match self.config.insert_order {
            InsertOrder::Hashed => u64::from(fnv_hash32(keynum as u32)),
            InsertOrder::Ordered => keynum,
        };
        format!("user{keynum}")
    }

    fn random_field_name(&self) -> String {
        format!("field{}", self.field_chooser.next_value())
    }

    fn read_field_selection(&self) -> FieldSelection {
        if self.config.read_all_fields {
            FieldSelection::All
        } else {
            FieldSelection::single(self.random_field_name())
        }
    }

    fn payload(&self) -> String {
        ascii_string(&mut rand::rng(), self.config.field_length)
    }

    /// `field0..field{n-1}` for a random n in `[1, field_count]`
    fn build_insert_values(&self) -> (FieldSelection, Values) {
        let count = self.field_count_chooser.next_value();
        let mut fields = BTreeSet::new();
        let mut values = Values::new();
        for i in 0..count {
            let name = format!("field{i}");
            values.insert(name.clone(), self.payload());
            fields.insert(name);
        }
        (FieldSelection::Subset(fields), values)
    }

    fn build_update_values(&self) -> (FieldSelection, Values) {
        if self.config.write_all_fields {
            (FieldSelection::All, self.build_values(&FieldSelection::All))
        } else {
            let fields = FieldSelection::single(self.random_field_name());
            let values = self.build_values(&fields);
            (fields, values)
        }
    }

    fn build_values(&self, fields: &FieldSelection) -> Values {
        fields
            .resolve(&self.field_names)
            .into_iter()
            .map(|name| (name.to_string(), self.payload()))
            .collect()
    }

    fn draw_qos(&self) -> SchedulerParameter {
        let c = &self.config;
        let low_pref = (c.low_preference * 10.0) as i64;
        let high_pref = (c.high_preference * 10.0) as i64;

        let mut rng = self.qos_rng.lock();
        let tardiness = rng.random_range(0..=c.tardiness_bound);
        let staleness = rng.random_range(0..=c.staleness_bound);
        let preference = rng.random_range(low_pref..=high_pref) as f64 / 10.0;
        let weight = rng.random_range(c.low_weight..=c.high_weight) as f64;

        SchedulerParameter::new(
            i64::try_from(tardiness).unwrap_or(i64::MAX),
            i64::try_from(staleness).unwrap_or(i64::MAX),
            preference,
            weight,
        )
    }

    /// Trace a generated operation, then hand its line to the record logs
    fn emit(&self, kind: OperationKind, key: &str, fields: FieldSelection, payload: String) {
        let Mode::Generate(writer) = &self.mode else {
            return;
        };
        let trace = match OperationTrace::new(kind.as_str(), key, fields, payload) {
            Ok(trace) => trace,
            Err(e) => {
                tracing::warn!("Failed to build {} trace for {}: {}", kind, key, e);
                return;
            }
        };

        let line = trace.to_line();
        if let Err(e) = writer.write_line(&line) {
            tracing::warn!("Failed to append trace to {}: {}", writer.path().display(), e);
        }
        self.record(kind.as_str(), &line);
    }

    fn record(&self, operation: &str, line: &str) {
        if let Some(logs) = &self.record_logs {
            logs.record_log(operation, line);
        }
    }
}
