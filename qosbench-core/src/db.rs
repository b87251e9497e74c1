//! Storage interface driven by the workload engine
//!
//! The engine never inspects values returned from storage; it only issues
//! calls. [`MemoryDb`] is an in-process realization used by the CLI and tests.

use crate::trace::FieldSelection;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Field name to value map for one record
pub type Values = HashMap<String, String>;

/// Key of the QoS wire string in a read's extra parameters
pub const QOS_PARAM_KEY: &str = "para";

/// Outcome of a storage call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    Error,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::NotFound => write!(f, "NOT_FOUND"),
            Status::Error => write!(f, "ERROR"),
        }
    }
}

/// A storage backend, one instance per worker
pub trait Db: Send {
    fn insert(&mut self, table: &str, key: &str, values: &Values) -> Status;

    fn update(&mut self, table: &str, key: &str, values: &Values) -> Status;

    /// Read `fields` of `key`; `extra` carries request metadata such as [`QOS_PARAM_KEY`]
    fn read(
        &mut self,
        table: &str,
        key: &str,
        fields: &FieldSelection,
        extra: &Values,
        result: &mut Values,
    ) -> Status;

    fn scan(
        &mut self,
        table: &str,
        start_key: &str,
        record_count: usize,
        fields: &FieldSelection,
        result: &mut Vec<Values>,
    ) -> Status;
}

type Table = BTreeMap<String, Values>;

/// In-memory tables shared by every clone
#[derive(Debug, Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

fn project(values: &Values, fields: &FieldSelection) -> Values {
    match fields {
        FieldSelection::All => values.clone(),
        FieldSelection::Subset(set) => values
            .iter()
            .filter(|(name, _)| set.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
    }
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `table`
    pub fn record_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map(BTreeMap::len).unwrap_or(0)
    }

    /// Copy of one stored record
    pub fn get(&self, table: &str, key: &str) -> Option<Values> {
        self.tables.read().get(table).and_then(|t| t.get(key)).cloned()
    }
}

impl Db for MemoryDb {
    fn insert(&mut self, table: &str, key: &str, values: &Values) -> Status {
        let mut tables = self.tables.write();
        tables.entry(table.to_string()).or_default().insert(key.to_string(), values.clone());
        Status::Ok
    }

    fn update(&mut self, table: &str, key: &str, values: &Values) -> Status {
        let mut tables = self.tables.write();
        match tables.get_mut(table).and_then(|t| t.get_mut(key)) {
            Some(record) => {
                record.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
                Status::Ok
            }
            None => Status::NotFound,
        }
    }

    fn read(
        &mut self,
        table: &str,
        key: &str,
        fields: &FieldSelection,
        _extra: &Values,
        result: &mut Values,
    ) -> Status {
        let tables = self.tables.read();
        match tables.get(table).and_then(|t| t.get(key)) {
            Some(record) => {
                *result = project(record, fields);
                Status::Ok
            }
            None => Status::NotFound,
        }
    }

    fn scan(
        &mut self,
        table: &str,
        start_key: &str,
        record_count: usize,
        fields: &FieldSelection,
        result: &mut Vec<Values>,
    ) -> Status {
        result.clear();
        let tables = self.tables.read();
        let Some(t) = tables.get(table) else {
            return Status::Ok;
        };
        result.extend(
            t.range(start_key.to_string()..)
                .take(record_count)
                .map(|(_, record)| project(record, fields)),
        );
        Status::Ok
    }
}
