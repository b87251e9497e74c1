//! Operation trace records
//!
//! Every operation issued in GENERATE mode is written as one tab-separated
//! line so a later run can reissue the identical sequence:
//!
//! ```text
//! NAME<TAB>KEY<TAB>FIELD1|FIELD2|<TAB>PAYLOAD
//! ```
//!
//! The field segment is pipe-terminated. The token `ALLfields` stands for
//! "every field of the record"; a subset that happens to contain a field
//! named `ALLfields` encodes as `ALLfields|` and is therefore never confused
//! with it. The payload is empty except on READ lines, which carry the QoS
//! wire string.

pub mod io;

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub use io::{append_line, read_lines, TraceWriter};

/// Field-segment token meaning "all fields"
pub const ALL_FIELDS_TOKEN: &str = "ALLfields";

const SEPARATOR: char = '\t';
const FIELD_TERMINATOR: char = '|';

/// Operation types that appear in traces and in the operation mix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    Load,
    Read,
    Update,
    Insert,
    Scan,
    ReadModifyWrite,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Load => "LOAD",
            OperationKind::Read => "READ",
            OperationKind::Update => "UPDATE",
            OperationKind::Insert => "INSERT",
            OperationKind::Scan => "SCAN",
            OperationKind::ReadModifyWrite => "READMODIFYWRITE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LOAD" => Ok(OperationKind::Load),
            "READ" => Ok(OperationKind::Read),
            "UPDATE" => Ok(OperationKind::Update),
            "INSERT" => Ok(OperationKind::Insert),
            "SCAN" => Ok(OperationKind::Scan),
            "READMODIFYWRITE" => Ok(OperationKind::ReadModifyWrite),
            _ => Err(Error::Parse(format!("Unknown operation name: {s}"))),
        }
    }
}

/// Which fields of a record an operation touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    All,
    Subset(BTreeSet<String>),
}

impl FieldSelection {
    /// Selection of exactly one field
    pub fn single(field: impl Into<String>) -> Self {
        FieldSelection::Subset(BTreeSet::from([field.into()]))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, FieldSelection::All)
    }

    /// Concrete field names, expanding `All` against the record's field names
    pub fn resolve<'a>(&'a self, all_fields: &'a [String]) -> Vec<&'a str> {
        match self {
            FieldSelection::All => all_fields.iter().map(String::as_str).collect(),
            FieldSelection::Subset(set) => set.iter().map(String::as_str).collect(),
        }
    }

    fn encode(&self) -> String {
        match self {
            FieldSelection::All => ALL_FIELDS_TOKEN.to_string(),
            FieldSelection::Subset(set) => {
                let mut out = String::new();
                for field in set {
                    out.push_str(field);
                    out.push(FIELD_TERMINATOR);
                }
                out
            }
        }
    }

    fn decode(segment: &str) -> Self {
        if segment == ALL_FIELDS_TOKEN {
            return FieldSelection::All;
        }
        FieldSelection::Subset(
            segment
                .split(FIELD_TERMINATOR)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        FieldSelection::Subset(iter.into_iter().map(Into::into).collect())
    }
}

/// One recorded operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTrace {
    name: String,
    key: String,
    fields: FieldSelection,
    payload: String,
}

fn check_text(what: &str, value: &str) -> Result<()> {
    if value.contains(['\t', '\n', '\r']) {
        return Err(Error::Parse(format!(
            "Trace {what} must not contain tabs or line breaks: {value:?}"
        )));
    }
    Ok(())
}

impl OperationTrace {
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        fields: FieldSelection,
        payload: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let key = key.into();
        let payload = payload.into();

        if name.is_empty() {
            return Err(Error::Parse("Trace name must not be empty".to_string()));
        }
        check_text("name", &name)?;
        check_text("key", &key)?;
        check_text("payload", &payload)?;

        if let FieldSelection::Subset(set) = &fields {
            for field in set {
                check_text("field name", field)?;
                if field.is_empty() || field.contains(FIELD_TERMINATOR) {
                    return Err(Error::Parse(format!("Invalid trace field name: {field:?}")));
                }
            }
        }

        Ok(Self { name, key, fields, payload })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded operation kind, if the name is one of the known kinds
    pub fn kind(&self) -> Option<OperationKind> {
        self.name.parse().ok()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn fields(&self) -> &FieldSelection {
        &self.fields
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Encode as a single trace line, without the trailing newline
    pub fn to_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.name,
            self.key,
            self.fields.encode(),
            self.payload,
            sep = SEPARATOR
        )
    }
}

impl fmt::Display for OperationTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

impl FromStr for OperationTrace {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut parts = line.splitn(4, SEPARATOR);

        let (Some(name), Some(key), Some(fields)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Parse(format!("Malformed trace line: {line:?}")));
        };
        let payload = parts.next().unwrap_or("");

        OperationTrace::new(name, key, FieldSelection::decode(fields), payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_read_line() {
        let trace =
            OperationTrace::new("READ", "user42", FieldSelection::All, "1,2,0.5,1.0").unwrap();
        assert_eq!(trace.to_line(), "READ\tuser42\tALLfields\t1,2,0.5,1.0");
    }

    #[test]
    fn test_encode_subset_is_pipe_terminated() {
        let fields: FieldSelection = ["field1", "field0"].into_iter().collect();
        let trace = OperationTrace::new("UPDATE", "user7", fields, "").unwrap();
        assert_eq!(trace.to_line(), "UPDATE\tuser7\tfield0|field1|\t");
    }

    #[test]
    fn test_round_trip() {
        let cases = vec![
            OperationTrace::new("LOAD", "user1", ["field0", "field3"].into_iter().collect(), "")
                .unwrap(),
            OperationTrace::new("READ", "user2", FieldSelection::single("field9"), "x,y").unwrap(),
            OperationTrace::new("INSERT", "", FieldSelection::Subset(BTreeSet::new()), "").unwrap(),
            OperationTrace::new("READ", "user3", FieldSelection::All, "a b|c").unwrap(),
        ];
        for trace in cases {
            let parsed: OperationTrace = trace.to_line().parse().unwrap();
            assert_eq!(parsed, trace);
        }
    }

    #[test]
    fn test_all_sentinel_distinct_from_field_named_all() {
        let literal = OperationTrace::new(
            "UPDATE",
            "user1",
            FieldSelection::single(ALL_FIELDS_TOKEN),
            "",
        )
        .unwrap();
        assert_eq!(literal.to_line(), "UPDATE\tuser1\tALLfields|\t");

        let parsed: OperationTrace = literal.to_line().parse().unwrap();
        assert!(!parsed.fields().is_all());
        assert_eq!(parsed, literal);

        let all: OperationTrace = "UPDATE\tuser1\tALLfields\t".parse().unwrap();
        assert!(all.fields().is_all());
        assert_ne!(all, literal);
    }

    #[test]
    fn test_empty_subset_distinct_from_all() {
        let empty = OperationTrace::new("READ", "k", FieldSelection::Subset(BTreeSet::new()), "")
            .unwrap();
        let parsed: OperationTrace = empty.to_line().parse().unwrap();
        assert_eq!(parsed.fields(), &FieldSelection::Subset(BTreeSet::new()));
    }

    #[test]
    fn test_parse_without_payload_segment() {
        let trace: OperationTrace = "INSERT\tuser5\tfield0|".parse().unwrap();
        assert_eq!(trace.payload(), "");
        assert_eq!(trace.kind(), Some(OperationKind::Insert));
    }

    #[test]
    fn test_parse_rejects_short_line() {
        assert!("READ\tuser1".parse::<OperationTrace>().is_err());
        assert!("".parse::<OperationTrace>().is_err());
    }

    #[test]
    fn test_new_rejects_separators() {
        assert!(OperationTrace::new("", "k", FieldSelection::All, "").is_err());
        assert!(OperationTrace::new("READ", "a\tb", FieldSelection::All, "").is_err());
        assert!(OperationTrace::new("READ", "k", FieldSelection::All, "p\nq").is_err());
        assert!(OperationTrace::new("READ", "k", FieldSelection::single("a|b"), "").is_err());
        assert!(OperationTrace::new("READ", "k", FieldSelection::single("a\tb"), "").is_err());
    }

    #[test]
    fn test_operation_kind_names() {
        for kind in [
            OperationKind::Load,
            OperationKind::Read,
            OperationKind::Update,
            OperationKind::Insert,
            OperationKind::Scan,
            OperationKind::ReadModifyWrite,
        ] {
            assert_eq!(kind.as_str().parse::<OperationKind>().unwrap(), kind);
        }
        assert!("DELETE".parse::<OperationKind>().is_err());

        let trace = OperationTrace::new("CUSTOM", "k", FieldSelection::All, "").unwrap();
        assert_eq!(trace.kind(), None);
    }

    #[test]
    fn test_resolve_all() {
        let names = vec!["field0".to_string(), "field1".to_string()];
        assert_eq!(FieldSelection::All.resolve(&names), vec!["field0", "field1"]);
        assert_eq!(FieldSelection::single("x").resolve(&names), vec!["x"]);
    }
}
