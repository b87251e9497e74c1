//! Deadline and freshness contracts attached to read operations
//!
//! A [`SchedulerParameter`] travels with each generated READ as an opaque
//! string (`extra["para"]`) so that deadline-aware storage systems can
//! schedule it. The wire format is the thirteen fields below, comma-joined in
//! this fixed order:
//!
//! ```text
//! tardiness_deadline,staleness_deadline,qos_preference,query_weight,is_installed,
//! issue_time,arrival_time,local_start_time,local_finished_time,
//! estimated_qc_k,estimated_uc_k,actual_qc_k,actual_uc_k
//! ```
//!
//! Parsing is positional and strict: a wrong token count or any token that
//! does not parse as its field's type rejects the whole string.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Marker for timestamps and cost estimates that have not been filled in
pub const UNSET: i64 = -1;

/// `staleness_deadline` value meaning "no freshness constraint"
pub const STALENESS_UNBOUNDED: i64 = i64::MAX;

/// Number of comma-separated tokens in the wire format
pub const WIRE_FIELD_COUNT: usize = 13;

const TOKEN: &str = ",";

const FIELD_NAMES: [&str; WIRE_FIELD_COUNT] = [
    "tardiness_deadline",
    "staleness_deadline",
    "qos_preference",
    "query_weight",
    "is_installed",
    "issue_time",
    "arrival_time",
    "local_start_time",
    "local_finished_time",
    "estimated_qc_k",
    "estimated_uc_k",
    "actual_qc_k",
    "actual_uc_k",
];

/// Penalty capability shared by every scheduling contract
pub trait Penalty {
    /// Amount by which completion overran the timeliness deadline
    fn tardiness(&self) -> f64;

    /// Amount by which completion overran the freshness deadline
    fn staleness(&self) -> f64;

    /// Weighted timeliness penalty
    fn qos_penalty(&self) -> f64;

    /// Weighted freshness penalty
    fn qod_penalty(&self) -> f64;

    fn total_penalty(&self) -> f64 {
        self.qos_penalty() + self.qod_penalty()
    }
}

/// Contract that never accrues any penalty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPenalty;

impl Penalty for NoPenalty {
    fn tardiness(&self) -> f64 {
        0.0
    }

    fn staleness(&self) -> f64 {
        0.0
    }

    fn qos_penalty(&self) -> f64 {
        0.0
    }

    fn qod_penalty(&self) -> f64 {
        0.0
    }
}

/// Per-request tardiness/staleness contract with scheduler bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerParameter {
    // User specification
    pub tardiness_deadline: i64,
    pub staleness_deadline: i64,
    /// Weight of timeliness against freshness, in `[0, 1]`
    pub qos_preference: f64,
    pub query_weight: f64,

    // System behaviour
    pub is_installed: bool,

    // Timestamps
    pub issue_time: i64,
    pub arrival_time: i64,
    pub local_start_time: i64,
    pub local_finished_time: i64,

    // Execution cost estimates
    pub estimated_qc_k: i64,
    pub estimated_uc_k: i64,

    // Observed execution cost
    pub actual_qc_k: i64,
    pub actual_uc_k: i64,
}

impl SchedulerParameter {
    /// Create a contract with the user-specified terms; all bookkeeping fields start unset
    pub fn new(
        tardiness_deadline: i64,
        staleness_deadline: i64,
        qos_preference: f64,
        query_weight: f64,
    ) -> Self {
        Self {
            tardiness_deadline,
            staleness_deadline,
            qos_preference,
            query_weight,
            is_installed: true,
            issue_time: UNSET,
            arrival_time: UNSET,
            local_start_time: UNSET,
            local_finished_time: UNSET,
            estimated_qc_k: UNSET,
            estimated_uc_k: UNSET,
            actual_qc_k: UNSET,
            actual_uc_k: UNSET,
        }
    }

    /// Whether this contract carries a freshness deadline at all
    pub fn has_staleness_deadline(&self) -> bool {
        self.staleness_deadline != STALENESS_UNBOUNDED
    }

    /// Encode as UTF-8 bytes of the wire string
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Decode from UTF-8 bytes of the wire string
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| Error::Parse(format!("QoS payload is not valid UTF-8: {e}")))?;
        s.parse()
    }

    /// Human-readable `name=value,` dump of every field, in wire order
    pub fn field_list(&self) -> String {
        let values = self.wire_tokens();
        FIELD_NAMES
            .iter()
            .zip(values.iter())
            .map(|(name, value)| format!("{name}={value},"))
            .collect()
    }

    fn wire_tokens(&self) -> [String; WIRE_FIELD_COUNT] {
        [
            self.tardiness_deadline.to_string(),
            self.staleness_deadline.to_string(),
            format!("{:?}", self.qos_preference),
            format!("{:?}", self.query_weight),
            self.is_installed.to_string(),
            self.issue_time.to_string(),
            self.arrival_time.to_string(),
            self.local_start_time.to_string(),
            self.local_finished_time.to_string(),
            self.estimated_qc_k.to_string(),
            self.estimated_uc_k.to_string(),
            self.actual_qc_k.to_string(),
            self.actual_uc_k.to_string(),
        ]
    }
}

/// `max(0, finished - deadline)`; unset completion times never overrun
fn overrun(finished: i64, deadline: i64) -> f64 {
    finished.saturating_sub(deadline).max(0) as f64
}

impl Penalty for SchedulerParameter {
    fn tardiness(&self) -> f64 {
        overrun(self.local_finished_time, self.tardiness_deadline)
    }

    fn staleness(&self) -> f64 {
        if !self.has_staleness_deadline() {
            return 0.0;
        }
        overrun(self.local_finished_time, self.staleness_deadline)
    }

    fn qos_penalty(&self) -> f64 {
        self.qos_preference * self.query_weight * self.tardiness()
    }

    fn qod_penalty(&self) -> f64 {
        (1.0 - self.qos_preference) * self.query_weight * self.staleness()
    }
}

impl fmt::Display for SchedulerParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens = self.wire_tokens();
        write!(f, "{}", tokens.join(TOKEN))
    }
}

fn parse_token<T: FromStr>(tokens: &[&str], index: usize) -> Result<T>
where
    T::Err: fmt::Display,
{
    let raw = tokens[index];
    raw.parse::<T>().map_err(|e| {
        Error::Parse(format!("QoS field '{}' has invalid value '{}': {}", FIELD_NAMES[index], raw, e))
    })
}

impl FromStr for SchedulerParameter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tokens: Vec<&str> = s.split(TOKEN).collect();
        if tokens.len() != WIRE_FIELD_COUNT {
            return Err(Error::Parse(format!(
                "QoS string must have {} fields, found {}: '{}'",
                WIRE_FIELD_COUNT,
                tokens.len(),
                s
            )));
        }

        Ok(Self {
            tardiness_deadline: parse_token(&tokens, 0)?,
            staleness_deadline: parse_token(&tokens, 1)?,
            qos_preference: parse_token(&tokens, 2)?,
            query_weight: parse_token(&tokens, 3)?,
            is_installed: parse_token(&tokens, 4)?,
            issue_time: parse_token(&tokens, 5)?,
            arrival_time: parse_token(&tokens, 6)?,
            local_start_time: parse_token(&tokens, 7)?,
            local_finished_time: parse_token(&tokens, 8)?,
            estimated_qc_k: parse_token(&tokens, 9)?,
            estimated_uc_k: parse_token(&tokens, 10)?,
            actual_qc_k: parse_token(&tokens, 11)?,
            actual_uc_k: parse_token(&tokens, 12)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchedulerParameter {
        SchedulerParameter::new(100, 50, 0.7, 2.0)
    }

    #[test]
    fn test_wire_format_layout() {
        let p = SchedulerParameter::new(10, 20, 0.5, 1.0);
        assert_eq!(p.to_string(), "10,20,0.5,1.0,true,-1,-1,-1,-1,-1,-1,-1,-1");
    }

    #[test]
    fn test_round_trip_with_sentinels() {
        let mut p = SchedulerParameter::new(7, STALENESS_UNBOUNDED, 0.3, 4.0);
        p.is_installed = false;
        p.issue_time = 1_700_000_000_000;
        p.local_finished_time = 123;
        p.actual_uc_k = 9;

        let parsed: SchedulerParameter = p.to_string().parse().unwrap();
        assert_eq!(parsed, p);
        assert_eq!(parsed.arrival_time, UNSET);
        assert_eq!(parsed.staleness_deadline, STALENESS_UNBOUNDED);
    }

    #[test]
    fn test_bytes_round_trip() {
        let p = sample();
        assert_eq!(SchedulerParameter::from_bytes(&p.to_bytes()).unwrap(), p);
        assert!(SchedulerParameter::from_bytes(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_token_count() {
        assert!("1,2,0.5".parse::<SchedulerParameter>().is_err());
        let extra = format!("{},0", sample());
        assert!(extra.parse::<SchedulerParameter>().is_err());
        assert!("".parse::<SchedulerParameter>().is_err());
    }

    #[test]
    fn test_parse_rejects_bad_token() {
        let err = "x,20,0.5,1.0,true,-1,-1,-1,-1,-1,-1,-1,-1"
            .parse::<SchedulerParameter>()
            .unwrap_err();
        assert!(err.to_string().contains("tardiness_deadline"));

        assert!("10,20,0.5,1.0,yes,-1,-1,-1,-1,-1,-1,-1,-1".parse::<SchedulerParameter>().is_err());
        assert!("10,20,0.5,1.0,true,-1,-1,-1,-1,-1,-1,-1,".parse::<SchedulerParameter>().is_err());
    }

    #[test]
    fn test_zero_penalty_at_or_before_deadline() {
        let mut p = sample();
        assert_eq!(p.tardiness(), 0.0);
        assert_eq!(p.total_penalty(), 0.0);

        p.local_finished_time = 50;
        assert_eq!(p.tardiness(), 0.0);
        assert_eq!(p.staleness(), 0.0);

        p.local_finished_time = 100;
        assert_eq!(p.tardiness(), 0.0);
        assert_eq!(p.qos_penalty(), 0.0);
    }

    #[test]
    fn test_penalty_monotonic_past_deadline() {
        let mut p = sample();
        let mut last_qos = 0.0;
        let mut last_qod = 0.0;
        for finished in [101, 150, 400] {
            p.local_finished_time = finished;
            assert!(p.qos_penalty() > last_qos);
            assert!(p.qod_penalty() > last_qod);
            last_qos = p.qos_penalty();
            last_qod = p.qod_penalty();
        }
    }

    #[test]
    fn test_penalty_formulas() {
        let mut p = sample();
        p.local_finished_time = 130;

        assert_eq!(p.tardiness(), 30.0);
        assert_eq!(p.staleness(), 80.0);
        assert!((p.qos_penalty() - 0.7 * 2.0 * 30.0).abs() < 1e-9);
        assert!((p.qod_penalty() - 0.3 * 2.0 * 80.0).abs() < 1e-9);
        assert!((p.total_penalty() - (42.0 + 48.0)).abs() < 1e-9);
    }

    #[test]
    fn test_unbounded_staleness_never_penalised() {
        let mut p = SchedulerParameter::new(0, STALENESS_UNBOUNDED, 0.0, 5.0);
        for finished in [UNSET, 0, 1_000, i64::MAX] {
            p.local_finished_time = finished;
            assert_eq!(p.staleness(), 0.0);
            assert_eq!(p.qod_penalty(), 0.0);
        }
    }

    #[test]
    fn test_no_penalty_realization() {
        let p = NoPenalty;
        assert_eq!(p.tardiness(), 0.0);
        assert_eq!(p.staleness(), 0.0);
        assert_eq!(p.total_penalty(), 0.0);
    }

    #[test]
    fn test_field_list() {
        let dump = SchedulerParameter::new(1, 2, 0.5, 3.0).field_list();
        assert!(dump.starts_with("tardiness_deadline=1,staleness_deadline=2,qos_preference=0.5"));
        assert!(dump.ends_with("actual_uc_k=-1,"));
    }
}
