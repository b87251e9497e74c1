//! Number generators for workload generation
//!
//! Provides the samplers the workload engine draws from:
//! - Key selection (uniform, scrambled zipfian, skewed latest)
//! - Key sequences (counter)
//! - Scan lengths (uniform, zipfian)
//! - Operation mix (discrete weighted choice)
//!
//! Generators are shared by every worker thread, so all of them take `&self`.
//! Counters are lock-free; random generators keep their RNG behind a short
//! `parking_lot::Mutex` that is released before `next_value` returns.

use crate::hash::fnv_hash64;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Zipf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default skew used by all zipfian generators (YCSB constant)
pub const ZIPFIAN_CONSTANT: f64 = 0.99;

/// Keyspace the scrambled zipfian samples from before folding into the item count
pub const SCRAMBLED_ITEM_COUNT: u64 = 10_000_000_000;

/// Trait for integer generators shared between worker threads
pub trait NumberGenerator: Send + Sync {
    /// Draw the next value
    fn next_value(&self) -> u64;

    /// The most recently produced value, if any
    fn last_value(&self) -> Option<u64>;

    /// Generator name for logging
    fn name(&self) -> &'static str;
}

fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => SmallRng::from_os_rng(),
    }
}

/// RNG plus the last value it produced
#[derive(Debug)]
struct SamplerState {
    rng: SmallRng,
    last: Option<u64>,
}

impl SamplerState {
    fn new(seed: Option<u64>) -> Mutex<Self> {
        Mutex::new(Self { rng: make_rng(seed), last: None })
    }
}

/// Monotonic counter (insert key sequences)
#[derive(Debug)]
pub struct CounterGenerator {
    counter: AtomicU64,
}

impl CounterGenerator {
    /// Create a counter whose first value is `start`
    pub fn new(start: u64) -> Self {
        Self { counter: AtomicU64::new(start) }
    }
}

impl NumberGenerator for CounterGenerator {
    fn next_value(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }

    fn last_value(&self) -> Option<u64> {
        self.counter.load(Ordering::SeqCst).checked_sub(1)
    }

    fn name(&self) -> &'static str {
        "Counter"
    }
}

/// Uniform integers in the inclusive range `[lb, ub]`
#[derive(Debug)]
pub struct UniformGenerator {
    lb: u64,
    ub: u64,
    state: Mutex<SamplerState>,
}

impl UniformGenerator {
    pub fn new(lb: u64, ub: u64) -> anyhow::Result<Self> {
        Self::with_seed(lb, ub, None)
    }

    pub fn with_seed(lb: u64, ub: u64, seed: Option<u64>) -> anyhow::Result<Self> {
        if lb > ub {
            anyhow::bail!("Uniform lower bound {} must be <= upper bound {}", lb, ub);
        }
        Ok(Self { lb, ub, state: SamplerState::new(seed) })
    }

    pub fn lower(&self) -> u64 {
        self.lb
    }

    pub fn upper(&self) -> u64 {
        self.ub
    }
}

impl NumberGenerator for UniformGenerator {
    fn next_value(&self) -> u64 {
        let mut state = self.state.lock();
        let value = state.rng.random_range(self.lb..=self.ub);
        state.last = Some(value);
        value
    }

    fn last_value(&self) -> Option<u64> {
        self.state.lock().last
    }

    fn name(&self) -> &'static str {
        "Uniform"
    }
}

/// Zipfian integers in `[min, max]`, favouring values close to `min`
#[derive(Debug)]
pub struct ZipfianGenerator {
    base: u64,
    items: u64,
    theta: f64,
    dist: Zipf<f64>,
    state: Mutex<SamplerState>,
}

impl ZipfianGenerator {
    /// Zipfian over `[min, max]` with the default skew
    pub fn new(min: u64, max: u64) -> anyhow::Result<Self> {
        Self::with_seed(min, max, ZIPFIAN_CONSTANT, None)
    }

    pub fn with_seed(min: u64, max: u64, theta: f64, seed: Option<u64>) -> anyhow::Result<Self> {
        if min > max {
            anyhow::bail!("Zipfian min {} must be <= max {}", min, max);
        }
        if theta < 0.0 {
            anyhow::bail!("Zipfian theta must be >= 0.0");
        }

        let items = max - min + 1;
        let dist = Zipf::new(items as f64, theta)?;

        Ok(Self { base: min, items, theta, dist, state: SamplerState::new(seed) })
    }

    /// Number of distinct items
    pub fn items(&self) -> u64 {
        self.items
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }
}

impl NumberGenerator for ZipfianGenerator {
    fn next_value(&self) -> u64 {
        let mut state = self.state.lock();
        // Zipf samples are 1-based ranks
        let rank = self.dist.sample(&mut state.rng) as u64;
        let value = self.base + rank.saturating_sub(1).min(self.items - 1);
        state.last = Some(value);
        value
    }

    fn last_value(&self) -> Option<u64> {
        self.state.lock().last
    }

    fn name(&self) -> &'static str {
        "Zipfian"
    }
}

/// Zipfian popularity spread over the keyspace by hashing
///
/// Samples a rank from a very large fixed zipfian and folds `fnv_hash64(rank)`
/// into `[min, min + item_count)`. Because the sampled keyspace is fixed, the
/// identity of hot items does not shift if `item_count` is sized ahead for
/// future inserts.
#[derive(Debug)]
pub struct ScrambledZipfianGenerator {
    min: u64,
    item_count: u64,
    gen: ZipfianGenerator,
    last: Mutex<Option<u64>>,
}

impl ScrambledZipfianGenerator {
    /// Scrambled zipfian over `[0, items)`
    pub fn new(items: u64) -> anyhow::Result<Self> {
        Self::with_seed(items, None)
    }

    pub fn with_seed(items: u64, seed: Option<u64>) -> anyhow::Result<Self> {
        if items == 0 {
            anyhow::bail!("Scrambled zipfian item count must be > 0");
        }
        let gen = ZipfianGenerator::with_seed(0, SCRAMBLED_ITEM_COUNT - 1, ZIPFIAN_CONSTANT, seed)?;
        Ok(Self { min: 0, item_count: items, gen, last: Mutex::new(None) })
    }

    pub fn item_count(&self) -> u64 {
        self.item_count
    }
}

impl NumberGenerator for ScrambledZipfianGenerator {
    fn next_value(&self) -> u64 {
        let rank = self.gen.next_value();
        let value = self.min + fnv_hash64(rank) % self.item_count;
        *self.last.lock() = Some(value);
        value
    }

    fn last_value(&self) -> Option<u64> {
        *self.last.lock()
    }

    fn name(&self) -> &'static str {
        "ScrambledZipfian"
    }
}

/// Zipfian skewed towards the most recently inserted key
///
/// Reads the current maximum from a shared [`CounterGenerator`] on every draw,
/// so newly inserted keys immediately become the hottest ones.
#[derive(Debug)]
pub struct SkewedLatestGenerator {
    basis: Arc<CounterGenerator>,
    theta: f64,
    state: Mutex<SamplerState>,
}

impl SkewedLatestGenerator {
    pub fn new(basis: Arc<CounterGenerator>) -> Self {
        Self::with_seed(basis, None)
    }

    pub fn with_seed(basis: Arc<CounterGenerator>, seed: Option<u64>) -> Self {
        Self { basis, theta: ZIPFIAN_CONSTANT, state: SamplerState::new(seed) }
    }
}

impl NumberGenerator for SkewedLatestGenerator {
    fn next_value(&self) -> u64 {
        let max = self.basis.last_value().unwrap_or(0);
        let items = max + 1;

        let mut state = self.state.lock();
        // Zipf::new only fails for items < 1 or a negative theta, neither reachable here
        let offset = match Zipf::new(items as f64, self.theta) {
            Ok(dist) => (dist.sample(&mut state.rng) as u64).saturating_sub(1).min(max),
            Err(_) => 0,
        };
        let value = max - offset;
        state.last = Some(value);
        value
    }

    fn last_value(&self) -> Option<u64> {
        self.state.lock().last
    }

    fn name(&self) -> &'static str {
        "SkewedLatest"
    }
}

/// Weighted choice between labelled values
///
/// Weights do not need to sum to 1.0; they are normalised on every draw.
#[derive(Debug)]
pub struct DiscreteGenerator<T> {
    values: Vec<(f64, T)>,
    state: Mutex<SamplerState>,
}

impl<T: Clone + Send> DiscreteGenerator<T> {
    pub fn new() -> Self {
        Self::with_seed(None)
    }

    pub fn with_seed(seed: Option<u64>) -> Self {
        Self { values: Vec::new(), state: SamplerState::new(seed) }
    }

    /// Register `value` with relative `weight`
    pub fn add_value(&mut self, weight: f64, value: T) {
        self.values.push((weight, value));
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Draw a value, or `None` if nothing has been registered
    pub fn next_value(&self) -> Option<T> {
        let sum: f64 = self.values.iter().map(|(w, _)| *w).sum();
        if self.values.is_empty() || sum <= 0.0 {
            return None;
        }

        let mut remaining = self.state.lock().rng.random::<f64>();
        for (weight, value) in &self.values {
            let share = weight / sum;
            if remaining < share {
                return Some(value.clone());
            }
            remaining -= share;
        }

        // Floating point slack: fall back to the last entry
        self.values.last().map(|(_, v)| v.clone())
    }
}

impl<T: Clone + Send> Default for DiscreteGenerator<T> {
    fn default() -> Self {
        Self::new()
    }
}
