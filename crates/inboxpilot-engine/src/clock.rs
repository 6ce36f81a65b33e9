//! Injected simulation sources.
//!
//! The engine never reads ambient time or randomness directly.  Timestamps
//! come from a [`Clock`]; per-action runtimes come from a [`RuntimeModel`].
//! Runtimes are a simulation used only for throughput metrics, never wall
//! clock truth.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{AutomationError, Result};

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// A source of timestamps.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Advances by a fixed step on every read, starting at `start`.
#[derive(Debug)]
pub struct SteppingClock {
    start: DateTime<Utc>,
    step_millis: i64,
    ticks: AtomicI64,
}

impl SteppingClock {
    /// Create a clock that first returns `start`, then `start + step`, ...
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            step_millis: step.num_milliseconds(),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + Duration::milliseconds(tick.saturating_mul(self.step_millis))
    }
}

// ---------------------------------------------------------------------------
// Runtime model
// ---------------------------------------------------------------------------

/// How simulated action runtimes are produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum RuntimeModel {
    /// Every action takes exactly `secs`.
    Fixed { secs: f64 },
    /// Uniform in `[min_secs, max_secs]` from a generator seeded with `seed`
    /// and the message id.
    Seeded { seed: u64, min_secs: f64, max_secs: f64 },
}

impl Default for RuntimeModel {
    fn default() -> Self {
        Self::Seeded {
            seed: 7,
            min_secs: 1.2,
            max_secs: 4.2,
        }
    }
}

impl RuntimeModel {
    /// Reject non-positive or inverted bounds.
    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            Self::Fixed { secs } => secs.is_finite() && secs > 0.0,
            Self::Seeded {
                min_secs, max_secs, ..
            } => min_secs.is_finite() && max_secs.is_finite() && min_secs > 0.0 && max_secs >= min_secs,
        };
        if ok {
            Ok(())
        } else {
            Err(AutomationError::Config {
                reason: format!("runtime model {self:?} must produce positive runtimes"),
            })
        }
    }

    /// Replace the seed (no-op for [`RuntimeModel::Fixed`]).
    pub fn with_seed(self, new_seed: u64) -> Self {
        match self {
            Self::Seeded {
                min_secs, max_secs, ..
            } => Self::Seeded {
                seed: new_seed,
                min_secs,
                max_secs,
            },
            fixed => fixed,
        }
    }

    /// A sampler for one evaluation of `message_id`.
    ///
    /// Two samplers for the same message draw the same sequence.
    pub fn sampler(&self, message_id: &str) -> RuntimeSampler {
        match *self {
            Self::Fixed { secs } => RuntimeSampler::Fixed(secs),
            Self::Seeded {
                seed,
                min_secs,
                max_secs,
            } => RuntimeSampler::Seeded {
                rng: StdRng::seed_from_u64(seed ^ fnv1a(message_id.as_bytes())),
                min_secs,
                max_secs,
            },
        }
    }
}

/// Draws runtimes for one evaluation.
#[derive(Debug)]
pub enum RuntimeSampler {
    Fixed(f64),
    Seeded {
        rng: StdRng,
        min_secs: f64,
        max_secs: f64,
    },
}

impl RuntimeSampler {
    /// Next simulated runtime in seconds; always > 0 for a validated model.
    pub fn next_secs(&mut self) -> f64 {
        match self {
            Self::Fixed(secs) => *secs,
            Self::Seeded {
                rng,
                min_secs,
                max_secs,
            } => {
                if *max_secs <= *min_secs {
                    *min_secs
                } else {
                    rng.gen_range(*min_secs..=*max_secs)
                }
            }
        }
    }
}

/// 64-bit FNV-1a, stable across platforms and releases.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
