use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

static GLOBAL: CidGenerator = CidGenerator::new();

/// Correlation identifier: stable for a model's in-memory lifetime and
/// independent of its business identity attribute.
///
/// Rendered as `c<n>`. Identifiers are unique within a process only; counters
/// restart from 1 on every run, so a `Cid` must never be persisted as a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid(u64);

impl Cid {
    /// Next identifier from the process-wide generator.
    pub fn next() -> Cid {
        GLOBAL.next_cid()
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl FromStr for Cid {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('c')
            .and_then(|n| n.parse::<u64>().ok())
            .map(Cid)
            .ok_or(())
    }
}

impl Serialize for Cid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid cid: {}", s)))
    }
}

/// Monotonically increasing source of [`Cid`]s.
///
/// The crate uses one process-wide instance; separate generators are only
/// useful where identifiers never meet models from the global one.
#[derive(Debug)]
pub struct CidGenerator {
    next: AtomicU64,
}

impl CidGenerator {
    pub const fn new() -> Self {
        CidGenerator {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_cid(&self) -> Cid {
        Cid(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CidGenerator {
    fn default() -> Self {
        Self::new()
    }
}
