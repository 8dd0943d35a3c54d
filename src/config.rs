//! Tunable cache parameters.

use serde::{Deserialize, Serialize};

use crate::budget::CacheBudget;
use crate::document::PageIndex;

/// Two cached resolutions within this many pixels per point are
/// interchangeable.
pub const DEFAULT_RESOLUTION_EPSILON: f64 = 0.05;

/// Background render workers when the caller does not say otherwise.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Weight pair for the forward-bias comparisons the scheduler runs.
///
/// A span `[first, second]` around the current page `c` counts as "mostly
/// ahead" when `ahead * second + behind * first > (ahead + behind) * c`,
/// i.e. when the distance ahead outweighs the distance behind by more than
/// `behind : ahead`. Presentations move forward, so the defaults keep the
/// cache deeper ahead of the current slide than behind it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasWeights {
    pub ahead: i64,
    pub behind: i64,
}

impl BiasWeights {
    #[must_use]
    pub const fn new(ahead: i64, behind: i64) -> Self {
        Self { ahead, behind }
    }

    /// True when `[first, second]` lies mostly ahead of `current`.
    #[must_use]
    pub fn mostly_ahead(&self, first: PageIndex, second: PageIndex, current: PageIndex) -> bool {
        self.ahead * i64::from(second) + self.behind * i64::from(first)
            > (self.ahead + self.behind) * i64::from(current)
    }
}

/// Cache construction parameters.
///
/// A plain value type; embed it in an application config and deserialize
/// with whatever the application uses. Every field has a default, so a
/// partial document works.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memory budget in compressed bytes; `None` is unbounded.
    pub max_memory: Option<u64>,

    /// Entry-count budget; `None` is unbounded.
    pub max_pages: Option<usize>,

    /// Background render workers. Forced to zero for documents with
    /// variable page sizes.
    pub workers: usize,

    /// Resolution compatibility epsilon in pixels per point.
    pub resolution_epsilon: f64,

    /// When prefetch grows the hot region: extend backward once the region
    /// lies mostly ahead by these weights, forward otherwise.
    pub extend_bias: BiasWeights,

    /// When eviction trims the cache: drop from the tail once the cached
    /// span lies mostly ahead by these weights, from the head otherwise.
    pub evict_bias: BiasWeights,

    /// Eviction stops early once the surviving span fits the budgets, is
    /// contiguous, and lies mostly ahead by these weights.
    pub retain_bias: BiasWeights,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_memory: None,
            max_pages: None,
            workers: DEFAULT_WORKER_COUNT,
            resolution_epsilon: DEFAULT_RESOLUTION_EPSILON,
            extend_bias: BiasWeights::new(1, 3),
            evict_bias: BiasWeights::new(1, 3),
            retain_bias: BiasWeights::new(2, 3),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn budget(&self) -> CacheBudget {
        CacheBudget {
            max_memory: self.max_memory,
            max_pages: self.max_pages,
        }
    }
}
