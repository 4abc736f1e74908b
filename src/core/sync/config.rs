/*!
 * Lock Strategy Configuration
 *
 * Construction-time selection of the lock behind a guarded value,
 * plus the platform capability check and fallback policy
 */

use crate::core::errors::{GuardedError, GuardedResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable selecting the lock strategy
pub const STRATEGY_ENV: &str = "GUARDED_LOCK_STRATEGY";
/// Environment variable selecting the fallback policy
pub const FALLBACK_ENV: &str = "GUARDED_LOCK_FALLBACK";
/// Environment variable overriding the spin budget
pub const MAX_SPINS_ENV: &str = "GUARDED_MAX_SPINS";

/// Default number of busy polls before a spinning waiter yields
pub const DEFAULT_MAX_SPINS: u32 = 100;

/// Lock strategy selection
///
/// Ordered roughly from cheapest to most expensive under low contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStrategy {
    /// Test-and-test-and-set spinlock (short critical sections, low contention)
    Spin,
    /// Platform-recommended fast lock with a try-lock fast path
    #[default]
    Unfair,
    /// Object monitor (reentrant, condvar based)
    Monitor,
    /// OS mutex
    Mutex,
    /// Simple exclusive lock with fair handoff
    Exclusive,
    /// Recursive lock (same thread may re-acquire)
    Recursive,
    /// Reader-writer lock (reads share, writes exclude)
    ReadWrite,
    /// Serial queue: a single token passed between callers
    Queue,
    /// Counting semaphore with one permit
    Semaphore,
}

impl LockStrategy {
    /// Every strategy, in declaration order
    pub const ALL: [LockStrategy; 9] = [
        LockStrategy::Spin,
        LockStrategy::Unfair,
        LockStrategy::Monitor,
        LockStrategy::Mutex,
        LockStrategy::Exclusive,
        LockStrategy::Recursive,
        LockStrategy::ReadWrite,
        LockStrategy::Queue,
        LockStrategy::Semaphore,
    ];

    /// Canonical snake_case name
    pub const fn name(self) -> &'static str {
        match self {
            LockStrategy::Spin => "spin",
            LockStrategy::Unfair => "unfair",
            LockStrategy::Monitor => "monitor",
            LockStrategy::Mutex => "mutex",
            LockStrategy::Exclusive => "exclusive",
            LockStrategy::Recursive => "recursive",
            LockStrategy::ReadWrite => "read_write",
            LockStrategy::Queue => "queue",
            LockStrategy::Semaphore => "semaphore",
        }
    }

    /// Whether the owning thread may acquire the lock again without deadlocking
    pub const fn is_reentrant(self) -> bool {
        matches!(self, LockStrategy::Recursive | LockStrategy::Monitor)
    }

    /// Whether concurrent readers can hold the lock at the same time
    pub const fn allows_shared_reads(self) -> bool {
        matches!(self, LockStrategy::ReadWrite)
    }
}

impl fmt::Display for LockStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LockStrategy {
    type Err = GuardedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "spin" | "spinlock" | "spin_lock" => Ok(LockStrategy::Spin),
            "unfair" | "unfair_lock" => Ok(LockStrategy::Unfair),
            "monitor" | "objc" => Ok(LockStrategy::Monitor),
            "mutex" => Ok(LockStrategy::Mutex),
            "exclusive" | "lock" => Ok(LockStrategy::Exclusive),
            "recursive" => Ok(LockStrategy::Recursive),
            "read_write" | "rwlock" => Ok(LockStrategy::ReadWrite),
            "queue" => Ok(LockStrategy::Queue),
            "semaphore" => Ok(LockStrategy::Semaphore),
            _ => Err(GuardedError::InvalidStrategy(s.to_string())),
        }
    }
}

/// What to do when the requested strategy is unavailable on this platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Use the fallback strategy and log a warning
    #[default]
    Substitute,
    /// Refuse to construct (only observable through fallible constructors)
    Reject,
}

impl FromStr for FallbackPolicy {
    type Err = GuardedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substitute" => Ok(FallbackPolicy::Substitute),
            "reject" => Ok(FallbackPolicy::Reject),
            _ => Err(GuardedError::InvalidFallback(s.to_string())),
        }
    }
}

/// Platform capabilities relevant to strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Futex/keyed-event backed fast lock available
    pub fast_lock: bool,
}

impl Capabilities {
    /// Detect capabilities of the running platform
    pub const fn detect() -> Self {
        Self {
            fast_lock: cfg!(any(
                target_os = "linux",
                target_os = "android",
                target_os = "macos",
                target_os = "ios",
                target_os = "windows",
                target_os = "freebsd",
                target_os = "openbsd",
                target_os = "netbsd",
                target_os = "dragonfly",
            )),
        }
    }

    /// Whether `strategy` can run on a platform with these capabilities
    pub const fn supports(&self, strategy: LockStrategy) -> bool {
        match strategy {
            LockStrategy::Unfair => self.fast_lock,
            _ => true,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Outcome of resolving a configured strategy against platform capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The requested strategy is usable as-is
    Native(LockStrategy),
    /// The requested strategy was replaced
    Substituted {
        requested: LockStrategy,
        actual: LockStrategy,
    },
}

impl Resolution {
    /// Strategy that will actually back the lock
    pub const fn strategy(self) -> LockStrategy {
        match self {
            Resolution::Native(strategy) => strategy,
            Resolution::Substituted { actual, .. } => actual,
        }
    }
}

/// Guarded value configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Preferred strategy
    pub strategy: LockStrategy,
    /// Behavior when `strategy` is unsupported
    pub fallback: FallbackPolicy,
    /// Strategy substituted under `FallbackPolicy::Substitute`
    pub fallback_strategy: LockStrategy,
    /// Busy polls before a spinning waiter starts yielding
    pub max_spins: u32,
    /// Capability override; detected when `None`
    pub capabilities: Option<Capabilities>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            strategy: LockStrategy::default(),
            fallback: FallbackPolicy::default(),
            fallback_strategy: LockStrategy::Spin,
            max_spins: DEFAULT_MAX_SPINS,
            capabilities: None,
        }
    }
}

impl GuardConfig {
    /// Configuration for a specific strategy, everything else default
    pub fn new(strategy: LockStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    /// Reject unsupported strategies instead of substituting
    pub fn strict(mut self) -> Self {
        self.fallback = FallbackPolicy::Reject;
        self
    }

    /// Override detected platform capabilities
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Override the spin budget
    pub fn with_max_spins(mut self, max_spins: u32) -> Self {
        self.max_spins = max_spins;
        self
    }

    /// Load configuration from the environment
    ///
    /// Unset variables keep their defaults; malformed ones are errors.
    pub fn from_env() -> GuardedResult<Self> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var(STRATEGY_ENV) {
            config.strategy = raw.parse()?;
        }
        if let Ok(raw) = std::env::var(FALLBACK_ENV) {
            config.fallback = raw.parse()?;
        }
        if let Ok(raw) = std::env::var(MAX_SPINS_ENV) {
            config.max_spins = raw.trim().parse().map_err(|_| {
                GuardedError::InvalidConfig(format!("{}={} is not a u32", MAX_SPINS_ENV, raw))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON object
    pub fn from_json(json: &str) -> GuardedResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> GuardedResult<()> {
        if !self.capabilities().supports(self.fallback_strategy) {
            return Err(GuardedError::InvalidConfig(format!(
                "fallback strategy {} is itself unsupported",
                self.fallback_strategy
            )));
        }
        Ok(())
    }

    /// Effective capabilities (override or detected)
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities.unwrap_or_else(Capabilities::detect)
    }

    /// Resolve the strategy against platform capabilities
    ///
    /// Ignores the fallback policy; callers decide whether a substitution
    /// is acceptable.
    pub fn resolve(&self) -> Resolution {
        let capabilities = self.capabilities();
        if capabilities.supports(self.strategy) {
            Resolution::Native(self.strategy)
        } else if capabilities.supports(self.fallback_strategy) {
            Resolution::Substituted {
                requested: self.strategy,
                actual: self.fallback_strategy,
            }
        } else {
            Resolution::Substituted {
                requested: self.strategy,
                actual: LockStrategy::Spin,
            }
        }
    }
}
